use mail_herald::auth;
use mail_herald::config::Settings;
use mail_herald::feed::gmail::GmailFeed;
use mail_herald::state::StateStore;
use mail_herald::sync::SyncRunner;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("\nAll execution completed normally.\n");
}

async fn run() -> mail_herald::error::Result<()> {
    let settings = Settings::from_env()?;
    eprintln!("mail-herald v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Data dir: {}\n", settings.data_dir.display());

    let token = auth::access_token(&settings.data_dir).await?;
    let feed = GmailFeed::new(token);
    let store = StateStore::new(&settings.data_dir);

    let runner = SyncRunner::new(Box::new(feed), store, settings);
    let summary = runner.run().await?;
    eprintln!("   Spoke {} message(s)", summary.dispatched);
    Ok(())
}
