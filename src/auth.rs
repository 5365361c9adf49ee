//! OAuth token acquisition and storage for the mail API.
//!
//! Reads the Google installed-app `client_secret.json` from the data dir
//! and caches tokens in `token.json` next to it. Expired access tokens are
//! refreshed with the stored refresh token; with nothing cached (or a
//! failed refresh) the consent URL is printed and the authorization code is
//! read from stdin.

use std::fs;
use std::path::Path;

use chrono::Utc;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::error::AuthError;

const CLIENT_SECRET_FILE: &str = "client_secret.json";
const TOKEN_FILE: &str = "token.json";

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
const FALLBACK_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Tokens expiring within this window are treated as already expired.
const EXPIRY_SLACK_SECS: i64 = 60;

/// Produce a usable access token, refreshing or prompting as needed.
pub async fn access_token(data_dir: &Path) -> Result<SecretString, AuthError> {
    let client = load_client_secret(data_dir)?;
    let token_path = data_dir.join(TOKEN_FILE);
    let cached = load_token_file(&token_path)?;
    let now = Utc::now().timestamp();

    if let Some(cached) = &cached {
        if token_is_fresh(cached, now) {
            info!("Using cached access token");
            return Ok(SecretString::from(cached.access_token.clone()));
        }
    }

    let refresh_token = cached.and_then(|t| t.refresh_token);
    let fresh = match &refresh_token {
        Some(refresh) => match refresh_access_token(&client, refresh).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh failed; falling back to interactive consent");
                interactive_flow(&client).await?
            }
        },
        None => interactive_flow(&client).await?,
    };

    // Google omits the refresh token on refresh grants; keep the old one.
    let record = TokenFile {
        access_token: fresh.access_token.clone(),
        refresh_token: fresh.refresh_token.or(refresh_token),
        expires_at_epoch_secs: now + fresh.expires_in.unwrap_or(0),
    };
    save_token_file(&token_path, &record)?;

    Ok(SecretString::from(fresh.access_token))
}

fn token_is_fresh(token: &TokenFile, now_epoch_secs: i64) -> bool {
    !token.access_token.is_empty()
        && now_epoch_secs + EXPIRY_SLACK_SECS < token.expires_at_epoch_secs
}

// ── Client secret ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: InstalledClient,
}

#[derive(Debug, Clone, Deserialize)]
struct InstalledClient {
    client_id: String,
    client_secret: String,
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

fn load_client_secret(data_dir: &Path) -> Result<InstalledClient, AuthError> {
    let path = data_dir.join(CLIENT_SECRET_FILE);
    let raw = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AuthError::MissingClientSecret { path: path.clone() }
        } else {
            AuthError::Io(e)
        }
    })?;
    let file: ClientSecretFile = serde_json::from_str(&raw)?;
    Ok(file.installed)
}

// ── Token cache ─────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct TokenFile {
    access_token: String,
    refresh_token: Option<String>,
    expires_at_epoch_secs: i64,
}

fn load_token_file(path: &Path) -> Result<Option<TokenFile>, AuthError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn save_token_file(path: &Path, token: &TokenFile) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(token)?)?;
    info!(path = %path.display(), "Saved token cache");
    Ok(())
}

// ── Grants ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

async fn refresh_access_token(
    client: &InstalledClient,
    refresh_token: &str,
) -> Result<TokenResponse, AuthError> {
    request_token(
        client,
        &[
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}

/// Print the consent URL, read the authorization code from stdin, and
/// exchange it for tokens.
async fn interactive_flow(client: &InstalledClient) -> Result<TokenResponse, AuthError> {
    let redirect_uri = client
        .redirect_uris
        .first()
        .map(String::as_str)
        .unwrap_or(FALLBACK_REDIRECT);

    let consent_url = reqwest::Url::parse_with_params(
        AUTH_URL,
        &[
            ("client_id", client.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| AuthError::TokenEndpoint(format!("bad consent URL: {e}")))?;

    println!("\nOpen this link in your browser and approve access:\n\n{consent_url}\n");
    eprint!("Authorization code: ");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let code = lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or(AuthError::NoAuthorizationCode)?;

    request_token(
        client,
        &[
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

async fn request_token(
    client: &InstalledClient,
    params: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let http = reqwest::Client::new();
    let response = http.post(&client.token_uri).form(params).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::TokenEndpoint(format!("{status}: {body}")));
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_reused() {
        let token = TokenFile {
            access_token: "tok".into(),
            refresh_token: None,
            expires_at_epoch_secs: 10_000,
        };
        assert!(token_is_fresh(&token, 9_000));
    }

    #[test]
    fn expired_or_near_expiry_token_is_stale() {
        let token = TokenFile {
            access_token: "tok".into(),
            refresh_token: None,
            expires_at_epoch_secs: 10_000,
        };
        assert!(!token_is_fresh(&token, 10_001));
        assert!(!token_is_fresh(&token, 10_000 - EXPIRY_SLACK_SECS));
    }

    #[test]
    fn empty_access_token_is_stale() {
        let token = TokenFile {
            access_token: String::new(),
            refresh_token: Some("refresh".into()),
            expires_at_epoch_secs: i64::MAX,
        };
        assert!(!token_is_fresh(&token, 0));
    }

    #[test]
    fn token_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let token = TokenFile {
            access_token: "tok".into(),
            refresh_token: Some("refresh".into()),
            expires_at_epoch_secs: 1_700_000_000,
        };

        save_token_file(&path, &token).unwrap();
        let loaded = load_token_file(&path).unwrap().unwrap();
        assert_eq!(loaded.access_token, "tok");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(loaded.expires_at_epoch_secs, 1_700_000_000);
    }

    #[test]
    fn missing_token_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_token_file(&dir.path().join("token.json")).unwrap().is_none());
    }

    #[test]
    fn client_secret_parses_installed_format() {
        let raw = serde_json::json!({
            "installed": {
                "client_id": "abc.apps.googleusercontent.com",
                "project_id": "demo",
                "client_secret": "s3cret",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["http://localhost"]
            }
        });
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CLIENT_SECRET_FILE),
            serde_json::to_string(&raw).unwrap(),
        )
        .unwrap();

        let client = load_client_secret(dir.path()).unwrap();
        assert_eq!(client.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(client.redirect_uris, vec!["http://localhost"]);
    }

    #[test]
    fn missing_client_secret_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        match load_client_secret(dir.path()) {
            Err(AuthError::MissingClientSecret { path }) => {
                assert!(path.ends_with(CLIENT_SECRET_FILE));
            }
            other => panic!("expected missing client secret, got {other:?}"),
        }
    }
}
