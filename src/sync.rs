//! One synchronization run: fetch, select, power, speak, commit.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::command::{CommandChain, pipeline};
use crate::config::Settings;
use crate::error::{Result, SyncError};
use crate::feed::{MailFeed, MailItem};
use crate::filter::{self, FilterRule};
use crate::speech;
use crate::state::{AccountState, StateStore};

/// Pause after enabling the relay, before the first dispatch, so the
/// attached device can stabilize.
const POWER_SETTLE: Duration = Duration::from_secs(1);

const POWER_ON: &str = "1";
const POWER_OFF: &str = "0";

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunSummary {
    /// How many messages were spoken.
    pub dispatched: usize,
    /// The committed watermark (the run-start capture), epoch milliseconds.
    pub watermark_ms: i64,
}

/// Drives one run end to end. Owns its feed adapter and state store;
/// construct once per process.
pub struct SyncRunner {
    feed: Box<dyn MailFeed>,
    store: StateStore,
    settings: Settings,
}

impl SyncRunner {
    pub fn new(feed: Box<dyn MailFeed>, store: StateStore, settings: Settings) -> Self {
        Self {
            feed,
            store,
            settings,
        }
    }

    /// Execute the run. Any error aborts immediately and leaves the stored
    /// watermark untouched, so the next run re-covers the same window.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut state = self.load_or_bootstrap().await?;
        let speak_chain = CommandChain::parse(&state.speak_commands);
        let power_chain = CommandChain::parse(&state.power_commands);

        // Start from a known-off relay.
        self.drive_power(&power_chain, false).await?;

        // Captured before fetching: mail arriving mid-run lands after the
        // committed watermark instead of being skipped next time.
        let run_started_ms = Utc::now().timestamp_millis();

        let listing = self.feed.list_candidates().await?;
        if listing.total == 0 || listing.items.is_empty() {
            return Err(SyncError::NoMessages.into());
        }
        debug!(candidates = listing.items.len(), total = listing.total, "Fetched mailbox listing");

        let selected = select_new(
            &listing.items,
            state.last_sync_epoch_ms,
            state.filters.as_deref(),
        );
        if selected.is_empty() {
            return Err(SyncError::NoApplicableMessages.into());
        }
        info!(
            selected = selected.len(),
            watermark = state.last_sync_epoch_ms,
            "Selected new matching messages"
        );

        let mut powered_on = false;
        let mut dispatched = 0usize;
        for item in selected {
            if !powered_on {
                self.drive_power(&power_chain, true).await?;
                tokio::time::sleep(POWER_SETTLE).await;
                powered_on = true;
            }

            let sentence = speech::speak_text(item);
            println!("{sentence}\n");
            self.speak(&speak_chain, &sentence).await?;
            debug!(id = %item.id, "Dispatched message");
            dispatched += 1;
        }

        let metadata = self.feed.account_metadata().await?;
        state.last_sync_epoch_ms = run_started_ms;
        state.last_known_total = metadata.messages_total;
        state.account_email = metadata.email;
        self.store.save(&state)?;

        Ok(RunSummary {
            dispatched,
            watermark_ms: run_started_ms,
        })
    }

    /// Load the saved record, clamping a stale watermark forward to the
    /// bootstrap floor; with no record, start from the floor and pull
    /// account metadata from the feed.
    async fn load_or_bootstrap(&self) -> Result<AccountState> {
        let floor_ms = bootstrap_floor(Utc::now().timestamp_millis(), self.settings.bootstrap_window);

        match self.store.load()? {
            Some(mut state) => {
                if state.last_sync_epoch_ms < floor_ms {
                    debug!(
                        stored = state.last_sync_epoch_ms,
                        floor = floor_ms,
                        "Clamping stale watermark to the bootstrap floor"
                    );
                    state.last_sync_epoch_ms = floor_ms;
                }
                Ok(state)
            }
            None => {
                info!("No saved state; starting from the bootstrap floor");
                let metadata = self.feed.account_metadata().await?;
                Ok(AccountState {
                    last_sync_epoch_ms: floor_ms,
                    last_known_total: metadata.messages_total,
                    account_email: metadata.email,
                    ..AccountState::default()
                })
            }
        }
    }

    async fn drive_power(&self, chain: &CommandChain, enabled: bool) -> Result<()> {
        if chain.is_empty() {
            info!("No power commands configured; skipping relay toggle");
            return Ok(());
        }
        let token = if enabled { POWER_ON } else { POWER_OFF };
        pipeline::run(&chain.render(token)).await?;
        debug!(enabled, "Drove power relay");
        Ok(())
    }

    async fn speak(&self, chain: &CommandChain, sentence: &str) -> Result<()> {
        if chain.is_empty() {
            info!("No speak commands configured; printed only");
            return Ok(());
        }
        pipeline::run(&chain.render(sentence)).await?;
        Ok(())
    }
}

/// The oldest watermark a run may start from.
pub fn bootstrap_floor(now_ms: i64, window: Duration) -> i64 {
    now_ms - window.as_millis() as i64
}

/// Select the newest-first prefix of items newer than the watermark, kept
/// only where the rules match.
///
/// The first item at or before the watermark ends the scan: the feed is
/// time-ordered descending, so nothing past it can qualify. Rule misses
/// are skipped without ending the scan.
pub fn select_new<'a>(
    items: &'a [MailItem],
    watermark_ms: i64,
    rules: Option<&[FilterRule]>,
) -> Vec<&'a MailItem> {
    let mut selected = Vec::new();
    for item in items {
        if item.received_at_ms <= watermark_ms {
            break;
        }
        if filter::matches_any(rules, item) {
            selected.push(item);
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, received_at_ms: i64, sender: &str) -> MailItem {
        MailItem {
            id: id.into(),
            received_at_ms,
            sender: sender.into(),
            subject: String::new(),
            snippet: String::new(),
            body: String::new(),
        }
    }

    #[test]
    fn selection_takes_the_newer_than_watermark_prefix() {
        let items = vec![
            item("a", 400, "x@example.com"),
            item("b", 300, "x@example.com"),
            item("c", 200, "x@example.com"),
            item("d", 100, "x@example.com"),
        ];

        let selected = select_new(&items, 250, None);
        let ids: Vec<&str> = selected.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn item_exactly_at_the_watermark_stops_the_scan() {
        let items = vec![
            item("a", 300, "x@example.com"),
            item("b", 250, "x@example.com"),
            // Out-of-order stragglers past the boundary are never reached.
            item("c", 400, "x@example.com"),
        ];

        let selected = select_new(&items, 250, None);
        let ids: Vec<&str> = selected.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a"]);
    }

    #[test]
    fn rule_misses_are_skipped_without_stopping() {
        let rules = vec![FilterRule {
            sender: "keep@".into(),
            subjects: None,
        }];
        let items = vec![
            item("a", 400, "drop@example.com"),
            item("b", 300, "keep@example.com"),
            item("c", 200, "keep@example.com"),
        ];

        let selected = select_new(&items, 100, Some(&rules));
        let ids: Vec<&str> = selected.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn nothing_newer_selects_nothing() {
        let items = vec![item("a", 100, "x@example.com")];
        assert!(select_new(&items, 100, None).is_empty());
        assert!(select_new(&items, 500, None).is_empty());
    }

    #[test]
    fn bootstrap_floor_is_now_minus_the_window() {
        let now_ms = 1_700_000_000_000;
        let floor = bootstrap_floor(now_ms, Duration::from_secs(15 * 60));
        assert_eq!(floor, now_ms - 900_000);
    }
}
