//! mail-herald — speaks new mail out loud.
//!
//! One run: poll the mailbox, select messages newer than the persisted
//! watermark that match the configured rules, power the relay, pipe each
//! message through the speech commands, commit the watermark.

pub mod auth;
pub mod command;
pub mod config;
pub mod error;
pub mod feed;
pub mod filter;
pub mod speech;
pub mod state;
pub mod sync;
