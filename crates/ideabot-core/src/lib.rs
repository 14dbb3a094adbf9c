//! Core domain + application logic for the idea relay bot.
//!
//! This crate is intentionally transport-agnostic. The Telegram Bot API and
//! the GitHub issue bridge live behind ports (traits) implemented in adapter
//! crates.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod flood;
pub mod logging;
pub mod poll;
pub mod ports;
pub mod update;

pub use errors::{Error, Result};
