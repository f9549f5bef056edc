//! Milestone relay
//!
//! Receives signed GitHub `milestone` webhooks and posts a summary of each
//! event to a Slack channel.

pub mod config;
pub mod logging;
pub mod webhooks;
