//! Scheduled trading and reporting for the covered options bot.
//!
//! Two cron jobs run in the configured timezone:
//! - `trade_options`: sell covered calls or puts, then report the result
//! - `check_value`: report positions and portfolio value
//!
//! A failing job is logged and reported to the chat without affecting
//! later runs.

pub mod bot;
pub mod format;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use bot::OptionsBot;
pub use format::format_usd;
pub use scheduler::{build_scheduler, run};
