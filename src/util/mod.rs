//! Utility functions.

pub mod env;
pub mod format;
pub mod time;

pub use format::{format_cost, format_percent, format_tokens};
pub use time::{format_countdown, format_relative_time};
