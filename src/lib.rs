//! ClickUpのtime entryをTimeCampに同期する。

pub mod clickup;
pub mod config;
pub mod console;
pub mod datetime;
pub mod error;
pub mod http;
pub mod logger;
pub mod summary;
pub mod sync_command;
pub mod time_entry;
pub mod timecamp;
