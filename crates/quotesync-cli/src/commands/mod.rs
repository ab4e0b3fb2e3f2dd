pub mod add;
pub mod browse;
pub mod common;
pub mod completions;
pub mod config;
pub mod status;
pub mod sync;
pub mod watch;
