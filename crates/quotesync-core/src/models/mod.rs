//! Data models for quotesync

mod quote;

pub use quote::{Quote, QuoteId};
