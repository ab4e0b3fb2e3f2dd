//! quotesync-core - Core library for quotesync
//!
//! This crate contains the quote model, local storage, the remote gateway and
//! the sync engine that keeps the two in step. The CLI is a thin layer on top.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Quote, QuoteId};
