//! Core business logic abstractions

pub mod aggregator;
pub mod alerts;
pub mod config;
pub mod currency;
pub mod favorites;
pub mod ledger;
pub mod log;
pub mod models;
pub mod notify;
pub mod rate;
pub mod scheduler;
pub mod store;

// Re-export main types for cleaner imports
pub use currency::ValidationError;
pub use notify::NotificationSink;
pub use rate::{RateSample, RateSource};
pub use store::{Slot, SlotStore};
