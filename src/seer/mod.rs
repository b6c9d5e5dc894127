// SEER REST API

pub mod client;
pub mod endpoints;
pub mod query;

pub use client::{first_version, SeerClient, SeerConfig};
pub use query::{ChangelogQuery, CodeSearch, HistoryPage, ListQuery};
