// NAACCR Data Dictionary API

pub mod client;
pub mod endpoints;

pub use client::{NaaccrClient, Page};
pub use endpoints::{item_id, ALLOWED_ATTRIBUTES, ITEM_SUMMARY_FIELDS};
