// NCBI Entrez E-utilities

pub mod client;
pub mod endpoints;
pub mod workflows;

pub use client::{EntrezClient, EutilsBody, NcbiConfig};
pub use endpoints::{EFetch, ELink, ESearch, ESummary, PostResult, SpellResult};
