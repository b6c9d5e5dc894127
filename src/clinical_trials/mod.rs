// ClinicalTrials.gov REST API v2

pub mod client;
pub mod stats;
pub mod studies;

pub use client::{ClinicalTrialsClient, ClinicalTrialsConfig};
pub use studies::{Paging, StudyFilter, StudyFormat, StudyQuery};
