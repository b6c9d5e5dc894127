// PubChem PUG-REST

pub mod client;
pub mod endpoints;
pub mod urls;

pub use client::{accept_for, save, status_hint, PubChemClient, PubChemConfig, PugRequest};
pub use endpoints::FastSearch;
pub use urls::pug_rest_url;
