// openFDA REST API

pub mod client;
pub mod endpoints;
pub mod query;

pub use client::{Meta, OpenFdaClient, OpenFdaConfig, OpenFdaResponse, ResultsMeta};
pub use endpoints::Endpoint;
pub use query::{and, or, q, range, QueryParams};
