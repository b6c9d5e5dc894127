// USPTO Open Data Portal (patents, bulk datasets, petition decisions)

pub mod bulk;
pub mod client;
pub mod patent;
pub mod petitions;
pub mod types;

pub use bulk::{ProductQuery, ProductSearch};
pub use client::{format_error_message, Download, UsptoClient, UsptoConfig};
pub use patent::ApplicationResource;
pub use types::{encode_get_params, Filter, MethodStrategy, Pagination, RangeFilter, SearchRequest, Sort, SortOrder};
