// IND toolkit - core library
// Service clients, local data helpers and the CLI surface used by the `ind` binary

pub mod error;
pub mod http;
pub mod config;
pub mod logging;
pub mod utils;
pub mod autocomplete;
pub mod gen;
pub mod pubchem;
pub mod openfda;
pub mod clinical_trials;
pub mod ncbi;
pub mod naaccr;
pub mod seer;
pub mod uspto;
pub mod aggregator;
pub mod cli;

// Re-export commonly used types
pub use error::{ApiError, ApiResult};
pub use http::{HttpClient, HttpConfig, HttpResponse, Params, RequestSpec};
pub use config::{resolve_credential, ConfigStore};
pub use logging::{init_logging, resolve_level};
pub use gen::Table;
pub use pubchem::{PubChemClient, PubChemConfig, PugRequest};
pub use openfda::{Endpoint as FdaEndpoint, OpenFdaClient, OpenFdaConfig, QueryParams};
pub use clinical_trials::{ClinicalTrialsClient, ClinicalTrialsConfig, StudyQuery};
pub use ncbi::{EntrezClient, NcbiConfig};
pub use naaccr::NaaccrClient;
pub use seer::{SeerClient, SeerConfig};
pub use uspto::{MethodStrategy, SearchRequest, UsptoClient, UsptoConfig};
pub use aggregator::{build_company_intel, CompanyIntel, IntelOptions, IntelSources, ReportFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
