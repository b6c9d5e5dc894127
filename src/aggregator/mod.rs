// Company intelligence across openFDA, ClinicalTrials.gov, NAACCR, USPTO and PubChem

pub mod render;
pub mod service;

pub use render::{render_html, render_json, render_table, write_csv_dir, write_html, ReportFormat};
pub use service::{
    build_company_intel, CompanyIntel, DrugRecord, IntelOptions, IntelSources, PatentRecord, PopulationRecord,
    SubstanceRecord, TrialRecord,
};
