// Endpoint catalog

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    DrugEvent,
    DrugLabel,
    DrugNdc,
    DrugEnforcement,
    DrugDrugsFda,
    DrugShortages,
    DeviceEvent,
    DeviceRecall,
    DeviceEnforcement,
    DeviceClassification,
    Device510k,
    DevicePma,
    DeviceRegistrationListing,
    DeviceUdi,
    DeviceCovid19Serology,
    CosmeticEvent,
    FoodEnforcement,
    FoodEvent,
    AnimalVeterinaryEvent,
    TobaccoProblem,
    OtherNsde,
    OtherSubstance,
    OtherUnii,
    OtherHistoricalDocument,
    TransparencyCrl,
}

impl Endpoint {
    pub const ALL: [Endpoint; 25] = [
        Endpoint::DrugEvent,
        Endpoint::DrugLabel,
        Endpoint::DrugNdc,
        Endpoint::DrugEnforcement,
        Endpoint::DrugDrugsFda,
        Endpoint::DrugShortages,
        Endpoint::DeviceEvent,
        Endpoint::DeviceRecall,
        Endpoint::DeviceEnforcement,
        Endpoint::DeviceClassification,
        Endpoint::Device510k,
        Endpoint::DevicePma,
        Endpoint::DeviceRegistrationListing,
        Endpoint::DeviceUdi,
        Endpoint::DeviceCovid19Serology,
        Endpoint::CosmeticEvent,
        Endpoint::FoodEnforcement,
        Endpoint::FoodEvent,
        Endpoint::AnimalVeterinaryEvent,
        Endpoint::TobaccoProblem,
        Endpoint::OtherNsde,
        Endpoint::OtherSubstance,
        Endpoint::OtherUnii,
        Endpoint::OtherHistoricalDocument,
        Endpoint::TransparencyCrl,
    ];

    /// `category/endpoint`
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::DrugEvent => "drug/event",
            Endpoint::DrugLabel => "drug/label",
            Endpoint::DrugNdc => "drug/ndc",
            Endpoint::DrugEnforcement => "drug/enforcement",
            Endpoint::DrugDrugsFda => "drug/drugsfda",
            Endpoint::DrugShortages => "drug/shortages",
            Endpoint::DeviceEvent => "device/event",
            Endpoint::DeviceRecall => "device/recall",
            Endpoint::DeviceEnforcement => "device/enforcement",
            Endpoint::DeviceClassification => "device/classification",
            Endpoint::Device510k => "device/510k",
            Endpoint::DevicePma => "device/pma",
            Endpoint::DeviceRegistrationListing => "device/registrationlisting",
            Endpoint::DeviceUdi => "device/udi",
            Endpoint::DeviceCovid19Serology => "device/covid19serology",
            Endpoint::CosmeticEvent => "cosmetic/event",
            Endpoint::FoodEnforcement => "food/enforcement",
            Endpoint::FoodEvent => "food/event",
            Endpoint::AnimalVeterinaryEvent => "animalandveterinary/event",
            Endpoint::TobaccoProblem => "tobacco/problem",
            Endpoint::OtherNsde => "other/nsde",
            Endpoint::OtherSubstance => "other/substance",
            Endpoint::OtherUnii => "other/unii",
            Endpoint::OtherHistoricalDocument => "other/historicaldocument",
            Endpoint::TransparencyCrl => "transparency/crl",
        }
    }

    /// `/category/endpoint.json`
    pub fn path(&self) -> String {
        format!("/{}.json", self.name())
    }

    pub fn description(&self) -> &'static str {
        match self {
            Endpoint::DrugEvent => "drug adverse events (FAERS)",
            Endpoint::DrugLabel => "drug labeling (SPL)",
            Endpoint::DrugNdc => "National Drug Code Directory",
            Endpoint::DrugEnforcement => "drug enforcement reports (RES)",
            Endpoint::DrugDrugsFda => "Drugs@FDA approved products",
            Endpoint::DrugShortages => "drug shortages",
            Endpoint::DeviceEvent => "device adverse events (MAUDE)",
            Endpoint::DeviceRecall => "device recalls",
            Endpoint::DeviceEnforcement => "device enforcement reports (RES)",
            Endpoint::DeviceClassification => "device product classification",
            Endpoint::Device510k => "510(k) premarket notifications",
            Endpoint::DevicePma => "premarket approvals",
            Endpoint::DeviceRegistrationListing => "establishment registration and listing",
            Endpoint::DeviceUdi => "GUDID unique device identifiers",
            Endpoint::DeviceCovid19Serology => "SARS-CoV-2 serology test evaluations",
            Endpoint::CosmeticEvent => "cosmetic adverse events",
            Endpoint::FoodEnforcement => "food recalls (RES)",
            Endpoint::FoodEvent => "CAERS food and supplement adverse events",
            Endpoint::AnimalVeterinaryEvent => "animal drug and device adverse events",
            Endpoint::TobaccoProblem => "tobacco product problem reports",
            Endpoint::OtherNsde => "legacy NSDE listing data",
            Endpoint::OtherSubstance => "substance registration system",
            Endpoint::OtherUnii => "UNII dictionary",
            Endpoint::OtherHistoricalDocument => "historical documents",
            Endpoint::TransparencyCrl => "complete response letters",
        }
    }

    /// Accepts `drug/event`, `/drug/event.json` and similar
    pub fn parse(s: &str) -> ApiResult<Self> {
        let key = s.trim().trim_start_matches('/').trim_end_matches(".json").to_ascii_lowercase();
        Endpoint::ALL
            .iter()
            .copied()
            .find(|e| e.name() == key)
            .ok_or_else(|| ApiError::invalid(format!("unknown openFDA endpoint '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_path() {
        assert_eq!(Endpoint::parse("drug/event").unwrap(), Endpoint::DrugEvent);
        assert_eq!(Endpoint::parse("/device/510k.json").unwrap(), Endpoint::Device510k);
        assert_eq!(Endpoint::TransparencyCrl.path(), "/transparency/crl.json");
        assert!(Endpoint::parse("drug/nothing").is_err());
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<&str> = Endpoint::ALL.iter().map(|e| e.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Endpoint::ALL.len());
    }
}
