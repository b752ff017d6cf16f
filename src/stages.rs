//! Life-cycle stages and the parameters relevant to each.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    RawMaterial,
    Processing,
    Manufacturing,
    Distribution,
    Use,
    EndOfLife,
    /// Stage name we have no table for; carries the caller's label.
    Other(String),
}

const RAW_MATERIAL_KEYS: &[&str] = &[
    "miningLocation",
    "oreGrade",
    "landUse",
    "energyConsumptionMining",
    "waterConsumptionMining",
];

const PROCESSING_KEYS: &[&str] = &[
    "processingMethod",
    "energySource",
    "energyConsumptionProcessing",
    "emissionsProcessing",
    "waterConsumptionProcessing",
];

const MANUFACTURING_KEYS: &[&str] = &[
    "manufacturingProcess",
    "materialEfficiency",
    "energyConsumptionManufacturing",
    "wasteGenerated",
];

const DISTRIBUTION_KEYS: &[&str] = &["transportMode", "transportDistance", "packagingType", "fuelType"];

const USE_KEYS: &[&str] = &["productLifetime", "usePhaseEnergy", "maintenanceFrequency"];

const END_OF_LIFE_KEYS: &[&str] = &[
    "recyclingRate",
    "endOfLifeTreatment",
    "recoveryEfficiency",
    "scrapQuality",
];

impl Stage {
    /// Lenient lookup: case, spaces, `_` and `-` are ignored, and a few common
    /// aliases are accepted. Anything else becomes `Stage::Other`.
    pub fn parse(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "rawmaterial" | "rawmaterials" | "rawmaterialextraction" | "extraction" | "mining" => {
                Stage::RawMaterial
            }
            "processing" | "refining" | "smelting" => Stage::Processing,
            "manufacturing" | "production" => Stage::Manufacturing,
            "distribution" | "transport" | "transportation" | "logistics" => Stage::Distribution,
            "use" | "usephase" | "usage" => Stage::Use,
            "endoflife" | "eol" | "recycling" => Stage::EndOfLife,
            _ => Stage::Other(name.trim().to_string()),
        }
    }

    /// Allow-list of parameter names for this stage; `None` means "pass everything through".
    pub fn relevant_keys(&self) -> Option<&'static [&'static str]> {
        match self {
            Stage::RawMaterial => Some(RAW_MATERIAL_KEYS),
            Stage::Processing => Some(PROCESSING_KEYS),
            Stage::Manufacturing => Some(MANUFACTURING_KEYS),
            Stage::Distribution => Some(DISTRIBUTION_KEYS),
            Stage::Use => Some(USE_KEYS),
            Stage::EndOfLife => Some(END_OF_LIFE_KEYS),
            Stage::Other(_) => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Stage::RawMaterial => "Raw Material Extraction",
            Stage::Processing => "Processing",
            Stage::Manufacturing => "Manufacturing",
            Stage::Distribution => "Distribution",
            Stage::Use => "Use",
            Stage::EndOfLife => "End of Life",
            Stage::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
