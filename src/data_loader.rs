use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use signal_engine::{Area, ConsumptionPoint, DemandPoint, EngineConfig, PricePoint, PriceReference, PriceSource};
use std::fs::File;
use std::path::Path;

/// Daily spot price artifact (`spot-{area}-{date}.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotArtifact {
    pub date: String,
    pub area: Area,
    pub price_yen_per_kwh: Vec<PricePoint>,
    #[serde(default = "PriceSource::jepx")]
    pub source: PriceSource,
}

impl SpotArtifact {
    pub fn into_reference(self) -> PriceReference {
        PriceReference::series(self.area, self.date, self.price_yen_per_kwh, self.source)
    }
}

/// Daily demand artifact (`demand-{area}-{date}.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandArtifact {
    pub date: String,
    pub area: Area,
    pub series: Vec<DemandPoint>,
}

pub fn load_spot(path: &Path) -> Result<SpotArtifact> {
    let file = File::open(path).with_context(|| format!("Failed to open spot prices {}", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("Failed to parse spot prices {}", path.display()))
}

pub fn load_demand(path: &Path) -> Result<DemandArtifact> {
    let file = File::open(path).with_context(|| format!("Failed to open demand {}", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("Failed to parse demand {}", path.display()))
}

/// Load a consumption profile: `.csv` files need a `ts,kwh` header, anything
/// else is read as a JSON array of `{ts, kwh}`.
pub fn load_profile(path: &Path) -> Result<Vec<ConsumptionPoint>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let profile = if is_csv {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open profile {}", path.display()))?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<ConsumptionPoint>, _>>()
            .with_context(|| format!("Failed to parse profile CSV {}", path.display()))?
    } else {
        let file = File::open(path).with_context(|| format!("Failed to open profile {}", path.display()))?;
        serde_json::from_reader(file).with_context(|| format!("Failed to parse profile JSON {}", path.display()))?
    };

    log::info!("Loaded {} profile points from {}", profile.len(), path.display());
    Ok(profile)
}

/// Engine configuration from a JSON file; omitted fields keep their defaults.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open config {}", path.display()))?;
            serde_json::from_reader(file).with_context(|| format!("Failed to parse config {}", path.display()))
        }
        None => Ok(EngineConfig::default()),
    }
}
