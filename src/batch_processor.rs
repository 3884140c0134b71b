use crate::data_loader::{load_demand, load_spot};
use anyhow::{Context, Result};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use signal_engine::{Area, AreaAnalysis, AreaDay, SignalEngine, SignalError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Spot and demand artifacts published for one (area, date)
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPair {
    pub area: Area,
    pub date: String,
    pub spot: Option<PathBuf>,
    pub demand: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub area: Area,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AreaAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct BatchProcessor {
    engine: SignalEngine,
}

impl BatchProcessor {
    pub fn new(engine: SignalEngine) -> Self {
        Self { engine }
    }

    /// Find `spot-{area}-{date}.json` / `demand-{area}-{date}.json` anywhere
    /// under `data_dir` and pair them by (area, date).
    pub fn discover(&self, data_dir: &Path) -> Result<Vec<ArtifactPair>> {
        let re = Regex::new(r"^(spot|demand)-([a-z]+)-(\d{4}-\d{2}-\d{2})\.json$")?;
        let pattern = data_dir.join("**").join("*.json");
        let pattern = pattern
            .to_str()
            .with_context(|| format!("Non UTF-8 data directory {}", data_dir.display()))?;

        let mut pairs: BTreeMap<(Area, String), ArtifactPair> = BTreeMap::new();

        for path in glob(pattern)?.filter_map(|entry| entry.ok()) {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(caps) = re.captures(name) else {
                continue;
            };
            let area = match caps[2].parse::<Area>() {
                Ok(area) => area,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let date = caps[3].to_string();

            let pair = pairs.entry((area, date.clone())).or_insert_with(|| ArtifactPair {
                area,
                date,
                spot: None,
                demand: None,
            });
            match &caps[1] {
                "spot" => pair.spot = Some(path.clone()),
                _ => pair.demand = Some(path.clone()),
            }
        }

        Ok(pairs.into_values().collect())
    }

    /// Load every discovered pair and analyze them; a failing pair does not
    /// stop the others.
    pub fn run(&self, data_dir: &Path) -> Result<Vec<BatchOutcome>> {
        let pairs = self.discover(data_dir)?;
        if pairs.is_empty() {
            anyhow::bail!("No spot or demand artifacts found under {}", data_dir.display());
        }
        log::info!("Found {} area/day artifact pairs in {}", pairs.len(), data_dir.display());

        let pb = ProgressBar::new(pairs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} - {msg}")?,
        );

        let loaded: Vec<std::result::Result<AreaDay, String>> = pairs
            .par_iter()
            .map(|pair| {
                let day = load_pair(pair);
                pb.inc(1);
                day
            })
            .collect();
        pb.finish_with_message("artifacts loaded");

        let days: Vec<AreaDay> = loaded.iter().filter_map(|day| day.as_ref().ok().cloned()).collect();
        let mut analyses = self.engine.analyze_many(&days).into_iter();

        let outcomes = pairs
            .into_iter()
            .zip(loaded)
            .map(|(pair, day)| {
                let result = match day {
                    Ok(_) => analyses
                        .next()
                        .unwrap_or_else(|| Err(SignalError::DataUnavailable("analysis missing".to_string())))
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e),
                };
                match result {
                    Ok(analysis) => BatchOutcome {
                        area: pair.area,
                        date: pair.date,
                        analysis: Some(analysis),
                        error: None,
                    },
                    Err(error) => {
                        log::warn!("{} {}: {}", pair.area, pair.date, error);
                        BatchOutcome {
                            area: pair.area,
                            date: pair.date,
                            analysis: None,
                            error: Some(error),
                        }
                    }
                }
            })
            .collect();

        Ok(outcomes)
    }
}

fn load_pair(pair: &ArtifactPair) -> std::result::Result<AreaDay, String> {
    let spot_path = pair.spot.as_ref().ok_or_else(|| {
        SignalError::DataUnavailable(format!("no spot price artifact for {} {}", pair.area, pair.date)).to_string()
    })?;
    let spot = load_spot(spot_path).map_err(|e| format!("{:#}", e))?;

    if spot.area != pair.area || spot.date != pair.date {
        log::warn!(
            "{} holds {} {}, file name says {} {}",
            spot_path.display(),
            spot.area,
            spot.date,
            pair.area,
            pair.date
        );
    }

    let demand = match &pair.demand {
        Some(path) => {
            let demand = load_demand(path).map_err(|e| format!("{:#}", e))?;
            if demand.area != pair.area || demand.date != pair.date {
                log::warn!("{} holds {} {}", path.display(), demand.area, demand.date);
            }
            demand.series
        }
        // the planner reports the missing series
        None => Vec::new(),
    };

    Ok(AreaDay {
        area: pair.area,
        date: pair.date.clone(),
        prices: spot.price_yen_per_kwh,
        demand,
    })
}
