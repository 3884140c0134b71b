use crate::arbitrage::ArbitrageDetector;
use crate::battery_roi::{BatteryRoiCalculator, SpreadBasis};
use crate::error::Result;
use crate::load_shift::{LoadShiftPlan, LoadShiftPlanner};
use crate::metrics::{best_opportunities, priority_load_shifts, TradingMetrics};
use crate::models::{
    ArbitrageOpportunity, Area, BatteryRoi, DemandPoint, EngineConfig, LoadShiftRecommendation, PricePoint,
    PriceStats,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One area's published series for a single day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AreaDay {
    pub area: Area,
    pub date: String, // YYYY-MM-DD
    pub prices: Vec<PricePoint>,
    pub demand: Vec<DemandPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AreaAnalysis {
    pub area: Area,
    pub date: String,
    pub price_stats: Option<PriceStats>,
    pub opportunities: Vec<ArbitrageOpportunity>,
    pub best_opportunities: Vec<ArbitrageOpportunity>,
    pub load_shift: LoadShiftPlan,
    pub priority_load_shifts: Vec<LoadShiftRecommendation>,
    pub battery_roi: BatteryRoi,
    pub spread_basis: SpreadBasis,
    pub metrics: Option<TradingMetrics>,
}

pub struct SignalEngine {
    config: EngineConfig,
    detector: ArbitrageDetector,
    planner: LoadShiftPlanner,
    roi: BatteryRoiCalculator,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            detector: ArbitrageDetector::new(config.arbitrage.clone()),
            planner: LoadShiftPlanner::new(config.load_shift.clone()),
            roi: BatteryRoiCalculator::new(config.battery.clone()).with_precision(config.settlement.precision),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run detector, planner, ROI projection and metrics over one area/day.
    pub fn analyze(&self, day: &AreaDay) -> Result<AreaAnalysis> {
        let opportunities = self.detector.detect(&day.prices)?;
        let load_shift = self.planner.plan(&day.prices, &day.demand)?;
        let (battery_roi, spread_basis) = self
            .roi
            .project_from_opportunities(&self.config.battery.spec, &opportunities)?;
        let metrics = TradingMetrics::from_results(&opportunities, &load_shift.recommendations);

        log::debug!(
            "{} {}: {} opportunities, {} load shifts, spread {:?}",
            day.area,
            day.date,
            opportunities.len(),
            load_shift.recommendations.len(),
            spread_basis
        );

        Ok(AreaAnalysis {
            area: day.area,
            date: day.date.clone(),
            price_stats: PriceStats::from_series(&day.prices),
            best_opportunities: best_opportunities(&opportunities),
            priority_load_shifts: priority_load_shifts(&load_shift.recommendations),
            opportunities,
            load_shift,
            battery_roi,
            spread_basis,
            metrics,
        })
    }

    /// Analyze independent area/days in parallel; results keep input order.
    pub fn analyze_many(&self, days: &[AreaDay]) -> Vec<Result<AreaAnalysis>> {
        days.par_iter().map(|day| self.analyze(day)).collect()
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
