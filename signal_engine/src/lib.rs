pub mod arbitrage;
pub mod battery_roi;
pub mod engine;
pub mod error;
pub mod load_shift;
pub mod metrics;
pub mod models;
pub mod scoring;
pub mod settlement;

pub use arbitrage::ArbitrageDetector;
pub use battery_roi::{BatteryRoiCalculator, SpreadBasis};
pub use engine::{AreaAnalysis, AreaDay, SignalEngine};
pub use error::{Result, SignalError};
pub use load_shift::{LoadShiftPlan, LoadShiftPlanner};
pub use metrics::TradingMetrics;
pub use models::{Area, BatterySpec, ConsumptionPoint, DemandPoint, EngineConfig, PricePoint, PriceSource};
pub use settlement::{PriceReference, SettlementCalculator};
