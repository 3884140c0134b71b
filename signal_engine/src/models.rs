use crate::error::{Result, SignalError};
use crate::scoring::MONEY_PRECISION;
use chrono::{DateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Tokyo,
    Kansai,
}

impl Area {
    pub const ALL: [Area; 2] = [Area::Tokyo, Area::Kansai];

    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Tokyo => "tokyo",
            Area::Kansai => "kansai",
        }
    }

    /// Base spot price (JPY/kWh) used by the time-of-day price model
    pub fn base_price(&self) -> f64 {
        match self {
            Area::Tokyo => 30.0,
            Area::Kansai => 28.0,
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tokyo" => Ok(Area::Tokyo),
            "kansai" => Ok(Area::Kansai),
            other => Err(SignalError::Validation(format!(
                "unknown area '{}' (expected tokyo or kansai)",
                other
            ))),
        }
    }
}

/// Hour of day (0-23) of an RFC 3339 timestamp, read in its own offset.
pub fn hour_of(timestamp: &str) -> Result<u32> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.hour())
        .map_err(|e| SignalError::Validation(format!("invalid timestamp '{}': {}", timestamp, e)))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    #[serde(rename = "ts")]
    pub timestamp: String,
    pub price: f64, // JPY/kWh
}

impl PricePoint {
    pub fn new(timestamp: impl Into<String>, price: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            price,
        }
    }

    pub fn hour(&self) -> Result<u32> {
        hour_of(&self.timestamp)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemandPoint {
    #[serde(rename = "ts")]
    pub timestamp: String,
    #[serde(rename = "demand_mw")]
    pub demand: f64,
    #[serde(rename = "forecast_mw", default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<f64>,
}

impl DemandPoint {
    pub fn new(timestamp: impl Into<String>, demand: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            demand,
            forecast: None,
        }
    }

    pub fn hour(&self) -> Result<u32> {
        hour_of(&self.timestamp)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionPoint {
    #[serde(rename = "ts")]
    pub timestamp: String,
    #[serde(rename = "kwh")]
    pub consumption_kwh: f64,
}

impl ConsumptionPoint {
    pub fn new(timestamp: impl Into<String>, consumption_kwh: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            consumption_kwh,
        }
    }
}

/// Attribution for a price series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceSource {
    pub name: String,
    pub url: String,
}

impl PriceSource {
    pub fn jepx() -> Self {
        Self {
            name: "JEPX".to_string(),
            url: "https://www.jepx.jp/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceStats {
    #[serde(rename = "min")]
    pub min_price: f64,
    #[serde(rename = "max")]
    pub max_price: f64,
    #[serde(rename = "avg")]
    pub avg_price: f64,
}

impl PriceStats {
    pub fn from_series(prices: &[PricePoint]) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }

        let min_price = prices.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
        let max_price = prices.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
        let avg_price = prices.iter().map(|p| p.price).sum::<f64>() / prices.len() as f64;

        Some(Self {
            min_price,
            max_price,
            avg_price,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageOpportunity {
    #[serde(rename = "time")]
    pub timestamp: String,
    pub hour: u32,
    #[serde(rename = "type")]
    pub signal: Signal,
    pub current_price: f64,
    pub target_price: f64,
    pub spread: f64,
    pub expected_profit: f64, // JPY per MWh
    pub confidence: Confidence,
    #[serde(rename = "recommendation")]
    pub recommendation_text: String,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadProfileEntry {
    pub hour: u32,
    pub current_load: f64,     // MW
    pub price: f64,            // JPY/kWh
    pub carbon_intensity: f64, // gCO2/kWh
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadShiftRecommendation {
    pub id: String,
    pub from_hour: u32,
    pub to_hour: u32,
    #[serde(rename = "amountMW")]
    pub shift_amount: f64,
    pub current_cost: f64,
    pub optimized_cost: f64,
    pub savings: f64,
    pub carbon_reduction: f64, // kg CO2
    pub feasibility: u8,
    pub priority: Priority,
    #[serde(rename = "reason")]
    pub reason_text: String,
}

impl LoadShiftRecommendation {
    /// Identity of a shift pair; identical pairs across runs share it.
    pub fn id_for(from_hour: u32, to_hour: u32) -> String {
        format!("shift-{}-to-{}", from_hour, to_hour)
    }

    pub fn hour_distance(&self) -> u32 {
        self.from_hour.abs_diff(self.to_hour)
    }
}

/// Battery asset sized for spread capture
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BatterySpec {
    pub capacity_mwh: f64,
    pub cycles_per_day: f64,
    pub efficiency: f64,
    pub capital_cost: f64, // JPY
}

impl BatterySpec {
    pub fn new(capacity_mwh: f64, cycles_per_day: f64, efficiency: f64, capital_cost: f64) -> Self {
        Self {
            capacity_mwh,
            cycles_per_day,
            efficiency,
            capital_cost,
        }
    }

    /// 10 MWh, one cycle a day, 90% efficiency, 100M JPY
    pub fn utility_10mwh() -> Self {
        Self::new(10.0, 1.0, 0.9, 100_000_000.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BatteryRoi {
    pub capacity: f64,
    pub cycles_per_day: f64,
    pub efficiency: f64,
    pub capital_cost: f64,
    pub daily_profit: f64,
    pub monthly_profit: f64,
    pub yearly_profit: f64,
    /// `f64::INFINITY` when the battery never pays back; `null` on the wire.
    #[serde(with = "unbounded_years")]
    pub payback_years: f64,
    pub roi_pct: f64,
}

impl BatteryRoi {
    pub fn pays_back(&self) -> bool {
        self.payback_years.is_finite()
    }

    pub fn payback_years_checked(&self) -> Result<f64> {
        if self.pays_back() {
            Ok(self.payback_years)
        } else {
            Err(SignalError::DivisionUndefined(
                "yearly profit is zero, payback period is unbounded".to_string(),
            ))
        }
    }
}

mod unbounded_years {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(years: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if years.is_finite() {
            serializer.serialize_some(years)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Price reference named by a settlement request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricesRequest {
    pub area: Area,
    pub date: String, // YYYY-MM-DD
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementRequest {
    pub profile: Vec<ConsumptionPoint>,
    pub prices: PricesRequest,
    pub pv_offset_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Period {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Totals {
    #[serde(rename = "kwh")]
    pub consumption_kwh: f64,
    #[serde(rename = "cost_yen")]
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyBreakdown {
    #[serde(rename = "ts")]
    pub timestamp: String,
    #[serde(rename = "kwh")]
    pub consumption_kwh: f64,
    pub price: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Assumptions {
    pub pv_offset_pct: f64,
    pub area: Area,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementResult {
    pub period: Period,
    pub totals: Totals,
    #[serde(rename = "by_hour")]
    pub hourly_breakdown: Vec<HourlyBreakdown>,
    pub assumptions: Assumptions,
    #[serde(rename = "source_prices")]
    pub price_source_attribution: PriceSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArbitrageConfig {
    pub buy_threshold: f64,  // fraction of the daily mean
    pub sell_threshold: f64, // fraction of the daily mean
    pub lookahead_hours: usize,
    pub profit_per_unit: f64, // kWh -> MWh
    pub high_confidence_ratio: f64,
    pub medium_confidence_ratio: f64,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            buy_threshold: 0.85,
            sell_threshold: 1.15,
            lookahead_hours: 12,
            profit_per_unit: 1000.0,
            high_confidence_ratio: 0.2,
            medium_confidence_ratio: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoadShiftConfig {
    pub candidate_hours: usize,
    pub min_hour_distance: u32,
    pub shift_fraction: f64,
    pub default_carbon_intensity: f64, // gCO2/kWh
    pub carbon_scale: f64,             // -> kg
    pub small_shift_mw: f64,
    pub medium_shift_mw: f64,
    pub high_priority_savings: f64,   // JPY
    pub medium_priority_savings: f64, // JPY
}

impl Default for LoadShiftConfig {
    fn default() -> Self {
        Self {
            candidate_hours: 6,
            min_hour_distance: 2,
            shift_fraction: 0.10,
            default_carbon_intensity: 300.0,
            carbon_scale: 0.001,
            small_shift_mw: 1000.0,
            medium_shift_mw: 5000.0,
            high_priority_savings: 100_000.0,
            medium_priority_savings: 50_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatteryConfig {
    /// Spread (JPY/kWh) assumed when no opportunities were detected
    pub fallback_spread: f64,
    pub spec: BatterySpec,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            fallback_spread: 5.0,
            spec: BatterySpec::utility_10mwh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SettlementConfig {
    pub precision: f64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            precision: MONEY_PRECISION,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub arbitrage: ArbitrageConfig,
    pub load_shift: LoadShiftConfig,
    pub battery: BatteryConfig,
    pub settlement: SettlementConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_of_uses_own_offset() {
        assert_eq!(hour_of("2025-10-23T00:00:00+09:00").unwrap(), 0);
        assert_eq!(hour_of("2025-10-23T23:00:00+09:00").unwrap(), 23);
        assert!(matches!(hour_of("23:00"), Err(SignalError::Validation(_))));
    }

    #[test]
    fn test_area_parsing() {
        assert_eq!("Tokyo".parse::<Area>().unwrap(), Area::Tokyo);
        assert_eq!("kansai".parse::<Area>().unwrap(), Area::Kansai);
        assert!("hokkaido".parse::<Area>().is_err());
    }

    #[test]
    fn test_price_stats() {
        let prices = vec![
            PricePoint::new("2025-10-23T00:00:00+09:00", 10.0),
            PricePoint::new("2025-10-23T01:00:00+09:00", 20.0),
            PricePoint::new("2025-10-23T02:00:00+09:00", 30.0),
        ];

        let stats = PriceStats::from_series(&prices).unwrap();
        assert_eq!(stats.min_price, 10.0);
        assert_eq!(stats.max_price, 30.0);
        assert_eq!(stats.avg_price, 20.0);
        assert!(PriceStats::from_series(&[]).is_none());

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json, serde_json::json!({"min": 10.0, "max": 30.0, "avg": 20.0}));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"arbitrage": {"lookahead_hours": 6}}"#).unwrap();

        assert_eq!(config.arbitrage.lookahead_hours, 6);
        assert_eq!(config.arbitrage.buy_threshold, 0.85);
        assert_eq!(config.load_shift, LoadShiftConfig::default());
    }

    #[test]
    fn test_demand_point_wire_names() {
        let point: DemandPoint =
            serde_json::from_str(r#"{"ts": "2025-10-23T05:00:00+09:00", "demand_mw": 28000.0}"#)
                .unwrap();

        assert_eq!(point.demand, 28000.0);
        assert_eq!(point.forecast, None);
        assert_eq!(point.hour().unwrap(), 5);
    }
}
