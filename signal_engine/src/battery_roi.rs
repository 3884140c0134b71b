use crate::error::{Result, SignalError};
use crate::models::{ArbitrageOpportunity, BatteryConfig, BatteryRoi, BatterySpec};
use crate::scoring::{mean, round_to, MONEY_PRECISION};
use serde::{Deserialize, Serialize};

/// Where the spread driving a projection came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "basis", content = "spread", rename_all = "lowercase")]
pub enum SpreadBasis {
    /// Mean spread of the detected opportunities
    Observed(f64),
    /// No opportunities were detected; configured default
    Fallback(f64),
}

impl SpreadBasis {
    pub fn value(&self) -> f64 {
        match self {
            SpreadBasis::Observed(spread) | SpreadBasis::Fallback(spread) => *spread,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SpreadBasis::Fallback(_))
    }
}

pub struct BatteryRoiCalculator {
    config: BatteryConfig,
    precision: f64,
}

impl BatteryRoiCalculator {
    pub fn new(config: BatteryConfig) -> Self {
        Self {
            config,
            precision: MONEY_PRECISION,
        }
    }

    /// Round emitted figures to `precision` instead of 0.1; callers pass the
    /// settlement precision so both share one rounding policy.
    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    pub fn spread_basis(&self, opportunities: &[ArbitrageOpportunity]) -> SpreadBasis {
        match mean(opportunities.iter().map(|o| o.spread)) {
            Some(spread) => SpreadBasis::Observed(spread),
            None => SpreadBasis::Fallback(self.config.fallback_spread),
        }
    }

    /// Project profit, payback and ROI for a battery cycling at `avg_spread` (JPY/kWh).
    ///
    /// A zero yearly profit yields `payback_years == f64::INFINITY`.
    pub fn project(&self, spec: &BatterySpec, avg_spread: f64) -> Result<BatteryRoi> {
        validate(spec, avg_spread)?;

        // capacity is in MWh, spread in JPY/kWh
        let daily_profit = spec.capacity_mwh * 1000.0 * spec.cycles_per_day * avg_spread * spec.efficiency;
        let monthly_profit = daily_profit * 30.0;
        let yearly_profit = daily_profit * 365.0;

        let payback_years = if yearly_profit > 0.0 {
            spec.capital_cost / yearly_profit
        } else {
            log::debug!("Battery never pays back: zero yearly profit at spread {:.2}", avg_spread);
            f64::INFINITY
        };
        let roi_pct = yearly_profit / spec.capital_cost * 100.0;

        Ok(BatteryRoi {
            capacity: spec.capacity_mwh,
            cycles_per_day: spec.cycles_per_day,
            efficiency: spec.efficiency,
            capital_cost: spec.capital_cost,
            daily_profit: round_to(daily_profit, self.precision),
            monthly_profit: round_to(monthly_profit, self.precision),
            yearly_profit: round_to(yearly_profit, self.precision),
            payback_years: round_to(payback_years, self.precision),
            roi_pct: round_to(roi_pct, self.precision),
        })
    }

    /// Project using the mean spread of `opportunities`, or the configured
    /// fallback when there are none.
    pub fn project_from_opportunities(
        &self,
        spec: &BatterySpec,
        opportunities: &[ArbitrageOpportunity],
    ) -> Result<(BatteryRoi, SpreadBasis)> {
        let basis = self.spread_basis(opportunities);
        let roi = self.project(spec, basis.value())?;
        Ok((roi, basis))
    }
}

impl Default for BatteryRoiCalculator {
    fn default() -> Self {
        Self::new(BatteryConfig::default())
    }
}

fn validate(spec: &BatterySpec, avg_spread: f64) -> Result<()> {
    if !(spec.efficiency > 0.0 && spec.efficiency <= 1.0) {
        return Err(SignalError::Validation(format!(
            "efficiency must be in (0, 1], got {}",
            spec.efficiency
        )));
    }
    if spec.capacity_mwh < 0.0 || spec.cycles_per_day < 0.0 {
        return Err(SignalError::Validation(
            "capacity and cycles per day cannot be negative".to_string(),
        ));
    }
    if !(spec.capital_cost > 0.0) {
        return Err(SignalError::Validation(format!(
            "capital cost must be positive, got {}",
            spec.capital_cost
        )));
    }
    if !(avg_spread >= 0.0) {
        return Err(SignalError::Validation(format!("spread cannot be negative, got {}", avg_spread)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, Signal};

    fn opportunity(spread: f64) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            timestamp: "2025-10-23T03:00:00+09:00".to_string(),
            hour: 3,
            signal: Signal::Buy,
            current_price: 10.0,
            target_price: 10.0 + spread,
            spread,
            expected_profit: spread * 1000.0,
            confidence: Confidence::High,
            recommendation_text: String::new(),
            reasoning: vec![],
        }
    }

    #[test]
    fn test_utility_battery_projection() {
        let calculator = BatteryRoiCalculator::default();
        let spec = BatterySpec::new(10.0, 1.0, 0.9, 100_000_000.0);

        let roi = calculator.project(&spec, 5.0).unwrap();

        let yearly = 45_000.0 * 365.0;
        assert_eq!(roi.daily_profit, 45_000.0);
        assert_eq!(roi.monthly_profit, 1_350_000.0);
        assert_eq!(roi.yearly_profit, yearly);
        assert_eq!(roi.payback_years, round_to(100_000_000.0 / yearly, 0.1));
        assert_eq!(roi.roi_pct, round_to(yearly / 100_000_000.0 * 100.0, 0.1));
        assert_eq!(roi.payback_years, 6.1);
        assert!(roi.pays_back());
    }

    #[test]
    fn test_zero_profit_reports_infinite_payback() {
        let calculator = BatteryRoiCalculator::default();
        let spec = BatterySpec::utility_10mwh();

        let roi = calculator.project(&spec, 0.0).unwrap();

        assert_eq!(roi.yearly_profit, 0.0);
        assert_eq!(roi.roi_pct, 0.0);
        assert!(roi.payback_years.is_infinite());
        assert!(matches!(roi.payback_years_checked(), Err(SignalError::DivisionUndefined(_))));

        let json = serde_json::to_string(&roi).unwrap();
        assert!(json.contains(r#""payback_years":null"#));
        let back: BatteryRoi = serde_json::from_str(&json).unwrap();
        assert!(back.payback_years.is_infinite());
        assert_eq!(back, roi);
    }

    #[test]
    fn test_finite_payback_survives_json() {
        let roi = BatteryRoiCalculator::default()
            .project(&BatterySpec::utility_10mwh(), 5.0)
            .unwrap();

        let json = serde_json::to_string(&roi).unwrap();
        assert!(json.contains(r#""payback_years":6.1"#));
        assert_eq!(serde_json::from_str::<BatteryRoi>(&json).unwrap(), roi);
    }

    #[test]
    fn test_configured_precision() {
        let spec = BatterySpec::utility_10mwh();

        let default = BatteryRoiCalculator::default().project(&spec, 5.0).unwrap();
        assert_eq!(default.roi_pct, 16.4); // 16.425

        let whole = BatteryRoiCalculator::default()
            .with_precision(1.0)
            .project(&spec, 5.0)
            .unwrap();
        assert_eq!(whole.roi_pct, 16.0);
        assert_eq!(whole.payback_years, 6.0);
    }

    #[test]
    fn test_spread_falls_back_explicitly() {
        let calculator = BatteryRoiCalculator::default();

        let basis = calculator.spread_basis(&[]);
        assert_eq!(basis, SpreadBasis::Fallback(5.0));
        assert!(basis.is_fallback());

        let basis = calculator.spread_basis(&[opportunity(4.0), opportunity(8.0)]);
        assert_eq!(basis, SpreadBasis::Observed(6.0));
    }

    #[test]
    fn test_projection_from_opportunities() {
        let calculator = BatteryRoiCalculator::default();
        let spec = BatterySpec::new(2.0, 2.0, 1.0, 10_000_000.0);

        let (roi, basis) = calculator
            .project_from_opportunities(&spec, &[opportunity(3.0)])
            .unwrap();

        assert_eq!(basis, SpreadBasis::Observed(3.0));
        assert_eq!(roi.daily_profit, 12_000.0);
    }

    #[test]
    fn test_invalid_specs_are_rejected() {
        let calculator = BatteryRoiCalculator::default();

        for spec in [
            BatterySpec::new(10.0, 1.0, 0.0, 1_000.0),
            BatterySpec::new(10.0, 1.0, 1.2, 1_000.0),
            BatterySpec::new(-1.0, 1.0, 0.9, 1_000.0),
            BatterySpec::new(10.0, 1.0, 0.9, 0.0),
        ] {
            assert!(matches!(calculator.project(&spec, 5.0), Err(SignalError::Validation(_))));
        }
    }
}
