use crate::models::{ArbitrageOpportunity, LoadShiftRecommendation, Signal};
use crate::scoring::mean;
use serde::{Deserialize, Serialize};

const TOP_N: usize = 5;
const PRIORITY_FEASIBILITY: u8 = 70;

/// Dashboard summary over one day's signals
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradingMetrics {
    pub total_opportunities: usize,
    pub estimated_daily_savings: f64,    // JPY
    pub estimated_monthly_savings: f64,  // JPY
    pub carbon_reduction_potential: f64, // kg CO2
    pub optimal_battery_size: f64,       // MWh
    pub average_arbitrage_spread: f64,   // JPY/kWh
}

impl TradingMetrics {
    /// `None` when no opportunities were detected.
    pub fn from_results(
        opportunities: &[ArbitrageOpportunity],
        recommendations: &[LoadShiftRecommendation],
    ) -> Option<Self> {
        let average_arbitrage_spread = mean(opportunities.iter().map(|o| o.spread))?;

        let estimated_daily_savings: f64 = recommendations.iter().map(|r| r.savings).sum();
        let carbon_reduction_potential = recommendations.iter().map(|r| r.carbon_reduction).sum();

        Some(Self {
            total_opportunities: opportunities.iter().filter(|o| o.signal != Signal::Hold).count(),
            estimated_daily_savings,
            estimated_monthly_savings: estimated_daily_savings * 30.0,
            carbon_reduction_potential,
            optimal_battery_size: optimal_battery_size(opportunities),
            average_arbitrage_spread,
        })
    }
}

/// Battery size (MWh) proportional to the widest spread seen
pub fn optimal_battery_size(opportunities: &[ArbitrageOpportunity]) -> f64 {
    if opportunities.is_empty() {
        return 0.0;
    }
    let max_spread = opportunities.iter().map(|o| o.spread).fold(f64::NEG_INFINITY, f64::max);
    (max_spread * 10.0).round()
}

/// Top five actionable opportunities by expected profit
pub fn best_opportunities(opportunities: &[ArbitrageOpportunity]) -> Vec<ArbitrageOpportunity> {
    let mut best: Vec<_> = opportunities
        .iter()
        .filter(|o| o.signal != Signal::Hold)
        .cloned()
        .collect();
    best.sort_by(|a, b| b.expected_profit.total_cmp(&a.expected_profit));
    best.truncate(TOP_N);
    best
}

/// Top five feasible shifts by savings
pub fn priority_load_shifts(recommendations: &[LoadShiftRecommendation]) -> Vec<LoadShiftRecommendation> {
    let mut shifts: Vec<_> = recommendations
        .iter()
        .filter(|r| r.feasibility > PRIORITY_FEASIBILITY)
        .cloned()
        .collect();
    shifts.sort_by(|a, b| b.savings.total_cmp(&a.savings));
    shifts.truncate(TOP_N);
    shifts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, Priority};

    fn opportunity(hour: u32, signal: Signal, spread: f64) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            timestamp: format!("2025-10-23T{:02}:00:00+09:00", hour),
            hour,
            signal,
            current_price: 20.0,
            target_price: 20.0 + spread,
            spread,
            expected_profit: spread * 1000.0,
            confidence: Confidence::Medium,
            recommendation_text: String::new(),
            reasoning: vec![],
        }
    }

    fn shift(from_hour: u32, feasibility: u8, savings: f64) -> LoadShiftRecommendation {
        LoadShiftRecommendation {
            id: LoadShiftRecommendation::id_for(from_hour, 3),
            from_hour,
            to_hour: 3,
            shift_amount: 1000.0,
            current_cost: savings * 10.0,
            optimized_cost: savings * 9.0,
            savings,
            carbon_reduction: 50.0,
            feasibility,
            priority: Priority::Low,
            reason_text: String::new(),
        }
    }

    #[test]
    fn test_metrics_absent_without_opportunities() {
        assert!(TradingMetrics::from_results(&[], &[shift(18, 80, 1000.0)]).is_none());
    }

    #[test]
    fn test_metrics_summary() {
        let opportunities = vec![
            opportunity(3, Signal::Buy, 12.34),
            opportunity(14, Signal::Sell, 7.66),
        ];
        let recommendations = vec![shift(18, 80, 1000.0), shift(19, 50, 500.0)];

        let metrics = TradingMetrics::from_results(&opportunities, &recommendations).unwrap();

        assert_eq!(metrics.total_opportunities, 2);
        assert_eq!(metrics.estimated_daily_savings, 1500.0);
        assert_eq!(metrics.estimated_monthly_savings, 45_000.0);
        assert_eq!(metrics.carbon_reduction_potential, 100.0);
        assert_eq!(metrics.optimal_battery_size, 123.0);
        assert!((metrics.average_arbitrage_spread - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_opportunities_top_five_by_profit() {
        let opportunities: Vec<_> = (0..8)
            .map(|h| opportunity(h, if h % 2 == 0 { Signal::Buy } else { Signal::Sell }, f64::from(h)))
            .chain(std::iter::once(opportunity(9, Signal::Hold, 99.0)))
            .collect();

        let best = best_opportunities(&opportunities);

        let hours: Vec<_> = best.iter().map(|o| o.hour).collect();
        assert_eq!(hours, vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn test_priority_load_shifts_filter_and_order() {
        let recommendations = vec![
            shift(12, 70, 9_000.0),
            shift(13, 71, 2_000.0),
            shift(14, 90, 5_000.0),
            shift(15, 86, 1_000.0),
        ];

        let ids: Vec<_> = priority_load_shifts(&recommendations)
            .into_iter()
            .map(|r| r.from_hour)
            .collect();

        assert_eq!(ids, vec![14, 13, 15]);
    }
}
