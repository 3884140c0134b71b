use crate::error::{Result, SignalError};
use crate::models::{
    DemandPoint, LoadProfileEntry, LoadShiftConfig, LoadShiftRecommendation, PricePoint, Priority,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoadShiftPlan {
    pub recommendations: Vec<LoadShiftRecommendation>,
    pub profile: Vec<LoadProfileEntry>,
}

pub struct LoadShiftPlanner {
    config: LoadShiftConfig,
}

impl LoadShiftPlanner {
    pub fn new(config: LoadShiftConfig) -> Self {
        Self { config }
    }

    /// Plan load shifts using the configured default carbon intensity for every hour.
    pub fn plan(&self, prices: &[PricePoint], demand: &[DemandPoint]) -> Result<LoadShiftPlan> {
        self.plan_with_intensity(prices, demand, |_| None)
    }

    /// Plan load shifts; `intensity` maps an hour to gCO2/kWh when a
    /// generation-mix estimate exists for it.
    pub fn plan_with_intensity<F>(
        &self,
        prices: &[PricePoint],
        demand: &[DemandPoint],
        intensity: F,
    ) -> Result<LoadShiftPlan>
    where
        F: Fn(u32) -> Option<f64>,
    {
        if prices.is_empty() {
            return Err(SignalError::DataUnavailable("price series is missing".to_string()));
        }
        if demand.is_empty() {
            return Err(SignalError::DataUnavailable("demand series is missing".to_string()));
        }

        let profile = self.build_profile(prices, demand, intensity)?;

        // Stable sort: ties keep hour order
        let mut sorted_by_price: Vec<&LoadProfileEntry> = profile.iter().collect();
        sorted_by_price.sort_by(|a, b| b.price.total_cmp(&a.price));

        let n = self.config.candidate_hours.min(sorted_by_price.len());
        let high_price_hours = &sorted_by_price[..n];
        let low_price_hours = &sorted_by_price[sorted_by_price.len() - n..];

        let mut recommendations = Vec::new();
        for high in high_price_hours {
            for low in low_price_hours {
                if let Some(rec) = self.evaluate_shift(high, low) {
                    recommendations.push(rec);
                }
            }
        }

        log::debug!(
            "Built {}-hour load profile, {} shift recommendations",
            profile.len(),
            recommendations.len()
        );

        Ok(LoadShiftPlan {
            recommendations,
            profile,
        })
    }

    fn build_profile<F>(
        &self,
        prices: &[PricePoint],
        demand: &[DemandPoint],
        intensity: F,
    ) -> Result<Vec<LoadProfileEntry>>
    where
        F: Fn(u32) -> Option<f64>,
    {
        let mut price_by_hour: HashMap<u32, f64> = HashMap::new();
        for point in prices {
            price_by_hour.entry(point.hour()?).or_insert(point.price);
        }

        let mut demand_by_hour: HashMap<u32, f64> = HashMap::new();
        for point in demand {
            demand_by_hour.entry(point.hour()?).or_insert(point.demand);
        }

        let profile = (0..24)
            .filter_map(|hour| {
                let price = price_by_hour.get(&hour)?;
                let load = demand_by_hour.get(&hour)?;
                Some(LoadProfileEntry {
                    hour,
                    current_load: *load,
                    price: *price,
                    carbon_intensity: intensity(hour).unwrap_or(self.config.default_carbon_intensity),
                })
            })
            .collect();

        Ok(profile)
    }

    fn evaluate_shift(&self, high: &LoadProfileEntry, low: &LoadProfileEntry) -> Option<LoadShiftRecommendation> {
        let distance = high.hour.abs_diff(low.hour);
        if distance < self.config.min_hour_distance {
            return None;
        }

        let shift_amount = high.current_load * self.config.shift_fraction;
        let current_cost = high.current_load * high.price;
        let optimized_cost = (high.current_load - shift_amount) * high.price + shift_amount * low.price;
        let savings = current_cost - optimized_cost;

        if savings <= 0.0 {
            return None;
        }

        Some(LoadShiftRecommendation {
            id: LoadShiftRecommendation::id_for(high.hour, low.hour),
            from_hour: high.hour,
            to_hour: low.hour,
            shift_amount,
            current_cost,
            optimized_cost,
            savings,
            carbon_reduction: shift_amount
                * (high.carbon_intensity - low.carbon_intensity)
                * self.config.carbon_scale,
            feasibility: self.feasibility(high.hour, low.hour, shift_amount),
            priority: self.priority(savings),
            reason_text: format!(
                "Shift {:.0}MW from {}:00 (¥{:.2}/kWh) to {}:00 (¥{:.2}/kWh)",
                shift_amount, high.hour, high.price, low.hour, low.price
            ),
        })
    }

    /// Heuristic 0-100 score: nearer hours, smaller amounts and night
    /// endpoints are easier to shift.
    pub fn feasibility(&self, from_hour: u32, to_hour: u32, amount_mw: f64) -> u8 {
        let distance = f64::from(from_hour.abs_diff(to_hour));
        let time_factor = (100.0 - distance * 5.0).max(0.0);

        let amount_factor = if amount_mw <= self.config.small_shift_mw {
            100.0
        } else if amount_mw <= self.config.medium_shift_mw {
            80.0
        } else {
            60.0
        };

        let night_bonus = if is_night_hour(from_hour) || is_night_hour(to_hour) {
            20.0
        } else {
            0.0
        };

        ((time_factor + amount_factor + night_bonus) / 2.2).round().clamp(0.0, 100.0) as u8
    }

    pub fn priority(&self, savings: f64) -> Priority {
        if savings > self.config.high_priority_savings {
            Priority::High
        } else if savings > self.config.medium_priority_savings {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl Default for LoadShiftPlanner {
    fn default() -> Self {
        Self::new(LoadShiftConfig::default())
    }
}

/// 22:00 through 06:00 inclusive
fn is_night_hour(hour: u32) -> bool {
    hour >= 22 || hour <= 6
}
