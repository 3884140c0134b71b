use crate::error::{Result, SignalError};
use crate::models::{
    hour_of, Area, Assumptions, ConsumptionPoint, HourlyBreakdown, Period, PricePoint, PriceSource,
    SettlementConfig, SettlementRequest, SettlementResult, Totals,
};
use crate::scoring::round_to;
use std::collections::HashMap;

/// Where settlement prices come from
#[derive(Debug, Clone, PartialEq)]
pub enum PriceReference {
    /// Published hourly prices, looked up by hour of day
    Series {
        area: Area,
        date: String,
        points: Vec<PricePoint>,
        source: PriceSource,
    },
    /// Time-of-day multipliers over the area's base price
    TimeOfDay { area: Area, date: String },
}

impl PriceReference {
    pub fn series(area: Area, date: impl Into<String>, points: Vec<PricePoint>, source: PriceSource) -> Self {
        PriceReference::Series {
            area,
            date: date.into(),
            points,
            source,
        }
    }

    pub fn time_of_day(area: Area, date: impl Into<String>) -> Self {
        PriceReference::TimeOfDay {
            area,
            date: date.into(),
        }
    }

    pub fn area(&self) -> Area {
        match self {
            PriceReference::Series { area, .. } | PriceReference::TimeOfDay { area, .. } => *area,
        }
    }

    pub fn date(&self) -> &str {
        match self {
            PriceReference::Series { date, .. } | PriceReference::TimeOfDay { date, .. } => date,
        }
    }

    pub fn source(&self) -> PriceSource {
        match self {
            PriceReference::Series { source, .. } => source.clone(),
            PriceReference::TimeOfDay { .. } => PriceSource {
                name: "JEPX (time-of-day model)".to_string(),
                url: "https://www.jepx.jp/".to_string(),
            },
        }
    }

    fn hourly_prices(&self, precision: f64) -> Result<HashMap<u32, f64>> {
        match self {
            PriceReference::Series { area, date, points, .. } => {
                if points.is_empty() {
                    return Err(SignalError::DataUnavailable(format!(
                        "price series for {} on {} is empty",
                        area, date
                    )));
                }
                let mut by_hour = HashMap::with_capacity(24);
                for point in points {
                    by_hour.entry(point.hour()?).or_insert(point.price);
                }
                Ok(by_hour)
            }
            PriceReference::TimeOfDay { area, .. } => Ok((0..24)
                .map(|hour| (hour, round_to(area.base_price() * time_of_day_factor(hour), precision)))
                .collect()),
        }
    }
}

/// Night [0,6) 0.7, day [9,20) 1.3, shoulder hours 0.9
pub fn time_of_day_factor(hour: u32) -> f64 {
    match hour {
        0..=5 => 0.7,
        9..=19 => 1.3,
        _ => 0.9,
    }
}

pub struct SettlementCalculator {
    config: SettlementConfig,
}

impl SettlementCalculator {
    pub fn new(config: SettlementConfig) -> Self {
        Self { config }
    }

    /// Compute per-hour and total cost of a consumption profile.
    ///
    /// cost = kWh × price × (1 − pv_offset_pct). Per-hour figures are rounded
    /// when emitted; totals are rounded once from the unrounded sums.
    pub fn settle(
        &self,
        profile: &[ConsumptionPoint],
        reference: &PriceReference,
        pv_offset_pct: f64,
    ) -> Result<SettlementResult> {
        if profile.is_empty() {
            return Err(SignalError::Validation("profile cannot be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&pv_offset_pct) {
            log::warn!(
                "pv_offset_pct {} is outside [0, 1]; costs will be out of range",
                pv_offset_pct
            );
        }

        let precision = self.config.precision;
        let prices = reference.hourly_prices(precision)?;

        let mut total_kwh = 0.0;
        let mut total_cost = 0.0;
        let mut hourly_breakdown = Vec::with_capacity(profile.len());

        for point in profile {
            let hour = hour_of(&point.timestamp)?;
            let price = *prices.get(&hour).ok_or_else(|| {
                SignalError::DataUnavailable(format!("no price for {} (hour {})", point.timestamp, hour))
            })?;

            let effective_kwh = point.consumption_kwh * (1.0 - pv_offset_pct);
            let cost = effective_kwh * price;

            total_kwh += point.consumption_kwh;
            total_cost += cost;

            hourly_breakdown.push(HourlyBreakdown {
                timestamp: point.timestamp.clone(),
                consumption_kwh: round_to(point.consumption_kwh, precision),
                price: round_to(price, precision),
                cost: round_to(cost, precision),
            });
        }

        // Plain string order; only meaningful for same-offset timestamps
        let mut timestamps: Vec<&str> = profile.iter().map(|p| p.timestamp.as_str()).collect();
        timestamps.sort_unstable();
        let period = Period {
            from: timestamps[0].to_string(),
            to: timestamps[timestamps.len() - 1].to_string(),
        };

        log::debug!(
            "Settled {} points for {}: {:.1} kWh, {:.1} JPY",
            profile.len(),
            reference.area(),
            total_kwh,
            total_cost
        );

        Ok(SettlementResult {
            period,
            totals: Totals {
                consumption_kwh: round_to(total_kwh, precision),
                cost: round_to(total_cost, precision),
            },
            hourly_breakdown,
            assumptions: Assumptions {
                pv_offset_pct,
                area: reference.area(),
            },
            price_source_attribution: reference.source(),
        })
    }

    /// Settle a wire-level request. Without a published series for the
    /// requested area the time-of-day model prices the profile.
    pub fn settle_request(
        &self,
        request: &SettlementRequest,
        published: Option<PriceReference>,
    ) -> Result<SettlementResult> {
        let reference = match published {
            Some(reference)
                if reference.area() != request.prices.area || reference.date() != request.prices.date =>
            {
                return Err(SignalError::Validation(format!(
                    "price reference is for {} {}, request asks for {} {}",
                    reference.area(),
                    reference.date(),
                    request.prices.area,
                    request.prices.date
                )));
            }
            Some(reference) => reference,
            None => PriceReference::time_of_day(request.prices.area, request.prices.date.clone()),
        };

        self.settle(&request.profile, &reference, request.pv_offset_pct)
    }
}

impl Default for SettlementCalculator {
    fn default() -> Self {
        Self::new(SettlementConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricesRequest;

    fn ts(hour: u32) -> String {
        format!("2025-10-23T{:02}:00:00+09:00", hour)
    }

    const DATE: &str = "2025-10-23";

    fn flat_series(area: Area, price: f64) -> PriceReference {
        let points = (0..24).map(|h| PricePoint::new(ts(h), price)).collect();
        PriceReference::series(area, DATE, points, PriceSource::jepx())
    }

    #[test]
    fn test_flat_profile_flat_price() {
        let profile: Vec<_> = (0..24).map(|h| ConsumptionPoint::new(ts(h), 100.0)).collect();
        let calculator = SettlementCalculator::default();

        let result = calculator
            .settle(&profile, &flat_series(Area::Tokyo, 30.0), 0.15)
            .unwrap();

        assert_eq!(result.totals.consumption_kwh, 2400.0);
        assert_eq!(result.totals.cost, 61_200.0);
        assert_eq!(result.hourly_breakdown.len(), 24);
        assert_eq!(result.hourly_breakdown[0].cost, 2550.0);
        assert_eq!(result.assumptions.pv_offset_pct, 0.15);
        assert_eq!(result.assumptions.area, Area::Tokyo);
        assert_eq!(result.price_source_attribution.name, "JEPX");
        assert_eq!(result.period.from, ts(0));
        assert_eq!(result.period.to, ts(23));
    }

    #[test]
    fn test_single_hour_with_pv_offset() {
        let profile = vec![ConsumptionPoint::new(ts(0), 100.0)];
        let result = SettlementCalculator::default()
            .settle(&profile, &flat_series(Area::Tokyo, 20.0), 0.1)
            .unwrap();

        assert_eq!(result.hourly_breakdown[0].cost, 1800.0);
        assert_eq!(result.totals.consumption_kwh, 100.0);
        assert_eq!(result.totals.cost, 1800.0);
    }

    #[test]
    fn test_rounding_to_one_decimal() {
        let profile = vec![ConsumptionPoint::new(ts(0), 123.456)];
        let reference =
            PriceReference::series(Area::Tokyo, DATE, vec![PricePoint::new(ts(0), 25.789)], PriceSource::jepx());

        let result = SettlementCalculator::default().settle(&profile, &reference, 0.0).unwrap();

        assert_eq!(result.totals.consumption_kwh, 123.5);
        assert_eq!(result.totals.cost, 3183.8);
        assert_eq!(result.hourly_breakdown[0].price, 25.8);
    }

    #[test]
    fn test_totals_use_unrounded_sums() {
        let profile: Vec<_> = (0..4).map(|h| ConsumptionPoint::new(ts(h), 1.25)).collect();
        let result = SettlementCalculator::default()
            .settle(&profile, &flat_series(Area::Kansai, 1.0), 0.0)
            .unwrap();

        // each hour rounds 1.25 up to 1.3, the total does not compound that
        assert!(result.hourly_breakdown.iter().all(|h| h.cost == 1.3));
        assert_eq!(result.totals.cost, 5.0);
    }

    #[test]
    fn test_empty_profile_is_rejected() {
        let err = SettlementCalculator::default()
            .settle(&[], &PriceReference::time_of_day(Area::Tokyo, DATE), 0.15)
            .unwrap_err();

        assert_eq!(err, SignalError::Validation("profile cannot be empty".to_string()));
    }

    #[test]
    fn test_missing_hour_is_data_unavailable() {
        let profile = vec![
            ConsumptionPoint::new(ts(0), 100.0),
            ConsumptionPoint::new(ts(1), 100.0),
        ];
        let reference =
            PriceReference::series(Area::Tokyo, DATE, vec![PricePoint::new(ts(0), 30.0)], PriceSource::jepx());

        let result = SettlementCalculator::default().settle(&profile, &reference, 0.0);
        assert!(matches!(result, Err(SignalError::DataUnavailable(_))));

        let empty = PriceReference::series(Area::Tokyo, DATE, vec![], PriceSource::jepx());
        let result = SettlementCalculator::default().settle(&profile, &empty, 0.0);
        assert!(matches!(result, Err(SignalError::DataUnavailable(_))));
    }

    #[test]
    fn test_out_of_range_pv_offset_is_not_clamped() {
        let profile = vec![ConsumptionPoint::new(ts(0), 100.0)];
        let result = SettlementCalculator::default()
            .settle(&profile, &flat_series(Area::Tokyo, 30.0), 1.5)
            .unwrap();

        assert_eq!(result.totals.cost, -1500.0);
    }

    #[test]
    fn test_time_of_day_prices() {
        let profile: Vec<_> = [0, 7, 12, 21]
            .iter()
            .map(|h| ConsumptionPoint::new(ts(*h), 10.0))
            .collect();

        let tokyo = SettlementCalculator::default()
            .settle(&profile, &PriceReference::time_of_day(Area::Tokyo, DATE), 0.0)
            .unwrap();
        let prices: Vec<f64> = tokyo.hourly_breakdown.iter().map(|h| h.price).collect();
        assert_eq!(prices, vec![21.0, 27.0, 39.0, 27.0]);
        assert_eq!(tokyo.price_source_attribution.name, "JEPX (time-of-day model)");

        let kansai = SettlementCalculator::default()
            .settle(&profile, &PriceReference::time_of_day(Area::Kansai, DATE), 0.0)
            .unwrap();
        let prices: Vec<f64> = kansai.hourly_breakdown.iter().map(|h| h.price).collect();
        assert_eq!(prices, vec![19.6, 25.2, 36.4, 25.2]);
    }

    #[test]
    fn test_period_uses_string_order() {
        let profile = vec![
            ConsumptionPoint::new(ts(5), 1.0),
            ConsumptionPoint::new(ts(2), 1.0),
            ConsumptionPoint::new(ts(9), 1.0),
        ];
        let result = SettlementCalculator::default()
            .settle(&profile, &PriceReference::time_of_day(Area::Tokyo, DATE), 0.0)
            .unwrap();

        assert_eq!(result.period.from, ts(2));
        assert_eq!(result.period.to, ts(9));
        // breakdown keeps profile order
        assert_eq!(result.hourly_breakdown[0].timestamp, ts(5));
    }

    #[test]
    fn test_settle_is_deterministic() {
        let profile: Vec<_> = (0..24)
            .map(|h| ConsumptionPoint::new(ts(h), 80.0 + f64::from(h) * 1.7))
            .collect();
        let reference = PriceReference::time_of_day(Area::Kansai, DATE);
        let calculator = SettlementCalculator::default();

        let first = calculator.settle(&profile, &reference, 0.15).unwrap();
        let second = calculator.settle(&profile, &reference, 0.15).unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_settle_request_wire_shape() {
        let request: SettlementRequest = serde_json::from_str(
            r#"{
                "profile": [{"ts": "2025-10-23T10:00:00+09:00", "kwh": 50}],
                "prices": {"area": "tokyo", "date": "2025-10-23"},
                "pv_offset_pct": 0.0
            }"#,
        )
        .unwrap();

        let result = SettlementCalculator::default().settle_request(&request, None).unwrap();
        assert_eq!(result.totals.cost, 1950.0);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totals"]["cost_yen"], 1950.0);
        assert_eq!(json["by_hour"][0]["kwh"], 50.0);
        assert_eq!(json["assumptions"]["area"], "tokyo");
        assert!(json["source_prices"]["url"].is_string());

        let wrong_area = flat_series(Area::Kansai, 30.0);
        let request = SettlementRequest {
            prices: PricesRequest {
                area: Area::Tokyo,
                date: "2025-10-23".to_string(),
            },
            ..request
        };
        assert!(matches!(
            SettlementCalculator::default().settle_request(&request, Some(wrong_area)),
            Err(SignalError::Validation(_))
        ));
    }
}
