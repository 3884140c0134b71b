use signal_engine::{
    models::Signal, Area, AreaDay, ConsumptionPoint, DemandPoint, PricePoint, PriceReference, SettlementCalculator,
    SignalEngine,
};

fn main() {
    let engine = SignalEngine::default();

    // One day of Tokyo prices and demand
    // Night (cheap): 11 JPY/kWh
    // Day: 24 JPY/kWh
    // Evening peak: 41 JPY/kWh
    let ts = |hour: u32| format!("2025-10-23T{:02}:00:00+09:00", hour);
    let mut prices = vec![];
    let mut demand = vec![];
    for hour in 0..24 {
        let (price, load) = match hour {
            0..=5 => (11.0, 25_000.0),
            17..=20 => (41.0, 42_000.0),
            _ => (24.0, 34_000.0),
        };
        prices.push(PricePoint::new(ts(hour), price));
        demand.push(DemandPoint::new(ts(hour), load));
    }

    let day = AreaDay {
        area: Area::Tokyo,
        date: "2025-10-23".to_string(),
        prices,
        demand,
    };

    let analysis = match engine.analyze(&day) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("analysis failed: {}", e);
            return;
        }
    };

    println!("Trading Signals: {} {}", analysis.area, analysis.date);
    println!("==============================");
    for opp in &analysis.best_opportunities {
        let side = match opp.signal {
            Signal::Buy => "BUY ",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        };
        println!(
            "  {} {:02}:00 @ ¥{:.2} -> ¥{:.2} (spread ¥{:.2}, {:?})",
            side, opp.hour, opp.current_price, opp.target_price, opp.spread, opp.confidence
        );
    }
    println!();

    println!("Load Shifts:");
    for rec in &analysis.priority_load_shifts {
        println!("  {} saves ¥{:.0} (feasibility {})", rec.id, rec.savings, rec.feasibility);
    }
    println!();

    let roi = &analysis.battery_roi;
    println!("Battery: {} MWh, {} cycles/day", roi.capacity, roi.cycles_per_day);
    println!("  Daily profit:  ¥{:.1}", roi.daily_profit);
    println!("  Yearly profit: ¥{:.1}", roi.yearly_profit);
    println!("  Payback:       {:.1} years", roi.payback_years);
    println!("  ROI:           {:.1}%", roi.roi_pct);
    println!();

    let profile: Vec<_> = (0..24).map(|h| ConsumptionPoint::new(ts(h), 100.0)).collect();
    let reference = PriceReference::time_of_day(Area::Tokyo, "2025-10-23");
    match SettlementCalculator::default().settle(&profile, &reference, 0.15) {
        Ok(result) => println!(
            "Settlement {} .. {}: {:.1} kWh, ¥{:.1}",
            result.period.from, result.period.to, result.totals.consumption_kwh, result.totals.cost
        ),
        Err(e) => eprintln!("settlement failed: {}", e),
    }
}
