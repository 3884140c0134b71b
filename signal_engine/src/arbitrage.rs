use crate::error::{Result, SignalError};
use crate::models::{ArbitrageConfig, ArbitrageOpportunity, Confidence, PricePoint, Signal};
use crate::scoring::{deviation_pct, mean};

pub struct ArbitrageDetector {
    config: ArbitrageConfig,
}

impl ArbitrageDetector {
    pub fn new(config: ArbitrageConfig) -> Self {
        Self { config }
    }

    /// Detect buy/sell signals over one area's daily price series.
    ///
    /// Hold points are dropped; the remaining opportunities keep input order.
    pub fn detect(&self, prices: &[PricePoint]) -> Result<Vec<ArbitrageOpportunity>> {
        let avg_price = mean(prices.iter().map(|p| p.price))
            .ok_or_else(|| SignalError::Validation("price series cannot be empty".to_string()))?;

        let mut opportunities = Vec::new();

        for (i, current) in prices.iter().enumerate() {
            let signal = self.classify(current.price, avg_price);
            if signal == Signal::Hold {
                continue;
            }

            let target = self.find_target(prices, i, signal);
            let spread = (target.price - current.price).abs();
            let hour = current.hour()?;

            opportunities.push(ArbitrageOpportunity {
                timestamp: current.timestamp.clone(),
                hour,
                signal,
                current_price: current.price,
                target_price: target.price,
                spread,
                expected_profit: spread * self.config.profit_per_unit,
                confidence: self.confidence(spread, avg_price),
                recommendation_text: recommendation_text(signal, hour, spread),
                reasoning: self.reasoning(signal, current.price, avg_price, spread),
            });
        }

        log::debug!(
            "Detected {} actionable signals over {} price points (avg {:.2})",
            opportunities.len(),
            prices.len(),
            avg_price
        );

        Ok(opportunities)
    }

    pub fn classify(&self, price: f64, avg_price: f64) -> Signal {
        if price < avg_price * self.config.buy_threshold {
            Signal::Buy
        } else if price > avg_price * self.config.sell_threshold {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    pub fn confidence(&self, spread: f64, avg_price: f64) -> Confidence {
        if spread > avg_price * self.config.high_confidence_ratio {
            Confidence::High
        } else if spread > avg_price * self.config.medium_confidence_ratio {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Best counter-trade within the look-ahead window; the point itself when
    /// the window is empty. Ties resolve to the earliest hour.
    fn find_target<'a>(&self, prices: &'a [PricePoint], index: usize, signal: Signal) -> &'a PricePoint {
        let start = (index + 1).min(prices.len());
        let end = (index + 1 + self.config.lookahead_hours).min(prices.len());
        let window = &prices[start..end];

        let mut best = match window.first() {
            Some(first) => first,
            None => return &prices[index],
        };

        for candidate in &window[1..] {
            let better = match signal {
                Signal::Buy => candidate.price > best.price,
                Signal::Sell => candidate.price < best.price,
                Signal::Hold => false,
            };
            if better {
                best = candidate;
            }
        }

        best
    }

    fn reasoning(&self, signal: Signal, current_price: f64, avg_price: f64, spread: f64) -> Vec<String> {
        let deviation = deviation_pct(current_price, avg_price).abs();
        let strong = spread > avg_price * self.config.high_confidence_ratio;
        let mut reasons = Vec::with_capacity(3);

        match signal {
            Signal::Buy => {
                reasons.push(format!(
                    "Current price (¥{:.2}/kWh) is {}% below daily average",
                    current_price, deviation
                ));
                reasons.push("Expected price recovery creates arbitrage opportunity".to_string());
                if strong {
                    reasons.push("Large price deviation indicates strong opportunity".to_string());
                }
            }
            Signal::Sell => {
                reasons.push(format!(
                    "Current price (¥{:.2}/kWh) is {}% above daily average",
                    current_price, deviation
                ));
                reasons.push("Expected price normalization creates selling opportunity".to_string());
                if strong {
                    reasons.push("Price spike provides favorable selling conditions".to_string());
                }
            }
            Signal::Hold => {}
        }

        reasons
    }
}

impl Default for ArbitrageDetector {
    fn default() -> Self {
        Self::new(ArbitrageConfig::default())
    }
}

fn recommendation_text(signal: Signal, hour: u32, spread: f64) -> String {
    match signal {
        Signal::Buy => format!(
            "Buy at {}:00. Price {:.2} JPY/kWh below the best price in the next window. Sell when prices recover.",
            hour, spread
        ),
        Signal::Sell => format!(
            "Sell at {}:00. Price {:.2} JPY/kWh above the best price in the next window. Buy back when prices drop.",
            hour, spread
        ),
        Signal::Hold => format!("Hold at {}:00.", hour),
    }
}
