use std::convert::TryFrom;
use std::fmt;

use stats::{MinMax, OnlineStats};

use super::*;

/// Side-by-side view of a portfolio before and after a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationReport {
    pub balance: BalanceChange,
    pub positions: Vec<PositionChange>,
    pub drift: DriftSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    pub old_value: f64,
    pub new_value: f64,
    pub diff: f64,
}

/// Percentages are relative to the invested value (shares only, no cash) of
/// the snapshot they describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionChange {
    pub ticker: String,
    pub price: f64,
    pub target_percentage: f64,
    pub quantity: u64,
    pub old_quantity: u64,
    pub diff_quantity: i64,
    pub old_total: f64,
    pub new_total: f64,
    pub diff_total: f64,
    pub old_percentage: f64,
    pub new_percentage: f64,
    pub diff_percentage: f64,
}

/// Distance, in percentage points, between where positions ended up and
/// where they were meant to be. Measured like the targets themselves: as a
/// share of everything available, leftover cash included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftSummary {
    pub mean: f64,
    pub stddev: f64,
    pub max: f64,
}

impl CalculationReport {
    pub fn new(before: &Portfolio, after: &Portfolio) -> CalculationReport {
        let old_invested = before.total_value();
        let new_invested = after.total_value();

        let positions: Vec<PositionChange> = after.positions.iter()
            .map(|p| {
                let (old_quantity, old_total) = match before.position(&p.ticker) {
                    Some(old) => (old.quantity, old.value()),
                    None => (0, 0.0),
                };
                let new_total = p.value();
                let old_percentage = share_of(old_total, old_invested);
                let new_percentage = share_of(new_total, new_invested);
                PositionChange {
                    ticker: p.ticker.clone(),
                    price: p.price,
                    target_percentage: p.target_percentage,
                    quantity: p.quantity,
                    old_quantity,
                    diff_quantity: quantity_change(old_quantity, p.quantity),
                    old_total,
                    new_total,
                    diff_total: new_total - old_total,
                    old_percentage,
                    new_percentage,
                    diff_percentage: new_percentage - old_percentage,
                }
            })
            .collect();

        CalculationReport {
            balance: BalanceChange {
                old_value: before.balance,
                new_value: after.balance,
                diff: after.balance - before.balance,
            },
            drift: DriftSummary::of(&positions, after.total_available()),
            positions,
        }
    }
}

impl DriftSummary {
    fn of(positions: &[PositionChange], total_available: f64) -> DriftSummary {
        if positions.is_empty() {
            return DriftSummary::default();
        }
        let drifts = || positions.iter()
            .map(|p| (share_of(p.new_total, total_available) - p.target_percentage).abs());
        let online: OnlineStats = drifts().collect();
        let extremes: MinMax<f64> = drifts().collect();
        DriftSummary {
            mean: online.mean(),
            stddev: online.stddev(),
            max: extremes.max().copied().unwrap_or(0.0),
        }
    }
}

/// Saturates instead of wrapping for counts beyond `i64`.
fn quantity_change(old: u64, new: u64) -> i64 {
    if new >= old {
        i64::try_from(new - old).unwrap_or(i64::MAX)
    } else {
        i64::try_from(old - new).map_or(i64::MIN, |d| -d)
    }
}

fn share_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value / total * 100.0
    } else {
        0.0
    }
}

pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

pub fn format_percentage(percentage: f64) -> String {
    // avoid "-0.00%"
    if (percentage * 100.0).round() == 0.0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", percentage)
}

/// Signed change marker shown next to a value; nothing when unchanged.
fn suffix(diff: f64, format: fn(f64) -> String) -> String {
    if diff > 0.0 {
        format!(" +{}", format(diff))
    } else if diff < 0.0 {
        format!(" {}", format(diff))
    } else {
        String::new()
    }
}

fn quantity_suffix(diff: i64) -> String {
    match diff {
        0 => String::new(),
        d if d > 0 => format!(" +{}", d),
        d => format!(" {}", d),
    }
}

impl fmt::Display for CalculationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f, "Result balance: {}{}",
            format_currency(self.balance.new_value),
            suffix(self.balance.diff, format_currency)
        )?;
        writeln!(f, "{:<10} {:>16} {:>28} {:>24}", "Ticker", "Quantity", "Total", "Result %")?;
        if self.positions.is_empty() {
            return writeln!(f, "No positions");
        }
        for p in self.positions.iter() {
            writeln!(
                f, "{:<10} {:>16} {:>28} {:>24}",
                p.ticker,
                format!("{}{}", p.quantity, quantity_suffix(p.diff_quantity)),
                format!("{}{}", format_currency(p.new_total), suffix(p.diff_total, format_currency)),
                format!("{}{}", format_percentage(p.new_percentage), suffix(p.diff_percentage, format_percentage)),
            )?;
        }
        Ok(())
    }
}
