use std::collections::HashMap;

use stats::MinMax;

use super::*;

/// Passes a capped calculation may take before it is abandoned.
pub const DEFAULT_MAX_PASSES: u64 = 1_000_000;

/// Working state for one ticker while a calculation runs.
struct Holding {
    quantity: u64,
    value: f64,
    target: f64,
}

impl Holding {
    fn buy(&mut self, ticker: &str, shares: u64, price: f64) -> Result<(), PortfolioError> {
        self.quantity = self.quantity.checked_add(shares)
            .ok_or_else(|| PortfolioError::QuantityOverflow(ticker.to_owned()))?;
        self.value += shares as f64 * price;
        Ok(())
    }
}

struct Candidate<'a> {
    ticker: &'a str,
    price: f64,
    deficit: f64,
}

/// Spends the portfolio's cash one whole share at a time, always on the
/// position furthest below its target value. Existing shares are never sold.
pub fn calculate(portfolio: &Portfolio) -> Result<Portfolio, PortfolioError> {
    run(portfolio, None)
}

/// Same as [`calculate`], but gives up with `PassLimit` after `max_passes`
/// passes over the candidates.
pub fn calculate_with_limit(portfolio: &Portfolio, max_passes: u64) -> Result<Portfolio, PortfolioError> {
    run(portfolio, Some(max_passes))
}

fn run(portfolio: &Portfolio, max_passes: Option<u64>) -> Result<Portfolio, PortfolioError> {
    portfolio.validate()?;

    let total_available = portfolio.total_available();
    let mut holdings: HashMap<&str, Holding> = c!{
        p.ticker.as_str() => Holding {
            quantity: p.quantity,
            value: p.value(),
            target: total_available * (p.target_percentage / 100.0),
        },
        for p in portfolio.positions.iter()
    };

    let prices: MinMax<f64> = portfolio.positions.iter().map(|p| p.price).collect();
    let mut balance = portfolio.balance;
    let mut purchases = 0u64;
    let mut passes = 0u64;

    if prices.min().map_or(true, |cheapest| *cheapest > balance) {
        debug!("{} does not buy a single share", balance);
        return Ok(portfolio.clone());
    }

    loop {
        let mut options: Vec<Candidate> = portfolio.positions.iter()
            .filter_map(|p| holdings.get(p.ticker.as_str()).map(|h| Candidate {
                ticker: p.ticker.as_str(),
                price: p.price,
                deficit: h.target - h.value,
            }))
            .filter(|o| o.deficit > 0.0 && balance >= o.price)
            .collect();
        if options.is_empty() {
            break;
        }
        if max_passes.map_or(false, |max| passes == max) {
            return Err(PortfolioError::PassLimit(passes));
        }
        passes += 1;

        // Nothing else can become a candidate while a lone one buys: other
        // deficits don't move and the balance only shrinks. Its run of
        // single-share passes collapses into one step.
        if options.len() == 1 {
            let option = &options[0];
            let shares = lone_candidate_shares(balance, option.price, option.deficit);
            match holdings.get_mut(option.ticker) {
                Some(holding) => holding.buy(option.ticker, shares, option.price)?,
                None => break,
            }
            balance -= shares as f64 * option.price;
            purchases = purchases.saturating_add(shares);
            trace!("Bought {} {}@{}, balance={}", shares, option.ticker, option.price, balance);
            continue;
        }

        // stable: equal deficits keep portfolio order
        options.sort_by(|a, b| b.deficit.total_cmp(&a.deficit));

        let mut purchased = false;
        for option in options {
            if balance < option.price {
                continue;
            }
            if let Some(holding) = holdings.get_mut(option.ticker) {
                holding.buy(option.ticker, 1, option.price)?;
                balance -= option.price;
                purchases += 1;
                purchased = true;
                trace!("Bought {}@{}, balance={}", option.ticker, option.price, balance);
            }
        }

        if !purchased {
            break;
        }
    }

    debug!("Bought {} shares in {} passes, {} of {} left over", purchases, passes, balance, portfolio.balance);

    let positions = portfolio.positions.iter()
        .map(|p| Position {
            quantity: holdings.get(p.ticker.as_str()).map_or(p.quantity, |h| h.quantity),
            ..p.clone()
        })
        .collect();
    Ok(Portfolio::new(balance, positions))
}

/// Shares a lone affordable candidate buys before its deficit closes or the
/// cash runs out. Always at least one.
fn lone_candidate_shares(balance: f64, price: f64, deficit: f64) -> u64 {
    let by_cash = (balance / price).floor();
    let by_need = (deficit / price).ceil();
    let mut shares = by_cash.min(by_need).max(1.0) as u64;
    // division can round up past what the cash actually covers
    while shares > 1 && shares as f64 * price > balance {
        shares -= 1;
    }
    shares
}
