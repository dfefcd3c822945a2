pub mod balancer;
pub mod report;

use std::collections::HashSet;

use crate::error::PortfolioError;

/// One holding, or one line of the target allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub ticker: String,
    pub quantity: u64,
    pub price: f64,
    #[serde(alias = "target")]
    pub target_percentage: f64,
}

impl Position {
    pub fn new(ticker: &str, quantity: u64, price: f64, target_percentage: f64) -> Position {
        Position {
            ticker: ticker.to_owned(), quantity, price, target_percentage
        }
    }

    pub fn value(&self) -> f64 {
        self.quantity as f64 * self.price
    }

    pub fn validate(&self) -> Result<(), PortfolioError> {
        if self.ticker.is_empty() {
            return Err(PortfolioError::EmptyTicker);
        }
        // a non-positive price would let the balancer buy forever
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(PortfolioError::InvalidPrice {
                ticker: self.ticker.clone(), price: self.price
            });
        }
        if !(0.0..=100.0).contains(&self.target_percentage) {
            return Err(PortfolioError::InvalidTarget {
                ticker: self.ticker.clone(), target: self.target_percentage
            });
        }
        Ok(())
    }
}

/// Cash plus an ordered set of positions, unique by ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub balance: f64,
    pub positions: Vec<Position>,
}

impl Portfolio {
    pub fn new(balance: f64, positions: Vec<Position>) -> Self {
        Portfolio { balance, positions }
    }

    pub fn validate(&self) -> Result<(), PortfolioError> {
        check_balance(self.balance)?;
        let mut seen = HashSet::new();
        for p in self.positions.iter() {
            p.validate()?;
            if !seen.insert(p.ticker.as_str()) {
                return Err(PortfolioError::DuplicateTicker(p.ticker.clone()));
            }
        }
        Ok(())
    }

    /// Caller-side gate: the targets should describe a full allocation before
    /// anything is calculated. The balancer itself never checks this.
    pub fn check_targets(&self, tolerance: f64) -> Result<(), PortfolioError> {
        let sum = self.target_sum();
        if (sum - 100.0).abs() > tolerance {
            return Err(PortfolioError::TargetsDoNotSum(sum));
        }
        Ok(())
    }

    pub fn should_calculate(&self, tolerance: f64) -> bool {
        self.check_targets(tolerance).is_ok()
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.ticker == ticker)
    }

    pub fn total_value(&self) -> f64 {
        self.positions.iter().map(Position::value).sum::<f64>()
    }

    pub fn total_available(&self) -> f64 {
        self.total_value() + self.balance
    }

    pub fn target_sum(&self) -> f64 {
        self.positions.iter().map(|p| p.target_percentage).sum::<f64>()
    }

    pub fn set_balance(&mut self, balance: f64) -> Result<(), PortfolioError> {
        check_balance(balance)?;
        self.balance = balance;
        Ok(())
    }

    pub fn add_position(&mut self, position: Position) -> Result<(), PortfolioError> {
        position.validate()?;
        if self.position(&position.ticker).is_some() {
            return Err(PortfolioError::DuplicateTicker(position.ticker));
        }
        self.positions.push(position);
        Ok(())
    }

    /// Replaces the position held under `ticker`, keeping its place in the
    /// ordering. The replacement may carry a new ticker as long as it is free.
    pub fn update_position(&mut self, ticker: &str, position: Position) -> Result<(), PortfolioError> {
        position.validate()?;
        if position.ticker != ticker && self.position(&position.ticker).is_some() {
            return Err(PortfolioError::DuplicateTicker(position.ticker));
        }
        match self.positions.iter_mut().find(|p| p.ticker == ticker) {
            Some(existing) => {
                *existing = position;
                Ok(())
            }
            None => Err(PortfolioError::UnknownTicker(ticker.to_owned())),
        }
    }

    pub fn remove_position(&mut self, ticker: &str) -> Result<Position, PortfolioError> {
        match self.positions.iter().position(|p| p.ticker == ticker) {
            Some(idx) => Ok(self.positions.remove(idx)),
            None => Err(PortfolioError::UnknownTicker(ticker.to_owned())),
        }
    }
}

fn check_balance(balance: f64) -> Result<(), PortfolioError> {
    if !balance.is_finite() || balance < 0.0 {
        return Err(PortfolioError::InvalidBalance(balance));
    }
    Ok(())
}
