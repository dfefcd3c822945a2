#[macro_use]
extern crate cute;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate spectral;

pub mod config;
pub mod error;
pub mod portfolio;
pub mod server;
pub mod store;

pub use error::{Error, PortfolioError, Result};
pub use portfolio::balancer::calculate;
pub use portfolio::{Portfolio, Position};
