use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::portfolio::balancer::DEFAULT_MAX_PASSES;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub store_path: String,
    /// How far, in percentage points, the targets may stray from 100.
    pub target_tolerance: f64,
    pub max_passes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            store_path: "./data/portfolio.json".to_string(),
            target_tolerance: 0.01,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Config::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let defaults = Config::default();
        let target_tolerance = parse(&lookup, "BALANCER_TARGET_TOLERANCE", defaults.target_tolerance)?;
        if !target_tolerance.is_finite() || target_tolerance < 0.0 {
            return Err(ConfigError::InvalidValue {
                var: "BALANCER_TARGET_TOLERANCE", value: target_tolerance.to_string()
            });
        }
        Ok(Config {
            listen_addr: parse(&lookup, "BALANCER_LISTEN_ADDR", defaults.listen_addr)?,
            store_path: lookup("BALANCER_STORE_PATH").unwrap_or(defaults.store_path),
            target_tolerance,
            max_passes: parse(&lookup, "BALANCER_MAX_PASSES", defaults.max_passes)?,
        })
    }
}

fn parse<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use spectral::prelude::*;
    use super::*;

    fn config_from(vars: &[(&'static str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<&str, String> = vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_that(&config_from(&[])).is_ok().is_equal_to(Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("BALANCER_LISTEN_ADDR", "0.0.0.0:9000"),
            ("BALANCER_STORE_PATH", "/tmp/p.json"),
            ("BALANCER_TARGET_TOLERANCE", "0.5"),
            ("BALANCER_MAX_PASSES", " 1000 "),
        ]).unwrap();

        assert_that(&config.listen_addr.port()).is_equal_to(9000);
        assert_that(&config.store_path.as_str()).is_equal_to("/tmp/p.json");
        assert_that(&config.target_tolerance).is_close_to(0.5, 0.0001);
        assert_that(&config.max_passes).is_equal_to(1000);
    }

    #[test]
    fn test_bad_values() {
        assert_that(&config_from(&[("BALANCER_MAX_PASSES", "lots")]))
            .is_err()
            .is_equal_to(ConfigError::InvalidValue {
                var: "BALANCER_MAX_PASSES", value: "lots".to_string()
            });
        assert!(config_from(&[("BALANCER_LISTEN_ADDR", "localhost")]).is_err());
        assert!(config_from(&[("BALANCER_TARGET_TOLERANCE", "-1")]).is_err());
    }
}
