//! Portfolio and replay configuration.
//!
//! Validates every key before a run starts, then builds typed settings.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::domain::bar::PriceField;
use crate::domain::error::LedgerError;
use crate::domain::sizing::SizingPolicy;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_BACKTEST_KEY: &str = "backtest";

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    pub policy: SizingPolicy,
    pub strategies: Vec<String>,
    pub replay: ReplayConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayConfig {
    pub events: Option<PathBuf>,
    pub bars_dir: Option<PathBuf>,
    pub auto_fill: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub csv: Option<PathBuf>,
    pub sqlite: Option<PathBuf>,
    pub backtest_key: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            csv: None,
            sqlite: None,
            backtest_key: DEFAULT_BACKTEST_KEY.to_string(),
        }
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> LedgerError {
    LedgerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), LedgerError> {
    parse_policy(config)?;
    parse_strategy_list(config)?;
    validate_backtest_key(config)?;
    Ok(())
}

pub fn build_portfolio_config(config: &dyn ConfigPort) -> Result<PortfolioConfig, LedgerError> {
    let policy = parse_policy(config)?;
    let strategies = parse_strategy_list(config)?;
    let backtest_key = validate_backtest_key(config)?;

    let path = |section: &str, key: &str| {
        config
            .get_string(section, key)
            .filter(|s| !s.trim().is_empty())
            .map(|s| PathBuf::from(s.trim()))
    };

    Ok(PortfolioConfig {
        policy,
        strategies,
        replay: ReplayConfig {
            events: path("replay", "events"),
            bars_dir: path("replay", "bars_dir"),
            auto_fill: config.get_bool("replay", "auto_fill", false),
        },
        export: ExportConfig {
            csv: path("export", "csv"),
            sqlite: path("export", "sqlite"),
            backtest_key,
        },
    })
}

fn parse_policy(config: &dyn ConfigPort) -> Result<SizingPolicy, LedgerError> {
    let name = config
        .get_string("portfolio", "policy")
        .unwrap_or_else(|| "tick".to_string());
    match name.trim().to_ascii_lowercase().as_str() {
        "tick" => Ok(SizingPolicy::TickUnit),
        "bar" => {
            let quantity = match config.get_string("portfolio", "quantity") {
                None => 1,
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(q) if q > 0 => q,
                    _ => {
                        return Err(invalid(
                            "portfolio",
                            "quantity",
                            "quantity must be a positive integer",
                        ));
                    }
                },
            };
            let price_field = match config.get_string("portfolio", "price_field") {
                None => PriceField::default(),
                Some(raw) => raw
                    .parse::<PriceField>()
                    .map_err(|e| invalid("portfolio", "price_field", e.to_string()))?,
            };
            Ok(SizingPolicy::BarLimit {
                quantity,
                price_field,
            })
        }
        other => Err(invalid(
            "portfolio",
            "policy",
            format!("unknown policy '{other}', expected tick or bar"),
        )),
    }
}

/// Parse a comma-separated strategy list. Names keep their case; empty
/// entries and duplicates are rejected.
pub fn parse_strategies(input: &str) -> Result<Vec<String>, String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let name = token.trim();
        if name.is_empty() {
            return Err("empty strategy name".to_string());
        }
        if !seen.insert(name.to_string()) {
            return Err(format!("duplicate strategy: {name}"));
        }
        names.push(name.to_string());
    }

    Ok(names)
}

fn parse_strategy_list(config: &dyn ConfigPort) -> Result<Vec<String>, LedgerError> {
    let raw = config
        .get_string("portfolio", "strategies")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| LedgerError::ConfigMissing {
            section: "portfolio".to_string(),
            key: "strategies".to_string(),
        })?;
    parse_strategies(&raw).map_err(|reason| invalid("portfolio", "strategies", reason))
}

fn validate_backtest_key(config: &dyn ConfigPort) -> Result<String, LedgerError> {
    let key = config
        .get_string("export", "backtest_key")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| DEFAULT_BACKTEST_KEY.to_string());
    let well_formed = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !well_formed {
        return Err(invalid(
            "export",
            "backtest_key",
            "backtest_key must be letters, digits or underscores and not start with a digit",
        ));
    }
    Ok(key)
}
