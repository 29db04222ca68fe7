//! tradeledger: portfolio and order-lifecycle bookkeeping for a backtester.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. Strategies emit signals, the
//! [`domain::manager::PortfolioManager`] turns them into indexed orders and
//! reconciles the engine's fills against each strategy's book.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
