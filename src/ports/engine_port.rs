//! Engine collaborator port.
//!
//! The surrounding backtest engine owns the clock, the market data, and the
//! simulated execution venue. The portfolio manager only sees it through this
//! trait, passed in per call.

use crate::domain::bar::Bar;
use crate::domain::event::OrderEvent;
use chrono::{NaiveDate, NaiveDateTime};

pub trait EnginePort {
    fn trading_day(&self) -> NaiveDate;

    fn current_datetime(&self) -> NaiveDateTime;

    /// Latest bar available for `instrument` at the current clock.
    fn instrument_data(&self, instrument: &str) -> Option<Bar>;

    /// Enqueue an order for execution. The outcome arrives later as a fill.
    fn add_event(&mut self, order: OrderEvent);
}
