//! In-process engine for replaying a recorded event log.
//!
//! Stands in for the surrounding backtest engine: it keeps the clock, serves
//! the latest bar per instrument, and queues dispatched orders. It does no
//! matching of its own; fills either come from the event log or, with
//! auto-fill on, are produced one-for-one from each dispatched order.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::domain::bar::Bar;
use crate::domain::error::LedgerError;
use crate::domain::event::{FillEvent, OrderEvent, SignalEvent};
use crate::domain::manager::PortfolioManager;
use crate::ports::engine_port::EnginePort;

/// One entry of a replayed event log.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    Signal(SignalEvent),
    Fill(FillEvent),
}

impl ReplayEvent {
    fn clock(&self) -> (NaiveDate, NaiveDateTime) {
        match self {
            ReplayEvent::Signal(s) => (s.tradingday, s.datetime),
            ReplayEvent::Fill(f) => (f.tradingday, f.datetime),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplayEngine {
    bars: HashMap<String, Vec<Bar>>,
    tradingday: NaiveDate,
    datetime: NaiveDateTime,
    queue: Vec<OrderEvent>,
}

impl ReplayEngine {
    pub fn new(datetime: NaiveDateTime) -> Self {
        ReplayEngine {
            bars: HashMap::new(),
            tradingday: datetime.date(),
            datetime,
            queue: Vec::new(),
        }
    }

    /// Attach a bar series for `instrument`. Bars are kept sorted by
    /// trading day.
    pub fn with_bars(mut self, instrument: &str, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.tradingday);
        self.bars.insert(instrument.to_string(), bars);
        self
    }

    pub fn set_clock(&mut self, tradingday: NaiveDate, datetime: NaiveDateTime) {
        self.tradingday = tradingday;
        self.datetime = datetime;
    }

    pub fn drain_orders(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.queue)
    }
}

impl EnginePort for ReplayEngine {
    fn trading_day(&self) -> NaiveDate {
        self.tradingday
    }

    fn current_datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    fn instrument_data(&self, instrument: &str) -> Option<Bar> {
        let bars = self.bars.get(instrument)?;
        let upto = bars.partition_point(|b| b.tradingday <= self.tradingday);
        upto.checked_sub(1).map(|i| bars[i].clone())
    }

    fn add_event(&mut self, order: OrderEvent) {
        self.queue.push(order);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub signals: usize,
    pub orders: usize,
    pub fills: usize,
    pub unresolved: usize,
}

/// Drive `events` through `manager` in log order. Stops at the first error;
/// every error here is a broken invariant of the log or the configuration.
///
/// The engine queue is drained after every signal. Orders left without a
/// fill stay outstanding in their books.
pub fn run_replay(
    manager: &mut PortfolioManager,
    engine: &mut ReplayEngine,
    events: Vec<ReplayEvent>,
    auto_fill: bool,
) -> Result<ReplayOutcome, LedgerError> {
    let mut outcome = ReplayOutcome::default();

    for event in events {
        let (tradingday, datetime) = event.clock();
        engine.set_clock(tradingday, datetime);

        match event {
            ReplayEvent::Signal(signal) => {
                manager.submit_signal(signal, engine)?;
                outcome.signals += 1;
                outcome.orders += 1;
                // the books keep every order, so the queue only feeds auto-fill
                let dispatched = engine.drain_orders();
                if auto_fill {
                    for order in dispatched {
                        let price = match order.price {
                            Some(p) => Some(p),
                            None => engine.instrument_data(&order.instrument).map(|b| b.close),
                        };
                        let fill = FillEvent::from_order(&order, tradingday, datetime, price);
                        debug!(index = fill.index, "auto-filled order");
                        manager.submit_fill(fill)?;
                        outcome.fills += 1;
                    }
                }
            }
            ReplayEvent::Fill(fill) => {
                manager.submit_fill(fill)?;
                outcome.fills += 1;
            }
        }
    }

    outcome.unresolved = manager.finish_run();
    info!(
        signals = outcome.signals,
        orders = outcome.orders,
        fills = outcome.fills,
        unresolved = outcome.unresolved,
        "replay finished"
    );
    Ok(outcome)
}
