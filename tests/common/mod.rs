#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Write;
use tradeledger::domain::bar::Bar;
use tradeledger::domain::event::{
    Action, Direction, FillEvent, OrderEvent, OrderKind, SignalEvent, SignalKind,
};
use tradeledger::ports::engine_port::EnginePort;

/// Engine stand-in that records every dispatched order.
pub struct MockEngine {
    pub tradingday: NaiveDate,
    pub datetime: NaiveDateTime,
    pub bars: HashMap<String, Bar>,
    pub dispatched: Vec<OrderEvent>,
}

impl MockEngine {
    pub fn new() -> Self {
        let tradingday = date(2017, 9, 1);
        Self {
            tradingday,
            datetime: tradingday.and_hms_opt(21, 0, 0).unwrap(),
            bars: HashMap::new(),
            dispatched: Vec::new(),
        }
    }

    pub fn with_bar(mut self, instrument: &str, close: f64) -> Self {
        self.bars
            .insert(instrument.to_string(), make_bar(instrument, "2017-09-01", close));
        self
    }
}

impl EnginePort for MockEngine {
    fn trading_day(&self) -> NaiveDate {
        self.tradingday
    }

    fn current_datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    fn instrument_data(&self, instrument: &str) -> Option<Bar> {
        self.bars.get(instrument).cloned()
    }

    fn add_event(&mut self, order: OrderEvent) {
        self.dispatched.push(order);
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(instrument: &str, tradingday: &str, close: f64) -> Bar {
    Bar {
        instrument: instrument.to_string(),
        tradingday: NaiveDate::parse_from_str(tradingday, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 2.0,
        low: close - 2.0,
        close,
        volume: 1000,
        open_interest: Some(5000),
    }
}

pub fn make_signal(strategy: &str, instrument: &str, kind: SignalKind) -> SignalEvent {
    let day = date(2017, 9, 1);
    SignalEvent {
        strategy_name: strategy.to_string(),
        instrument: instrument.to_string(),
        signal_kind: kind,
        tradingday: day,
        datetime: day.and_hms_opt(21, 0, 0).unwrap(),
    }
}

pub fn make_order(
    index: u64,
    instrument: &str,
    action: Action,
    direction: Direction,
    quantity: u64,
) -> OrderEvent {
    let day = date(2017, 9, 1);
    OrderEvent {
        index,
        instrument: instrument.to_string(),
        action,
        direction,
        quantity,
        order_kind: OrderKind::Market,
        price: None,
        tradingday: day,
        datetime: day.and_hms_opt(21, 0, 0).unwrap(),
    }
}

/// Full fill of `order` one minute after it was sent.
pub fn fill_for(order: &OrderEvent) -> FillEvent {
    let at = order.datetime + chrono::Duration::minutes(1);
    FillEvent::from_order(order, order.tradingday, at, Some(3600.0))
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
