//! Signal, order, and fill events exchanged with the surrounding engine.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::LedgerError;

/// Order identity, unique for the lifetime of a portfolio manager.
pub type OrderIndex = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Market,
    Limit,
}

impl SignalKind {
    /// The order direction a signal of this kind trades in.
    pub fn direction(self) -> Direction {
        match self {
            SignalKind::Long => Direction::Buy,
            SignalKind::Short => Direction::Sell,
        }
    }
}

macro_rules! keyword_enum {
    ($ty:ident, $what:literal, $($variant:ident => $text:literal),+ $(,)?) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($ty::$variant => f.write_str($text),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.trim().eq_ignore_ascii_case($text) {
                        return Ok($ty::$variant);
                    }
                )+
                Err(LedgerError::invalid(format!("unknown {} '{}'", $what, s)))
            }
        }
    };
}

keyword_enum!(SignalKind, "signal", Long => "LONG", Short => "SHORT");
keyword_enum!(Action, "action", Open => "OPEN", Close => "CLOSE");
keyword_enum!(Direction, "direction", Buy => "BUY", Sell => "SELL");
keyword_enum!(OrderKind, "order kind", Market => "MARKET", Limit => "LIMIT");

/// A strategy's intent to be long or short an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub strategy_name: String,
    pub instrument: String,
    pub signal_kind: SignalKind,
    pub tradingday: NaiveDate,
    pub datetime: NaiveDateTime,
}

/// A concrete order sent to the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub index: OrderIndex,
    pub instrument: String,
    pub action: Action,
    pub direction: Direction,
    pub quantity: u64,
    pub order_kind: OrderKind,
    pub price: Option<f64>,
    pub tradingday: NaiveDate,
    pub datetime: NaiveDateTime,
}

impl OrderEvent {
    /// Check the shape rules every dispatched order must satisfy:
    /// positive quantity, and a price exactly when the order is a limit order.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.quantity == 0 {
            return Err(LedgerError::invalid(format!(
                "order {} has zero quantity",
                self.index
            )));
        }
        match (self.order_kind, self.price) {
            (OrderKind::Limit, None) => Err(LedgerError::invalid(format!(
                "limit order {} has no price",
                self.index
            ))),
            (OrderKind::Market, Some(_)) => Err(LedgerError::invalid(format!(
                "market order {} carries a price",
                self.index
            ))),
            (OrderKind::Limit, Some(p)) if !p.is_finite() => Err(LedgerError::invalid(format!(
                "limit order {} has non-finite price {}",
                self.index, p
            ))),
            _ => Ok(()),
        }
    }
}

/// An execution report for a previously dispatched order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub index: OrderIndex,
    pub instrument: String,
    pub action: Action,
    pub direction: Direction,
    pub quantity: u64,
    pub price: Option<f64>,
    pub tradingday: NaiveDate,
    pub datetime: NaiveDateTime,
}

impl FillEvent {
    /// A complete fill of `order` reported at the given time.
    pub fn from_order(
        order: &OrderEvent,
        tradingday: NaiveDate,
        datetime: NaiveDateTime,
        price: Option<f64>,
    ) -> Self {
        FillEvent {
            index: order.index,
            instrument: order.instrument.clone(),
            action: order.action,
            direction: order.direction,
            quantity: order.quantity,
            price: price.or(order.price),
            tradingday,
            datetime,
        }
    }
}

/// One history entry of a book, as handed to an export sink.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl RecordEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            RecordEvent::Signal(_) => "signal",
            RecordEvent::Order(_) => "order",
            RecordEvent::Fill(_) => "fill",
        }
    }

    pub fn tradingday(&self) -> NaiveDate {
        match self {
            RecordEvent::Signal(e) => e.tradingday,
            RecordEvent::Order(e) => e.tradingday,
            RecordEvent::Fill(e) => e.tradingday,
        }
    }

    pub fn datetime(&self) -> NaiveDateTime {
        match self {
            RecordEvent::Signal(e) => e.datetime,
            RecordEvent::Order(e) => e.datetime,
            RecordEvent::Fill(e) => e.datetime,
        }
    }

    pub fn instrument(&self) -> &str {
        match self {
            RecordEvent::Signal(e) => &e.instrument,
            RecordEvent::Order(e) => &e.instrument,
            RecordEvent::Fill(e) => &e.instrument,
        }
    }
}

/// A history entry tagged with the strategy that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub strategy_name: String,
    pub event: RecordEvent,
}
