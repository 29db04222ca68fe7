//! Sizing policies: turn a signal plus book state into a concrete order.
//!
//! Both policies share one open/close rule. A LONG signal closes short
//! holdings that are not already reserved by in-flight CLOSE/BUY orders,
//! otherwise it opens long. SHORT mirrors it against long holdings and
//! CLOSE/SELL orders. Counting in-flight closes keeps the total of closing
//! orders within what the position can absorb.

use super::bar::PriceField;
use super::book::StrategyBook;
use super::error::LedgerError;
use super::event::{Action, OrderEvent, OrderIndex, OrderKind, SignalEvent, SignalKind};
use crate::ports::engine_port::EnginePort;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SizingPolicy {
    /// One-lot market orders, for tick-driven runs.
    #[default]
    TickUnit,
    /// Fixed-size limit orders priced from the latest bar.
    BarLimit {
        quantity: u64,
        price_field: PriceField,
    },
}

impl SizingPolicy {
    /// Bar policy with one-lot orders priced at the close.
    pub fn bar_limit() -> Self {
        SizingPolicy::BarLimit {
            quantity: 1,
            price_field: PriceField::Close,
        }
    }

    pub fn order_kind(&self) -> OrderKind {
        match self {
            SizingPolicy::TickUnit => OrderKind::Market,
            SizingPolicy::BarLimit { .. } => OrderKind::Limit,
        }
    }

    pub fn quantity(&self) -> u64 {
        match self {
            SizingPolicy::TickUnit => 1,
            SizingPolicy::BarLimit { quantity, .. } => *quantity,
        }
    }

    /// Build the order answering `signal`, stamped with `index` and the
    /// engine's current clock.
    pub fn build_order(
        &self,
        signal: &SignalEvent,
        book: &StrategyBook,
        index: OrderIndex,
        engine: &dyn EnginePort,
    ) -> Result<OrderEvent, LedgerError> {
        let action = decide_action(book, &signal.instrument, signal.signal_kind);

        let price = match self {
            SizingPolicy::TickUnit => None,
            SizingPolicy::BarLimit { price_field, .. } => {
                let bar = engine.instrument_data(&signal.instrument).ok_or_else(|| {
                    LedgerError::MissingMarketData {
                        instrument: signal.instrument.clone(),
                    }
                })?;
                Some(bar.price(*price_field))
            }
        };

        Ok(OrderEvent {
            index,
            instrument: signal.instrument.clone(),
            action,
            direction: signal.signal_kind.direction(),
            quantity: self.quantity(),
            order_kind: self.order_kind(),
            price,
            tradingday: engine.trading_day(),
            datetime: engine.current_datetime(),
        })
    }
}

/// Whether a signal of `kind` on `instrument` should close or open.
pub fn decide_action(book: &StrategyBook, instrument: &str, kind: SignalKind) -> Action {
    let (held, reserved) = match kind {
        SignalKind::Long => (
            book.short_position(instrument),
            book.close_buy_unfilled(instrument),
        ),
        SignalKind::Short => (
            book.long_position(instrument),
            book.close_sell_unfilled(instrument),
        ),
    };
    if held > reserved {
        Action::Close
    } else {
        Action::Open
    }
}
