//! Per-strategy book: positions, outstanding orders, and event history.

use std::collections::BTreeMap;

use super::error::LedgerError;
use super::event::{
    Action, Direction, FillEvent, OrderEvent, OrderIndex, Record, RecordEvent, SignalEvent,
};
use super::position::{Position, Side};

/// State owned by one strategy.
///
/// Positions change only through [`StrategyBook::deal_fill_event`] or the
/// explicit [`inc_position`](StrategyBook::inc_position) /
/// [`dec_position`](StrategyBook::dec_position) calls. Every failing
/// operation leaves the book exactly as it was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyBook {
    signals: Vec<SignalEvent>,
    orders: Vec<OrderEvent>,
    fills: Vec<FillEvent>,
    positions: BTreeMap<String, Position>,
    unfilled: BTreeMap<OrderIndex, OrderEvent>,
}

impl StrategyBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_position(
        &mut self,
        instrument: &str,
        side: Side,
        quantity: u64,
    ) -> Result<(), LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::invalid(format!(
                "cannot increase {side} position in {instrument} by zero"
            )));
        }
        self.ensure_room(instrument, side, quantity)?;
        self.positions
            .entry(instrument.to_string())
            .or_default()
            .try_add(side, quantity);
        Ok(())
    }

    pub fn dec_position(
        &mut self,
        instrument: &str,
        side: Side,
        quantity: u64,
    ) -> Result<(), LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::invalid(format!(
                "cannot decrease {side} position in {instrument} by zero"
            )));
        }
        self.ensure_held(instrument, side, quantity)?;
        if let Some(pos) = self.positions.get_mut(instrument) {
            pos.try_sub(side, quantity);
        }
        Ok(())
    }

    fn ensure_held(&self, instrument: &str, side: Side, quantity: u64) -> Result<(), LedgerError> {
        let held = self.position(instrument, side);
        if held < quantity {
            return Err(LedgerError::InsufficientPosition {
                instrument: instrument.to_string(),
                side,
                held,
                requested: quantity,
            });
        }
        Ok(())
    }

    fn ensure_room(&self, instrument: &str, side: Side, quantity: u64) -> Result<(), LedgerError> {
        let held = self.position(instrument, side);
        if held.checked_add(quantity).is_none() {
            return Err(LedgerError::invalid(format!(
                "{side} position in {instrument} overflows: {held} + {quantity}"
            )));
        }
        Ok(())
    }

    pub fn position(&self, instrument: &str, side: Side) -> u64 {
        self.positions
            .get(instrument)
            .map_or(0, |pos| pos.get(side))
    }

    pub fn long_position(&self, instrument: &str) -> u64 {
        self.position(instrument, Side::Long)
    }

    pub fn short_position(&self, instrument: &str) -> u64 {
        self.position(instrument, Side::Short)
    }

    /// Total quantity of outstanding orders on `instrument` with the given
    /// action and direction. Saturates at `u64::MAX`.
    pub fn unfilled_order(&self, instrument: &str, action: Action, direction: Direction) -> u64 {
        self.unfilled
            .values()
            .filter(|o| o.instrument == instrument && o.action == action && o.direction == direction)
            .fold(0u64, |total, o| total.saturating_add(o.quantity))
    }

    pub fn open_buy_unfilled(&self, instrument: &str) -> u64 {
        self.unfilled_order(instrument, Action::Open, Direction::Buy)
    }

    pub fn open_sell_unfilled(&self, instrument: &str) -> u64 {
        self.unfilled_order(instrument, Action::Open, Direction::Sell)
    }

    pub fn close_buy_unfilled(&self, instrument: &str) -> u64 {
        self.unfilled_order(instrument, Action::Close, Direction::Buy)
    }

    pub fn close_sell_unfilled(&self, instrument: &str) -> u64 {
        self.unfilled_order(instrument, Action::Close, Direction::Sell)
    }

    pub fn deal_signal_event(&mut self, signal: SignalEvent) {
        self.signals.push(signal);
    }

    pub fn deal_order_event(&mut self, order: OrderEvent) -> Result<(), LedgerError> {
        if self.unfilled.contains_key(&order.index) {
            return Err(LedgerError::DuplicateOrderIndex { index: order.index });
        }
        self.orders.push(order.clone());
        self.unfilled.insert(order.index, order);
        Ok(())
    }

    /// Reconcile a fill against its outstanding order.
    ///
    /// | action | direction | effect       |
    /// |--------|-----------|--------------|
    /// | OPEN   | BUY       | long += qty  |
    /// | OPEN   | SELL      | short += qty |
    /// | CLOSE  | BUY       | short -= qty |
    /// | CLOSE  | SELL      | long -= qty  |
    pub fn deal_fill_event(&mut self, fill: FillEvent) -> Result<(), LedgerError> {
        if fill.quantity == 0 {
            return Err(LedgerError::invalid(format!(
                "fill for order {} has zero quantity",
                fill.index
            )));
        }
        let order = self
            .unfilled
            .get(&fill.index)
            .ok_or(LedgerError::UnknownOrder { index: fill.index })?;
        if order.instrument != fill.instrument
            || order.action != fill.action
            || order.direction != fill.direction
        {
            return Err(LedgerError::invalid(format!(
                "fill for order {} ({} {} {}) does not match order ({} {} {})",
                fill.index,
                fill.instrument,
                fill.action,
                fill.direction,
                order.instrument,
                order.action,
                order.direction
            )));
        }

        let (side, opening) = match (fill.action, fill.direction) {
            (Action::Open, Direction::Buy) => (Side::Long, true),
            (Action::Open, Direction::Sell) => (Side::Short, true),
            (Action::Close, Direction::Buy) => (Side::Short, false),
            (Action::Close, Direction::Sell) => (Side::Long, false),
        };
        if opening {
            self.ensure_room(&fill.instrument, side, fill.quantity)?;
        } else {
            self.ensure_held(&fill.instrument, side, fill.quantity)?;
        }

        self.unfilled.remove(&fill.index);
        if opening {
            self.inc_position(&fill.instrument, side, fill.quantity)?;
        } else {
            self.dec_position(&fill.instrument, side, fill.quantity)?;
        }
        self.fills.push(fill);
        Ok(())
    }

    pub fn signals(&self) -> &[SignalEvent] {
        &self.signals
    }

    pub fn orders(&self) -> &[OrderEvent] {
        &self.orders
    }

    pub fn fills(&self) -> &[FillEvent] {
        &self.fills
    }

    pub fn outstanding(&self) -> impl Iterator<Item = &OrderEvent> {
        self.unfilled.values()
    }

    /// Outstanding order indices in ascending order.
    pub fn outstanding_indices(&self) -> Vec<OrderIndex> {
        self.unfilled.keys().copied().collect()
    }

    pub fn is_outstanding(&self, index: OrderIndex) -> bool {
        self.unfilled.contains_key(&index)
    }

    /// Every instrument that has ever held a position, in instrument order.
    pub fn positions(&self) -> impl Iterator<Item = (&str, &Position)> {
        self.positions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// History tagged with `strategy_name`: all signals, then all orders, then
    /// all fills, each list in append order.
    pub fn records(&self, strategy_name: &str) -> Vec<Record> {
        let tag = |event| Record {
            strategy_name: strategy_name.to_string(),
            event,
        };
        self.signals
            .iter()
            .cloned()
            .map(RecordEvent::Signal)
            .chain(self.orders.iter().cloned().map(RecordEvent::Order))
            .chain(self.fills.iter().cloned().map(RecordEvent::Fill))
            .map(tag)
            .collect()
    }
}
