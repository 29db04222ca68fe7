//! Portfolio manager: index allocation, signal dispatch, and fill routing
//! across all strategy books.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use super::book::StrategyBook;
use super::error::LedgerError;
use super::event::{FillEvent, OrderEvent, OrderIndex, Record, SignalEvent};
use super::position::Side;
use super::sizing::SizingPolicy;
use crate::ports::engine_port::EnginePort;

/// Owns every strategy book plus the state shared between them: the order
/// index counter and the index → strategy routing table.
///
/// Routing entries are never removed, so a fill can always be traced back to
/// the strategy that sent the order even after the book has dropped it.
#[derive(Debug, Clone, Default)]
pub struct PortfolioManager {
    policy: SizingPolicy,
    next_index: OrderIndex,
    books: BTreeMap<String, StrategyBook>,
    order_strategy: HashMap<OrderIndex, String>,
}

impl PortfolioManager {
    pub fn new(policy: SizingPolicy) -> Self {
        PortfolioManager {
            policy,
            ..Self::default()
        }
    }

    pub fn register_strategy(&mut self, name: &str) -> Result<(), LedgerError> {
        if self.books.contains_key(name) {
            return Err(LedgerError::DuplicateStrategy {
                name: name.to_string(),
            });
        }
        self.books.insert(name.to_string(), StrategyBook::new());
        Ok(())
    }

    /// Hand out the next unused order index.
    pub fn allocate_order_index(&mut self) -> OrderIndex {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Turn `signal` into an order, register it with the owning book, and
    /// pass it to the engine. Returns a copy of the dispatched order.
    pub fn submit_signal(
        &mut self,
        signal: SignalEvent,
        engine: &mut dyn EnginePort,
    ) -> Result<OrderEvent, LedgerError> {
        // The index is only consumed once the order is known to be valid.
        let order = {
            let book = self.book_or_err(&signal.strategy_name)?;
            self.policy.build_order(&signal, book, self.next_index, &*engine)?
        };
        order.validate()?;
        let index = self.allocate_order_index();
        debug_assert_eq!(index, order.index);

        let strategy = signal.strategy_name.clone();
        let book = self
            .books
            .get_mut(&strategy)
            .ok_or_else(|| LedgerError::UnknownStrategy {
                name: strategy.clone(),
            })?;
        book.deal_order_event(order.clone())?;
        book.deal_signal_event(signal);
        self.order_strategy.insert(index, strategy.clone());

        debug!(
            strategy = %strategy,
            index,
            instrument = %order.instrument,
            action = %order.action,
            direction = %order.direction,
            quantity = order.quantity,
            price = ?order.price,
            "order dispatched"
        );
        engine.add_event(order.clone());
        Ok(order)
    }

    /// Route a fill to the book that sent the order.
    pub fn submit_fill(&mut self, fill: FillEvent) -> Result<(), LedgerError> {
        let strategy = self
            .order_strategy
            .get(&fill.index)
            .ok_or(LedgerError::UnknownOrder { index: fill.index })?;
        let book = self
            .books
            .get_mut(strategy)
            .ok_or_else(|| LedgerError::UnknownStrategy {
                name: strategy.clone(),
            })?;
        debug!(
            strategy = %strategy,
            index = fill.index,
            instrument = %fill.instrument,
            quantity = fill.quantity,
            "fill reconciled"
        );
        book.deal_fill_event(fill)
    }

    fn book_or_err(&self, name: &str) -> Result<&StrategyBook, LedgerError> {
        self.books.get(name).ok_or_else(|| LedgerError::UnknownStrategy {
            name: name.to_string(),
        })
    }

    pub fn book(&self, name: &str) -> Option<&StrategyBook> {
        self.books.get(name)
    }

    pub fn book_by_index(&self, index: OrderIndex) -> Option<&StrategyBook> {
        self.order_strategy
            .get(&index)
            .and_then(|name| self.books.get(name))
    }

    /// Strategy that sent order `index`, if any.
    pub fn strategy_of(&self, index: OrderIndex) -> Option<&str> {
        self.order_strategy.get(&index).map(String::as_str)
    }

    /// Registered strategy names, sorted.
    pub fn strategies(&self) -> impl Iterator<Item = &str> {
        self.books.keys().map(String::as_str)
    }

    pub fn books(&self) -> impl Iterator<Item = (&str, &StrategyBook)> {
        self.books.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Position summed over every strategy book, saturating at `u64::MAX`.
    pub fn global_position(&self, instrument: &str, side: Side) -> u64 {
        self.books
            .values()
            .fold(0u64, |total, book| {
                total.saturating_add(book.position(instrument, side))
            })
    }

    /// Orders still waiting for a fill, with their owning strategy, ordered by
    /// strategy then index.
    pub fn unresolved_orders(&self) -> Vec<(&str, &OrderEvent)> {
        self.books
            .iter()
            .flat_map(|(name, book)| book.outstanding().map(move |o| (name.as_str(), o)))
            .collect()
    }

    /// Close out a run: report every order left without a fill and return how
    /// many there were. Leftover orders are expected at the end of a
    /// backtest and are not an error.
    pub fn finish_run(&self) -> usize {
        let unresolved = self.unresolved_orders();
        for (strategy, order) in &unresolved {
            warn!(
                strategy = %strategy,
                index = order.index,
                instrument = %order.instrument,
                action = %order.action,
                direction = %order.direction,
                quantity = order.quantity,
                "order unresolved at end of run"
            );
        }
        unresolved.len()
    }

    /// Tagged history of every book, strategies in name order.
    pub fn records(&self) -> Vec<Record> {
        self.books
            .iter()
            .flat_map(|(name, book)| book.records(name))
            .collect()
    }
}
