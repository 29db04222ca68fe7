//! Core domain types and logic: events, per-strategy books, sizing, and the
//! portfolio manager that routes between them.

pub mod bar;
pub mod book;
pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod position;
pub mod sizing;
pub mod summary;
