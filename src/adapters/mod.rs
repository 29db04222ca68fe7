//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_record_adapter;
pub mod file_config_adapter;
pub mod replay_engine;
#[cfg(feature = "sqlite")]
pub mod sqlite_record_adapter;
