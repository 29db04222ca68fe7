//! Port traits for the collaborators around the portfolio core.

pub mod config_port;
pub mod engine_port;
pub mod record_port;
