//! Cross-cutting concerns: configuration, errors, logging, process state.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod users;
