//! Infrastructure Layer
//!
//! Adapters behind the application ports, the long-running pipeline
//! components (order publisher, trade-result reconciler), and runtime
//! configuration.

pub mod bus;
pub mod config;
pub mod persistence;
pub mod publisher;
pub mod quotes;
pub mod reconciler;
pub mod retry;
