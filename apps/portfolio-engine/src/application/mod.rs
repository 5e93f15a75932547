//! Application Layer
//!
//! Ports (trait seams toward infrastructure), application services, and
//! use cases composing them. Depends only on the domain layer.

pub mod ports;
pub mod services;
pub mod use_cases;
