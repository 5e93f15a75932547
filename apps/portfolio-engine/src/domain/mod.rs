//! Domain layer - Core business logic with no infrastructure dependencies.

pub mod portfolio;
pub mod shared;
