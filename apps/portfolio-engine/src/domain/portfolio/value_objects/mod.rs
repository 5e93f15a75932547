//! Value objects for the portfolio context.

pub mod holding;
pub mod lifecycle;
pub mod loyalty;
pub mod order;
pub mod order_conditions;
pub mod order_result;
pub mod order_status;
pub mod order_type;
pub mod trade;

pub use holding::{Holding, ValuedHolding};
pub use lifecycle::LifecycleState;
pub use loyalty::LoyaltyLevel;
pub use order::{Order, OrderDetails};
pub use order_conditions::OrderConditions;
pub use order_result::OrderResult;
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use trade::Trade;
