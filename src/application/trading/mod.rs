pub mod commission;
pub mod limit_price;
pub mod service;
pub mod validators;

pub use service::{TradeExecutionConfig, TradeExecutionService};
