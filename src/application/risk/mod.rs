pub mod service;

pub use service::RiskService;
