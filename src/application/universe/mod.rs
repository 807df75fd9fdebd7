pub mod portfolio_service;
pub mod security_service;

pub use portfolio_service::PortfolioService;
pub use security_service::SecurityService;
