pub mod adapters;
pub mod event_bus;
pub mod observability;
pub mod persistence;
