pub mod backup;
pub mod health;
pub mod repositories;
pub mod schema;
pub mod store;
pub mod stores;

pub use store::{Store, StoreProfile};
pub use stores::StorageSubstrate;
