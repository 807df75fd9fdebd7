pub mod api;
pub mod application;
pub mod config;
pub mod container;
pub mod domain;
pub mod infrastructure;
