pub mod registry;
pub mod worker;

pub use registry::{JobDefinition, JobRegistry, JobTrigger};
pub use worker::JobScheduler;
