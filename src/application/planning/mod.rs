pub mod evaluator;
pub mod generator;
pub mod service;

pub use evaluator::SequenceEvaluator;
pub use generator::{DetailedProgressUpdate, GenerationProgressSink, GeneratorConfig, SequenceGenerator};
pub use service::{PlanningConfig, PlanningService};
