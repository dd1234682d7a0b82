// Monitoring engine internals
pub mod engine;
pub mod evaluator;
pub mod gate;

pub use engine::{EngineState, MonitorEngine};
pub use evaluator::{evaluate, Evaluation};
pub use gate::AlertGate;
