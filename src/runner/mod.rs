//! The live/paper control loop

pub mod runner;
pub mod state;

pub use runner::StrategyRunner;
pub use state::{ControlHandle, RunnerPhase, RunnerState};
