pub mod policy;
pub mod reports;
pub mod simulation;

pub use policy::Strategy;
pub use simulation::{RunRecord, SimulationConfig, play_run};
