pub mod environment;
pub mod error;
pub mod integrator;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod summary;

pub use environment::Environment;
pub use error::{SimError, SimResult};
pub use integrator::{Integrator, SolverOptions, Trajectory, integrate};
pub use orchestrator::{
    DiseaseRun, Orchestrator, OrchestratorConfig, ResolvedRun, RunErrorPolicy, RunOutcome,
    SimulationRequest, SimulationResult, SkippedRun,
};
pub use registry::{DiseaseProfile, DiseaseRegistry};
pub use summary::{Summary, summarize};
