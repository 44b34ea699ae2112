use serde::Deserialize;
use sir_engine::{DiseaseRun, OrchestratorConfig, SimulationRequest};

/// Typed `input` section of the run envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Parameters {
    pub population: f64,
    pub days: usize,
    pub diseases: Vec<DiseaseRun>,
    #[serde(default)]
    pub options: OrchestratorConfig,
}

impl Parameters {
    pub fn request(&self) -> SimulationRequest {
        SimulationRequest {
            population: self.population,
            days: self.days,
            diseases: self.diseases.clone(),
        }
    }
}
