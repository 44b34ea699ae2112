use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::integrator::{Integrator, SolverOptions, Trajectory};
use crate::registry::DiseaseRegistry;
use crate::summary::{Summary, summarize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRun {
    pub disease: String,
    #[serde(default)]
    pub initial_infected: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
}

impl DiseaseRun {
    pub fn new(disease: impl Into<String>) -> Self {
        Self {
            disease: disease.into(),
            initial_infected: None,
            beta: None,
            gamma: None,
        }
    }

    pub fn with_initial_infected(mut self, initial_infected: f64) -> Self {
        self.initial_infected = Some(initial_infected);
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = Some(beta);
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub population: f64,
    pub days: usize,
    pub diseases: Vec<DiseaseRun>,
}

impl SimulationRequest {
    fn validate(&self) -> SimResult<()> {
        if !(self.population.is_finite() && self.population > 0.0) {
            return Err(SimError::invalid(
                "population",
                self.population,
                "must be a positive finite number",
            ));
        }
        if self.days == 0 {
            return Err(SimError::invalid("days", 0.0, "must be at least 1"));
        }
        let mut seen = HashSet::new();
        for run in &self.diseases {
            if !seen.insert(run.disease.as_str()) {
                return Err(SimError::DuplicateRun {
                    key: run.disease.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Effective parameters of one run after defaults are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRun {
    pub disease: String,
    pub name: String,
    pub initial_infected: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorPolicy {
    /// The first failing run fails the whole request.
    #[default]
    Abort,
    /// Failing runs are left out of the result and listed as skipped.
    SkipAndReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub on_run_error: RunErrorPolicy,
    pub default_initial_infected: f64,
    pub parallel: bool,
    pub solver: SolverOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            on_run_error: RunErrorPolicy::Abort,
            default_initial_infected: 100.0,
            parallel: false,
            solver: SolverOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    parameters: ResolvedRun,
    trajectory: Trajectory,
    summary: Summary,
}

impl RunOutcome {
    pub fn parameters(&self) -> &ResolvedRun {
        &self.parameters
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

#[derive(Debug)]
pub struct SkippedRun {
    pub disease: String,
    pub error: SimError,
}

#[derive(Debug, Default)]
pub struct SimulationResult {
    pub runs: BTreeMap<String, RunOutcome>,
    pub skipped: Vec<SkippedRun>,
}

impl SimulationResult {
    pub fn get(&self, disease: &str) -> Option<&RunOutcome> {
        self.runs.get(disease)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

pub struct Orchestrator<'a> {
    registry: &'a DiseaseRegistry,
    config: OrchestratorConfig,
    integrator: Integrator,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a DiseaseRegistry, config: OrchestratorConfig) -> Self {
        let integrator = Integrator::new(config.solver);
        Self {
            registry,
            config,
            integrator,
        }
    }

    pub fn resolve(&self, run: &DiseaseRun) -> SimResult<ResolvedRun> {
        let profile = self.registry.lookup(&run.disease)?;
        Ok(ResolvedRun {
            disease: profile.key.clone(),
            name: profile.name.clone(),
            initial_infected: run
                .initial_infected
                .unwrap_or(self.config.default_initial_infected),
            beta: run.beta.unwrap_or(profile.default_beta),
            gamma: run.gamma.unwrap_or(profile.default_gamma),
        })
    }

    fn execute(&self, request: &SimulationRequest, run: &DiseaseRun) -> SimResult<RunOutcome> {
        let parameters = self.resolve(run)?;
        debug!(
            disease = %parameters.disease,
            initial_infected = parameters.initial_infected,
            beta = parameters.beta,
            gamma = parameters.gamma,
            "running disease"
        );
        let trajectory = self.integrator.integrate(
            request.population,
            parameters.initial_infected,
            parameters.beta,
            parameters.gamma,
            request.days,
        )?;
        let summary = summarize(&trajectory, parameters.beta, parameters.gamma)?;
        Ok(RunOutcome {
            parameters,
            trajectory,
            summary,
        })
    }

    pub fn run(&self, request: &SimulationRequest) -> SimResult<SimulationResult> {
        request.validate()?;

        let policy = self.config.on_run_error;
        let outcomes: Vec<SimResult<RunOutcome>> = match (self.config.parallel, policy) {
            (true, _) => request
                .diseases
                .par_iter()
                .map(|run| self.execute(request, run))
                .collect(),
            (false, RunErrorPolicy::Abort) => {
                let mut outcomes = Vec::with_capacity(request.diseases.len());
                for run in &request.diseases {
                    let outcome = self.execute(request, run);
                    let failed = outcome.is_err();
                    outcomes.push(outcome);
                    if failed {
                        break;
                    }
                }
                outcomes
            }
            (false, RunErrorPolicy::SkipAndReport) => request
                .diseases
                .iter()
                .map(|run| self.execute(request, run))
                .collect(),
        };

        let mut result = SimulationResult::default();
        for (run, outcome) in request.diseases.iter().zip(outcomes) {
            match outcome {
                Ok(outcome) => {
                    result.runs.insert(run.disease.clone(), outcome);
                }
                Err(error) => match policy {
                    RunErrorPolicy::Abort => return Err(SimError::in_run(&run.disease, error)),
                    RunErrorPolicy::SkipAndReport => {
                        warn!(disease = %run.disease, %error, "skipping failed run");
                        result.skipped.push(SkippedRun {
                            disease: run.disease.clone(),
                            error,
                        });
                    }
                },
            }
        }

        info!(
            population = request.population,
            days = request.days,
            completed = result.runs.len(),
            skipped = result.skipped.len(),
            "simulation request finished"
        );
        Ok(result)
    }
}
