//! Tabular and plain-text export of a [`SimulationResult`].

use crate::orchestrator::SimulationResult;
use crate::registry::DiseaseRegistry;

pub const SUMMARY_HEADERS: [&str; 11] = [
    "disease",
    "name",
    "beta",
    "gamma",
    "initial_infected",
    "peak_day",
    "peak_infected",
    "total_recovered",
    "final_susceptible",
    "r0",
    "fingerprint",
];

pub const TRAJECTORY_HEADERS: [&str; 6] = [
    "disease",
    "step",
    "time",
    "susceptible",
    "infected",
    "recovered",
];

const MILLION: f64 = 1e6;

pub fn summary_rows(result: &SimulationResult) -> Vec<Vec<String>> {
    result
        .runs
        .iter()
        .map(|(key, outcome)| {
            let parameters = outcome.parameters();
            let summary = outcome.summary();
            vec![
                key.clone(),
                parameters.name.clone(),
                parameters.beta.to_string(),
                parameters.gamma.to_string(),
                parameters.initial_infected.to_string(),
                summary.peak_day.to_string(),
                summary.peak_infected.to_string(),
                summary.final_recovered.to_string(),
                summary.final_susceptible.to_string(),
                summary.r0.to_string(),
                outcome.trajectory().fingerprint(),
            ]
        })
        .collect()
}

/// One row per (disease, sample).
pub fn trajectory_rows(result: &SimulationResult) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for (key, outcome) in &result.runs {
        let trajectory = outcome.trajectory();
        for step in 0..trajectory.len() {
            rows.push(vec![
                key.clone(),
                step.to_string(),
                trajectory.time()[step].to_string(),
                trajectory.susceptible()[step].to_string(),
                trajectory.infected()[step].to_string(),
                trajectory.recovered()[step].to_string(),
            ]);
        }
    }
    rows
}

/// Human-readable report, diseases in registry order, counts in millions.
pub fn render_text(result: &SimulationResult, registry: &DiseaseRegistry) -> String {
    let mut lines = vec![
        "Disease Spread Simulation Report".to_string(),
        "---------------------------------".to_string(),
    ];

    for profile in registry.list_all() {
        let Some(outcome) = result.get(&profile.key) else {
            continue;
        };
        let summary = outcome.summary();
        lines.push(String::new());
        lines.push(format!("{} Results:", profile.name));
        lines.push(format!("Peak Infection Day: {}", summary.peak_day));
        lines.push(format!(
            "Peak Infected (Millions): {:.2}",
            summary.peak_infected / MILLION
        ));
        lines.push(format!(
            "Total Recovered (Millions): {:.2}",
            summary.final_recovered / MILLION
        ));
        lines.push(format!(
            "Final Susceptible (Millions): {:.2}",
            summary.final_susceptible / MILLION
        ));
        lines.push(format!(
            "Attack Rate (%): {:.2}",
            100.0 * summary.attack_rate(outcome.trajectory().population())
        ));
        lines.push(format!("Basic Reproduction Number (R0): {:.2}", summary.r0));
        lines.push(format!("Trajectory: {}", outcome.trajectory().fingerprint()));
    }

    if !result.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped:".to_string());
        for skipped in &result.skipped {
            lines.push(format!("{}: {}", skipped.disease, skipped.error));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
