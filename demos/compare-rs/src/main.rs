pub mod parameters;

use std::process::ExitCode;

use parameters::Parameters;
use sir_engine::{Environment, Orchestrator, SimResult, report};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "simulation failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> SimResult<()> {
    let env = Environment::<Parameters>::load()?;
    let registry = env.registry()?;
    let parameters = env.input()?;

    let orchestrator = Orchestrator::new(&registry, parameters.options.clone());
    let result = orchestrator.run(&parameters.request())?;

    env.write_csv(
        "sir_trajectories.csv",
        &report::TRAJECTORY_HEADERS,
        &report::trajectory_rows(&result),
    )?;
    env.write_csv(
        "sir_summary.csv",
        &report::SUMMARY_HEADERS,
        &report::summary_rows(&result),
    )?;
    env.write(
        "sir_report.txt",
        report::render_text(&result, &registry).as_bytes(),
    )?;
    Ok(())
}
