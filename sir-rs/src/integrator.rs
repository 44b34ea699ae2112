//! Deterministic SIR integration on a fixed daily output grid.
//!
//! The ODE system
//!
//! ```text
//! dS/dt = -beta * S * I / N
//! dI/dt =  beta * S * I / N - gamma * I
//! dR/dt =  gamma * I
//! ```
//!
//! is solved with an adaptive Dormand-Prince 5(4) pair. Steps are clamped so that every output
//! time is hit exactly, and no step leaves the pair's real stability interval, so S keeps decaying
//! even once it is far below the error tolerance. Each sample is checked for finiteness, sign,
//! monotonicity of S and R, and conservation before it is recorded.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{SimError, SimResult};

type State = Vector3<f64>;

/// Allowed drift of S + I + R away from N, relative to N.
const CONSERVATION_RTOL: f64 = 1e-6;
/// Round-off allowed against S non-increasing and R non-decreasing, relative to N.
const MONOTONE_RTOL: f64 = 1e-9;
/// Bound on h * |lambda| along the negative real axis for the Dormand-Prince pair.
const STABILITY_LIMIT: f64 = 3.0;
const PREALLOCATED_SAMPLES: usize = 1 << 16;
const SAFETY: f64 = 0.9;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 5.0;

// Dormand-Prince 5(4) tableau. The system is autonomous so the nodes are not needed.
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;
// Difference between the 5th and embedded 4th order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub rtol: f64,
    /// Absolute tolerance as a fraction of N.
    pub atol: f64,
    /// Largest step the solver may take, in days.
    pub max_step: f64,
    /// Ceiling on attempted steps per integration.
    pub max_steps: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-12,
            max_step: 1.0,
            max_steps: 1_000_000,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.rtol > 0.0 && self.rtol <= 1e-6) {
            return Err(SimError::invalid("rtol", self.rtol, "must be in (0, 1e-6]"));
        }
        if !(self.atol > 0.0 && self.atol < 1e-3) {
            return Err(SimError::invalid("atol", self.atol, "must be in (0, 1e-3)"));
        }
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return Err(SimError::invalid(
                "max_step",
                self.max_step,
                "must be positive",
            ));
        }
        if self.max_steps == 0 {
            return Err(SimError::invalid("max_steps", 0.0, "must be at least 1"));
        }
        Ok(())
    }
}

/// Sampled S, I and R series for one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    population: f64,
    time: Vec<f64>,
    susceptible: Vec<f64>,
    infected: Vec<f64>,
    recovered: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(population: f64, len: usize) -> Self {
        Self {
            population,
            time: Vec::with_capacity(len),
            susceptible: Vec::with_capacity(len),
            infected: Vec::with_capacity(len),
            recovered: Vec::with_capacity(len),
        }
    }

    fn push(&mut self, t: f64, [s, i, r]: [f64; 3]) {
        self.time.push(t);
        self.susceptible.push(s);
        self.infected.push(i);
        self.recovered.push(r);
    }

    /// Rebuild a trajectory from primitive columns. Rows go through the same checks as
    /// integrator output, with no allowance for negative values.
    pub fn from_columns(
        population: f64,
        time: Vec<f64>,
        susceptible: Vec<f64>,
        infected: Vec<f64>,
        recovered: Vec<f64>,
    ) -> SimResult<Self> {
        if !(population.is_finite() && population > 0.0) {
            return Err(SimError::invalid(
                "population",
                population,
                "must be a positive finite number",
            ));
        }
        if time.is_empty() {
            return Err(SimError::EmptyTrajectory);
        }
        let len = time.len();
        for (field, column) in [
            ("susceptible", &susceptible),
            ("infected", &infected),
            ("recovered", &recovered),
        ] {
            if column.len() != len {
                return Err(SimError::invalid(
                    field,
                    column.len() as f64,
                    "column length differs from time column",
                ));
            }
        }
        let mut trajectory = Self::with_capacity(population, len);
        let mut guard = SampleGuard::new(population, 0.0);
        for k in 0..len {
            let t = time[k];
            if !t.is_finite() {
                return Err(SimError::invalid("time", t, "must be finite"));
            }
            if k > 0 && t < time[k - 1] {
                return Err(SimError::invalid("time", t, "must be non-decreasing"));
            }
            trajectory.push(t, guard.admit(t, [susceptible[k], infected[k], recovered[k]])?);
        }
        Ok(trajectory)
    }

    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn susceptible(&self) -> &[f64] {
        &self.susceptible
    }

    pub fn infected(&self) -> &[f64] {
        &self.infected
    }

    pub fn recovered(&self) -> &[f64] {
        &self.recovered
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// SHA-256 over the exact bits of every sample, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.population.to_le_bytes());
        for column in [
            &self.time,
            &self.susceptible,
            &self.infected,
            &self.recovered,
        ] {
            for value in column {
                hasher.update(value.to_le_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy)]
struct SirRates {
    population: f64,
    beta: f64,
    gamma: f64,
}

impl SirRates {
    fn derivative(&self, y: &State) -> State {
        let infection = self.beta * y[0] * y[1] / self.population;
        let recovery = self.gamma * y[1];
        State::new(-infection, infection - recovery, recovery)
    }
}

struct DormandPrince<'a> {
    rates: SirRates,
    options: &'a SolverOptions,
    atol: f64,
    step_cap: f64,
    t: f64,
    y: State,
    k1: State,
    h: f64,
    steps: usize,
}

impl<'a> DormandPrince<'a> {
    fn new(rates: SirRates, options: &'a SolverOptions, y0: State) -> Self {
        let k1 = rates.derivative(&y0);
        // The Jacobian's spectral radius is at most 2 * (beta + gamma) by Gershgorin.
        let stable_step = STABILITY_LIMIT / (2.0 * (rates.beta + rates.gamma));
        let mut solver = Self {
            rates,
            options,
            atol: options.atol * rates.population,
            step_cap: options.max_step.min(stable_step),
            t: 0.0,
            y: y0,
            k1,
            h: 0.0,
            steps: 0,
        };
        solver.h = solver.initial_step();
        solver
    }

    fn scaled_rms(&self, v: &State, a: &State, b: &State) -> f64 {
        let mut sum = 0.0;
        for i in 0..3 {
            let scale = self.atol + self.options.rtol * a[i].abs().max(b[i].abs());
            sum += (v[i] / scale).powi(2);
        }
        (sum / 3.0).sqrt()
    }

    fn initial_step(&self) -> f64 {
        let d0 = self.scaled_rms(&self.y, &self.y, &self.y);
        let d1 = self.scaled_rms(&self.k1, &self.y, &self.y);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let euler = self.rates.derivative(&(self.y + self.k1 * h0));
        let d2 = self.scaled_rms(&(euler - self.k1), &self.y, &self.y) / h0;
        let h1 = if d1.max(d2) <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(0.2)
        };
        (100.0 * h0).min(h1).min(self.step_cap)
    }

    /// Returns the candidate state, its derivative and the scaled error estimate.
    fn trial(&self, h: f64) -> (State, State, f64) {
        let f = |y: State| self.rates.derivative(&y);
        let y = self.y;
        let k1 = self.k1;
        let k2 = f(y + k1 * (A21 * h));
        let k3 = f(y + (k1 * A31 + k2 * A32) * h);
        let k4 = f(y + (k1 * A41 + k2 * A42 + k3 * A43) * h);
        let k5 = f(y + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * h);
        let k6 = f(y + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * h);
        let y_new = y + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * h;
        let k7 = f(y_new);
        let err = (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * h;
        let norm = self.scaled_rms(&err, &y, &y_new);
        (y_new, k7, norm)
    }

    fn advance_to(&mut self, target: f64) -> SimResult<()> {
        while self.t < target {
            if self.steps >= self.options.max_steps {
                return Err(SimError::StepBudgetExceeded {
                    max_steps: self.options.max_steps,
                    time: target,
                });
            }
            self.steps += 1;

            let remaining = target - self.t;
            let mut h = self.h.min(self.step_cap);
            let last = h >= remaining || remaining - h <= 16.0 * f64::EPSILON * target.max(1.0);
            if last {
                h = remaining;
            }

            let (y_new, k7, err) = self.trial(h);
            if !err.is_finite() {
                return Err(SimError::instability(
                    self.t,
                    format!("error estimate is {err} for step {h}"),
                ));
            }

            if err <= 1.0 {
                let factor = if err == 0.0 {
                    FAC_MAX
                } else {
                    (SAFETY * err.powf(-0.2)).clamp(FAC_MIN, FAC_MAX)
                };
                let proposed = h * factor;
                self.t = if last { target } else { self.t + h };
                self.y = y_new;
                self.k1 = k7;
                self.h = if last { proposed.max(self.h) } else { proposed };
            } else {
                self.h = h * (SAFETY * err.powf(-0.2)).clamp(FAC_MIN, 1.0);
                if self.h <= 16.0 * f64::EPSILON * self.t.abs().max(1.0) {
                    return Err(SimError::instability(
                        self.t,
                        format!("step size underflow ({})", self.h),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Integrator {
    options: SolverOptions,
}

impl Integrator {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn integrate(
        &self,
        population: f64,
        initial_infected: f64,
        beta: f64,
        gamma: f64,
        days: usize,
    ) -> SimResult<Trajectory> {
        validate_inputs(population, initial_infected, beta, gamma, days)?;
        self.options.validate()?;
        // Every sample after t = 0 costs at least one step.
        if days - 1 > self.options.max_steps {
            return Err(SimError::StepBudgetExceeded {
                max_steps: self.options.max_steps,
                time: days as f64,
            });
        }

        let rates = SirRates {
            population,
            beta,
            gamma,
        };
        let y0 = State::new(population - initial_infected, initial_infected, 0.0);
        let mut solver = DormandPrince::new(rates, &self.options, y0);
        let mut trajectory =
            Trajectory::with_capacity(population, days.min(PREALLOCATED_SAMPLES));
        let mut guard = SampleGuard::new(population, solver.atol);

        for t in sample_times(days) {
            solver.advance_to(t)?;
            let y = solver.y;
            trajectory.push(t, guard.admit(t, [y[0], y[1], y[2]])?);
        }

        debug!(
            population,
            initial_infected,
            beta,
            gamma,
            days,
            steps = solver.steps,
            "integrated SIR trajectory"
        );
        Ok(trajectory)
    }
}

/// Integrate with the default solver options.
pub fn integrate(
    population: f64,
    initial_infected: f64,
    beta: f64,
    gamma: f64,
    days: usize,
) -> SimResult<Trajectory> {
    Integrator::default().integrate(population, initial_infected, beta, gamma, days)
}

fn validate_inputs(
    population: f64,
    initial_infected: f64,
    beta: f64,
    gamma: f64,
    days: usize,
) -> SimResult<()> {
    if !(population.is_finite() && population > 0.0) {
        return Err(SimError::invalid(
            "population",
            population,
            "must be a positive finite number",
        ));
    }
    if !(initial_infected.is_finite() && initial_infected >= 0.0) {
        return Err(SimError::invalid(
            "initial_infected",
            initial_infected,
            "must be a non-negative finite number",
        ));
    }
    if initial_infected > population {
        return Err(SimError::invalid(
            "initial_infected",
            initial_infected,
            "must not exceed population",
        ));
    }
    if !(beta.is_finite() && beta >= 0.0) {
        return Err(SimError::invalid(
            "beta",
            beta,
            "must be a non-negative finite number",
        ));
    }
    if !(gamma.is_finite() && gamma > 0.0) {
        return Err(SimError::invalid(
            "gamma",
            gamma,
            "must be a positive finite number",
        ));
    }
    if days == 0 {
        return Err(SimError::invalid("days", 0.0, "must be at least 1"));
    }
    Ok(())
}

/// `days` points from 0 to `days` inclusive.
fn sample_times(days: usize) -> impl Iterator<Item = f64> {
    let end = days as f64;
    let spacing = if days > 1 { end / (days - 1) as f64 } else { 0.0 };
    (0..days).map(move |k| {
        if days > 1 && k == days - 1 {
            end
        } else {
            k as f64 * spacing
        }
    })
}

/// Checks each sample for finiteness, sign, monotonicity of S and R, and conservation.
struct SampleGuard {
    population: f64,
    negative_tolerance: f64,
    previous: Option<[f64; 3]>,
}

impl SampleGuard {
    fn new(population: f64, negative_tolerance: f64) -> Self {
        Self {
            population,
            negative_tolerance,
            previous: None,
        }
    }

    fn admit(&mut self, time: f64, mut sample: [f64; 3]) -> SimResult<[f64; 3]> {
        for (value, name) in sample.iter_mut().zip(["S", "I", "R"]) {
            if !value.is_finite() {
                return Err(SimError::instability(time, format!("{name} is {value}")));
            }
            if *value < -self.negative_tolerance {
                return Err(SimError::instability(
                    time,
                    format!("{name} = {value} is negative"),
                ));
            }
            // Round-off below the absolute tolerance.
            *value = value.max(0.0);
        }

        if let Some([prev_s, _, prev_r]) = self.previous {
            let slack = MONOTONE_RTOL * self.population;
            if sample[0] > prev_s + slack {
                return Err(SimError::instability(
                    time,
                    format!("S rose from {prev_s} to {}", sample[0]),
                ));
            }
            if sample[2] < prev_r - slack {
                return Err(SimError::instability(
                    time,
                    format!("R fell from {prev_r} to {}", sample[2]),
                ));
            }
            sample[0] = sample[0].min(prev_s);
            sample[2] = sample[2].max(prev_r);
        }

        let total: f64 = sample.iter().sum();
        if (total - self.population).abs() > CONSERVATION_RTOL * self.population {
            return Err(SimError::instability(
                time,
                format!("S + I + R = {total} drifted from N = {}", self.population),
            ));
        }
        self.previous = Some(sample);
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_times() {
        let times = |days| sample_times(days).collect::<Vec<_>>();
        assert_eq!(times(1), vec![0.0]);
        assert_eq!(times(2), vec![0.0, 2.0]);
        let times = times(5);
        assert_eq!(times, vec![0.0, 1.25, 2.5, 3.75, 5.0]);
    }

    #[test]
    fn test_single_day() {
        let trajectory = integrate(1000.0, 10.0, 0.3, 0.1, 1).unwrap();
        assert_eq!(trajectory.len(), 1);
        assert_eq!(trajectory.time(), &[0.0]);
        assert_eq!(trajectory.susceptible(), &[990.0]);
        assert_eq!(trajectory.infected(), &[10.0]);
        assert_eq!(trajectory.recovered(), &[0.0]);
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let cases = [
            (integrate(0.0, 0.0, 0.3, 0.1, 10), "population"),
            (integrate(f64::NAN, 0.0, 0.3, 0.1, 10), "population"),
            (integrate(100.0, -1.0, 0.3, 0.1, 10), "initial_infected"),
            (integrate(100.0, 101.0, 0.3, 0.1, 10), "initial_infected"),
            (integrate(100.0, 1.0, -0.3, 0.1, 10), "beta"),
            (integrate(100.0, 1.0, 0.3, 0.0, 10), "gamma"),
            (integrate(100.0, 1.0, 0.3, f64::INFINITY, 10), "gamma"),
            (integrate(100.0, 1.0, 0.3, 0.1, 0), "days"),
        ];
        for (result, expected) in cases {
            match result {
                Err(SimError::InvalidParameter { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected invalid {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_rejects_loose_tolerance() {
        let options = SolverOptions {
            rtol: 1e-3,
            ..Default::default()
        };
        let err = Integrator::new(options)
            .integrate(1000.0, 1.0, 0.3, 0.1, 10)
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { field: "rtol", .. }));
    }

    #[test]
    fn test_no_seed_no_epidemic() {
        let trajectory = integrate(50_000.0, 0.0, 0.5, 0.1, 120).unwrap();
        assert!(trajectory.infected().iter().all(|&i| i == 0.0));
        assert!(trajectory.susceptible().iter().all(|&s| s == 50_000.0));
        assert!(trajectory.recovered().iter().all(|&r| r == 0.0));
    }

    #[test]
    fn test_zero_transmission_only_recovers() {
        let trajectory = integrate(10_000.0, 500.0, 0.0, 0.2, 60).unwrap();
        assert!(trajectory.susceptible().iter().all(|&s| s == 9_500.0));
        for pair in trajectory.infected().windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        // I(t) = I0 * exp(-gamma * t)
        let t_end = *trajectory.time().last().unwrap();
        let expected = 500.0 * (-0.2 * t_end).exp();
        let actual = *trajectory.infected().last().unwrap();
        assert!((actual - expected).abs() < 1e-4, "{actual} vs {expected}");
    }

    #[test]
    fn test_uncontrolled_epidemic() {
        let trajectory = integrate(1_000_000.0, 100.0, 0.3, 1.0 / 14.0, 160).unwrap();
        assert_eq!(trajectory.len(), 160);
        for k in 0..trajectory.len() {
            let total =
                trajectory.susceptible()[k] + trajectory.infected()[k] + trajectory.recovered()[k];
            assert!((total - 1_000_000.0).abs() < 1e-3);
        }
        assert!(*trajectory.recovered().last().unwrap() > 900_000.0);
    }

    #[test]
    fn test_deterministic() {
        let a = integrate(250_000.0, 25.0, 0.4, 1.0 / 7.0, 90).unwrap();
        let b = integrate(250_000.0, 25.0, 0.4, 1.0 / 7.0, 90).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let c = integrate(250_000.0, 26.0, 0.4, 1.0 / 7.0, 90).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_step_budget() {
        let options = SolverOptions {
            max_steps: 5,
            ..Default::default()
        };
        let err = Integrator::new(options)
            .integrate(1_000_000.0, 100.0, 0.3, 1.0 / 14.0, 160)
            .unwrap_err();
        assert!(matches!(err, SimError::StepBudgetExceeded { max_steps: 5, .. }));
    }

    #[test]
    fn test_from_columns() {
        let trajectory = Trajectory::from_columns(
            10.0,
            vec![0.0, 1.0],
            vec![9.0, 8.0],
            vec![1.0, 1.5],
            vec![0.0, 0.5],
        )
        .unwrap();
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.population(), 10.0);

        let err =
            Trajectory::from_columns(10.0, vec![0.0, 1.0], vec![9.0], vec![1.0, 1.0], vec![0.0, 0.0])
                .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { field: "susceptible", .. }));

        let err = Trajectory::from_columns(10.0, vec![], vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, SimError::EmptyTrajectory));
    }

    #[test]
    fn test_guard_rejects_negative() {
        let mut guard = SampleGuard::new(10.0, 1e-6);
        let err = guard.admit(3.0, [10.0, -1.0, 1.0]).unwrap_err();
        assert!(matches!(err, SimError::NumericalInstability { time, .. } if time == 3.0));

        let sample = guard.admit(3.0, [10.0, -1e-9, 0.0]).unwrap();
        assert_eq!(sample, [10.0, 0.0, 0.0]);

        let err = guard.admit(4.0, [10.0, 1.0, 1.0]).unwrap_err();
        assert!(matches!(err, SimError::NumericalInstability { .. }));
    }

    #[test]
    fn test_guard_keeps_s_and_r_monotone() {
        let mut guard = SampleGuard::new(1.0, 1e-12);
        guard.admit(0.0, [0.5, 0.5, 0.0]).unwrap();
        let sample = guard.admit(1.0, [0.5 + 1e-12, 0.3, 0.2 - 1e-12]).unwrap();
        assert_eq!(sample[0], 0.5);
        assert!(sample[2] >= 0.2 - 1e-12);

        let err = guard.admit(2.0, [0.6, 0.2, 0.2]).unwrap_err();
        assert!(matches!(err, SimError::NumericalInstability { time, .. } if time == 2.0));

        let mut guard = SampleGuard::new(1.0, 1e-12);
        guard.admit(0.0, [0.2, 0.3, 0.5]).unwrap();
        let err = guard.admit(1.0, [0.2, 0.4, 0.4]).unwrap_err();
        assert!(matches!(err, SimError::NumericalInstability { .. }));
    }

    #[test]
    fn test_unit_population_stays_monotone() {
        for (beta, gamma) in [(1.0, 5.0), (10.0, 0.01), (10.0, 1e-4)] {
            let trajectory = integrate(1.0, 0.5, beta, gamma, 200).unwrap();
            for pair in trajectory.susceptible().windows(2) {
                assert!(pair[1] <= pair[0], "beta {beta} gamma {gamma}: {pair:?}");
            }
            for pair in trajectory.recovered().windows(2) {
                assert!(pair[1] >= pair[0], "beta {beta} gamma {gamma}: {pair:?}");
            }
        }
    }

    #[test]
    fn test_collapsed_susceptibles_keep_falling() {
        let trajectory = integrate(1_000_000.0, 100.0, 10.0, 1e-4, 200).unwrap();
        for pair in trajectory.susceptible().windows(2) {
            assert!(pair[1] <= pair[0], "{pair:?}");
        }
        assert!(*trajectory.susceptible().last().unwrap() < 1.0);
    }

    #[test]
    fn test_huge_horizon_fails_before_allocating() {
        let err = integrate(1e6, 100.0, 0.3, 0.1, usize::MAX / 16).unwrap_err();
        assert!(matches!(
            err,
            SimError::StepBudgetExceeded {
                max_steps: 1_000_000,
                ..
            }
        ));
    }

    #[test]
    fn test_from_columns_rejects_invalid_rows() {
        let err = Trajectory::from_columns(
            10.0,
            vec![0.0, 1.0, 2.0],
            vec![9.0, -50.0, 8.0],
            vec![1.0, 3.0, f64::NAN],
            vec![0.0, 0.0, 0.0],
        )
        .unwrap_err();
        assert!(matches!(err, SimError::NumericalInstability { time, .. } if time == 1.0));

        let err = Trajectory::from_columns(
            10.0,
            vec![0.0, 1.0],
            vec![9.0, 8.0],
            vec![1.0, f64::NAN],
            vec![0.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(err, SimError::NumericalInstability { .. }));

        let err = Trajectory::from_columns(10.0, vec![0.0], vec![9.0], vec![3.0], vec![0.0])
            .unwrap_err();
        assert!(matches!(err, SimError::NumericalInstability { .. }));

        let err = Trajectory::from_columns(
            10.0,
            vec![0.0, f64::INFINITY],
            vec![9.0, 8.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { field: "time", .. }));
    }
}
