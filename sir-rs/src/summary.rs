use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::integrator::Trajectory;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Sample index of the infection peak.
    pub peak_day: usize,
    pub peak_time: f64,
    pub peak_infected: f64,
    pub final_recovered: f64,
    pub final_susceptible: f64,
    pub r0: f64,
}

impl Summary {
    /// Share of the population recovered by the end of the horizon.
    pub fn attack_rate(&self, population: f64) -> f64 {
        self.final_recovered / population
    }
}

pub fn summarize(trajectory: &Trajectory, beta: f64, gamma: f64) -> SimResult<Summary> {
    if !(gamma.is_finite() && gamma != 0.0) {
        return Err(SimError::DegenerateRate { gamma });
    }
    let infected = trajectory.infected();
    let peak_day = first_max_index(infected).ok_or(SimError::EmptyTrajectory)?;
    let last = trajectory.len() - 1;

    Ok(Summary {
        peak_day,
        peak_time: trajectory.time()[peak_day],
        peak_infected: infected[peak_day],
        final_recovered: trajectory.recovered()[last],
        final_susceptible: trajectory.susceptible()[last],
        r0: beta / gamma,
    })
}

// Ties resolve to the earliest index. Non-finite values never win.
fn first_max_index(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &value) in values.iter().enumerate().filter(|(_, v)| v.is_finite()) {
        match best {
            Some((_, max)) if value <= max => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::integrate;

    fn columns(susceptible: Vec<f64>, infected: Vec<f64>) -> Trajectory {
        let time = (0..infected.len()).map(|k| k as f64).collect();
        let recovered = susceptible
            .iter()
            .zip(&infected)
            .map(|(s, i)| 100.0 - s - i)
            .collect();
        Trajectory::from_columns(100.0, time, susceptible, infected, recovered).unwrap()
    }

    #[test]
    fn test_r0() {
        let trajectory = integrate(1000.0, 1.0, 0.3, 1.0 / 14.0, 10).unwrap();
        let summary = summarize(&trajectory, 0.3, 1.0 / 14.0).unwrap();
        assert!((summary.r0 - 4.2).abs() < 1e-9);
    }

    #[test]
    fn test_peak_ties_take_first() {
        let trajectory = columns(
            vec![99.0, 95.0, 95.0, 93.0, 93.0],
            vec![1.0, 5.0, 3.0, 5.0, 2.0],
        );
        let summary = summarize(&trajectory, 0.3, 0.1).unwrap();
        assert_eq!(summary.peak_day, 1);
        assert_eq!(summary.peak_infected, 5.0);
        assert_eq!(summary.peak_time, 1.0);
    }

    #[test]
    fn test_first_max_skips_non_finite() {
        assert_eq!(first_max_index(&[f64::NAN, 1.0, 3.0, f64::NAN, 3.0]), Some(2));
        assert_eq!(first_max_index(&[f64::INFINITY, 2.0, 1.0]), Some(1));
        assert_eq!(first_max_index(&[f64::NAN]), None);
        assert_eq!(first_max_index(&[]), None);
    }

    #[test]
    fn test_flat_series_peaks_at_start() {
        let trajectory = columns(vec![100.0; 4], vec![0.0; 4]);
        let summary = summarize(&trajectory, 0.3, 0.1).unwrap();
        assert_eq!(summary.peak_day, 0);
        assert_eq!(summary.final_susceptible, 100.0);
        assert_eq!(summary.final_recovered, 0.0);
    }

    #[test]
    fn test_final_values() {
        let trajectory = Trajectory::from_columns(
            10.0,
            vec![0.0, 1.0, 2.0],
            vec![9.0, 6.0, 4.0],
            vec![1.0, 3.0, 2.0],
            vec![0.0, 1.0, 4.0],
        )
        .unwrap();
        let summary = summarize(&trajectory, 0.5, 0.25).unwrap();
        assert_eq!(summary.peak_day, 1);
        assert_eq!(summary.final_recovered, 4.0);
        assert_eq!(summary.final_susceptible, 4.0);
        assert_eq!(summary.r0, 2.0);
        assert_eq!(summary.attack_rate(10.0), 0.4);
    }

    #[test]
    fn test_degenerate_gamma() {
        let trajectory = columns(vec![99.0, 98.0], vec![1.0, 2.0]);
        let err = summarize(&trajectory, 0.3, 0.0).unwrap_err();
        assert!(matches!(err, SimError::DegenerateRate { gamma } if gamma == 0.0));
    }

    #[test]
    fn test_uncontrolled_epidemic_summary() {
        let trajectory = integrate(1_000_000.0, 100.0, 0.3, 1.0 / 14.0, 160).unwrap();
        let summary = summarize(&trajectory, 0.3, 1.0 / 14.0).unwrap();
        assert!(summary.peak_day > 30 && summary.peak_day < 90);
        assert!(summary.peak_infected < 1_000_000.0);
        assert!(summary.final_recovered > 900_000.0);
        assert!(summary.final_susceptible < 100_000.0);
    }
}
