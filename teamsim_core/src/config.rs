//! Validated model configuration.
//!
//! These are the typed, checked parameters the actors read during a run.
//! Raw user-facing parameters (JSON files, CLI overrides) are converted into
//! a [`ModelConfig`] by the harness and validated once, before any actor
//! is spawned.

use crate::error::{ConfigError, SimError};
use crate::work::Priority;
use rand::Rng;
use rand_distr::{Distribution, Exp, LogNormal};
use std::time::Duration;

/// How long to wait between two events of a recurring source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interarrival {
    /// Exponentially distributed with the given mean
    Exponential { mean: Duration },

    /// Always the same gap. Useful for deterministic scenarios.
    Fixed(Duration),
}

impl Interarrival {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Duration, SimError> {
        match self {
            Interarrival::Fixed(gap) => Ok(*gap),
            Interarrival::Exponential { mean } => {
                let exp = Exp::new(1.0 / mean.as_secs_f64())
                    .map_err(|e| ConfigError::Distribution(e.to_string()))?;
                secs_to_duration(exp.sample(rng))
            }
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let gap = match self {
            Interarrival::Exponential { mean } => *mean,
            Interarrival::Fixed(gap) => *gap,
        };
        if gap.is_zero() {
            return Err(ConfigError::InvalidTime { name, value: 0.0 });
        }
        Ok(())
    }
}

/// Random job stream: Poisson arrivals, lognormal development times.
#[derive(Debug, Clone, PartialEq)]
pub struct PoissonArrivals {
    pub interarrival: Interarrival,
    pub develop_mu: f64,
    pub develop_sigma: f64,

    /// Probability a job needs decomposition
    pub p_decompose: f64,

    /// Relative weights of Medium and Low priority jobs
    pub p_priority: (f64, f64),
}

impl PoissonArrivals {
    /// Draws (duration, priority, decompose) for the next job.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Duration, Priority, bool), SimError> {
        let develop = LogNormal::new(self.develop_mu, self.develop_sigma)
            .map_err(|e| ConfigError::Distribution(e.to_string()))?;
        let duration = secs_to_duration(develop.sample(rng))?;

        let (medium, low) = self.p_priority;
        let priority = if rng.gen_bool(medium / (medium + low)) {
            Priority::Medium
        } else {
            Priority::Low
        };

        let decompose = rng.gen_bool(self.p_decompose);
        Ok((duration, priority, decompose))
    }
}

/// A job that arrives at a fixed time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedJob {
    pub at: Duration,
    pub duration: Duration,
    pub priority: Priority,
    pub decompose: bool,
}

/// Where shared-queue jobs come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Arrivals {
    Poisson(PoissonArrivals),

    /// Jobs in the order given; times must not decrease
    Scripted(Vec<ScriptedJob>),
}

/// Everything the actors read during a run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub n_coder: usize,

    /// Size of a full fragment when a job is decomposed
    pub fragment_size: Duration,

    /// Interrupt stream; `None` runs without an Interrupter
    pub interrupts: Option<Interarrival>,

    /// Processing time of one interrupt
    pub interrupt_duration: Duration,

    /// Sampling interval of the queue monitor
    pub monitor_interval: Duration,

    pub arrivals: Arrivals,

    /// Capacity of the shared queue; `None` is unbounded
    pub code_queue_capacity: Option<usize>,
}

impl ModelConfig {
    /// Checks every parameter. Call before building a simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_coder == 0 {
            return Err(ConfigError::NoCoders);
        }
        if self.fragment_size.is_zero() {
            return Err(ConfigError::NonPositiveFragmentSize(0.0));
        }
        if self.monitor_interval.is_zero() {
            return Err(ConfigError::InvalidTime {
                name: "t_queue_monitor",
                value: 0.0,
            });
        }
        if let Some(interrupts) = &self.interrupts {
            interrupts.validate("t_interrupt_arrival")?;
        }

        match &self.arrivals {
            Arrivals::Poisson(poisson) => {
                poisson.interarrival.validate("t_job_arrival")?;
                check_probability("p_decompose", poisson.p_decompose)?;
                let (medium, low) = poisson.p_priority;
                check_probability("p_priority.medium", medium)?;
                check_probability("p_priority.low", low)?;
                if medium + low <= 0.0 {
                    return Err(ConfigError::InvalidProbability {
                        name: "p_priority",
                        value: medium + low,
                    });
                }
                if !poisson.develop_mu.is_finite()
                    || !poisson.develop_sigma.is_finite()
                    || poisson.develop_sigma < 0.0
                {
                    return Err(ConfigError::InvalidTime {
                        name: "t_develop_sigma",
                        value: poisson.develop_sigma,
                    });
                }
            }
            Arrivals::Scripted(jobs) => {
                if jobs.windows(2).any(|pair| pair[1].at < pair[0].at) {
                    return Err(ConfigError::InvalidTime {
                        name: "script.at",
                        value: -1.0,
                    });
                }
                if jobs.iter().any(|job| job.priority == Priority::High) {
                    // High is reserved for fragments and interrupts
                    return Err(ConfigError::InvalidValue {
                        key: "script.priority".to_string(),
                        value: "High".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidProbability { name, value });
    }
    Ok(())
}

/// Converts a sampled number of seconds into a `Duration`.
pub fn secs_to_duration(secs: f64) -> Result<Duration, SimError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| SimError::invariant(format!("sampled time {secs} is not a duration: {e}")))
}
