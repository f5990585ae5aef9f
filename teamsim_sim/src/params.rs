//! User-facing simulation parameters.
//!
//! Parameters are plain numbers in simulated time units (seconds). They
//! are layered: built-in defaults, then an optional JSON file, then
//! `key=value` overrides from the command line. [`SimParams::to_model`]
//! turns the result into a checked [`ModelConfig`].

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::path::Path;
use std::time::Duration;
use teamsim_core::{Arrivals, ConfigError, Interarrival, ModelConfig, PoissonArrivals};

/// Raw run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimParams {
    /// Master seed for the run's random stream
    pub seed: u64,

    /// Number of Coders
    pub n_coder: usize,

    /// Simulated run length
    pub t_sim: f64,

    /// Fragment size used when decomposing a job
    pub t_decomposition: f64,

    /// Mean time between interrupts; 0 disables the Interrupter
    pub t_interrupt_arrival: f64,

    /// Time to handle one interrupt
    pub t_interrupt: f64,

    /// Queue sampling interval
    pub t_queue_monitor: f64,

    /// Mean time between job arrivals
    pub t_job_arrival: f64,

    /// Lognormal parameters of a job's development time
    pub t_develop_mu: f64,
    pub t_develop_sigma: f64,

    /// Probability a new job needs decomposition
    pub p_decompose: f64,

    /// Relative weights of Medium and Low priority jobs
    pub p_priority: (f64, f64),

    /// Capacity of the shared queue; `None` is unbounded
    pub code_queue_capacity: Option<usize>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            n_coder: 1,
            t_sim: 100.0,
            t_decomposition: 0.5,
            t_interrupt_arrival: 5.0,
            t_interrupt: 0.2,
            t_queue_monitor: 5.0,
            t_job_arrival: 1.0,
            t_develop_mu: 0.5,
            t_develop_sigma: 0.6,
            p_decompose: 0.5,
            p_priority: (0.2, 0.8),
            code_queue_capacity: None,
        }
    }
}

impl SimParams {
    /// Loads parameters from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::io(path.display().to_string(), e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Applies one `key=value` override.
    ///
    /// The value is parsed as the type the key already has: integers stay
    /// integers, `p_priority` takes `medium,low`, and `code_queue_capacity`
    /// accepts `none`.
    pub fn apply_override(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| invalid(assignment, ""))?;
        let (key, raw) = (key.trim(), raw.trim());

        let mut value = serde_json::to_value(&*self).map_err(|_| invalid(key, raw))?;
        let fields = value
            .as_object_mut()
            .ok_or_else(|| invalid(key, raw))?;
        let current = fields
            .get(key)
            .ok_or_else(|| ConfigError::UnknownParameter(key.to_string()))?;

        let parsed = parse_like(key, current, raw)?;
        fields.insert(key.to_string(), parsed);

        *self = serde_json::from_value(value).map_err(|_| invalid(key, raw))?;
        Ok(())
    }

    /// Applies overrides in order; the last one for a key wins.
    pub fn apply_overrides<'a>(
        &mut self,
        assignments: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        assignments
            .into_iter()
            .try_for_each(|assignment| self.apply_override(assignment))
    }

    /// Simulated run length.
    pub fn duration(&self) -> Result<Duration, ConfigError> {
        time("t_sim", self.t_sim)
    }

    /// Converts to a validated model configuration with Poisson job arrivals.
    pub fn to_model(&self) -> Result<ModelConfig, ConfigError> {
        if self.t_decomposition <= 0.0 || !self.t_decomposition.is_finite() {
            return Err(ConfigError::NonPositiveFragmentSize(self.t_decomposition));
        }

        let interrupts = if self.t_interrupt_arrival == 0.0 {
            None
        } else {
            Some(Interarrival::Exponential {
                mean: time("t_interrupt_arrival", self.t_interrupt_arrival)?,
            })
        };

        let config = ModelConfig {
            n_coder: self.n_coder,
            fragment_size: time("t_decomposition", self.t_decomposition)?,
            interrupts,
            interrupt_duration: time("t_interrupt", self.t_interrupt)?,
            monitor_interval: time("t_queue_monitor", self.t_queue_monitor)?,
            arrivals: Arrivals::Poisson(PoissonArrivals {
                interarrival: Interarrival::Exponential {
                    mean: time("t_job_arrival", self.t_job_arrival)?,
                },
                develop_mu: self.t_develop_mu,
                develop_sigma: self.t_develop_sigma,
                p_decompose: self.p_decompose,
                p_priority: self.p_priority,
            }),
            code_queue_capacity: self.code_queue_capacity,
        };
        config.validate()?;
        Ok(config)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn time(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidTime { name, value })
}

fn parse_like(key: &str, current: &Value, raw: &str) -> Result<Value, ConfigError> {
    let number = |raw: &str| -> Result<Value, ConfigError> {
        let parsed: f64 = raw.parse().map_err(|_| invalid(key, raw))?;
        Number::from_f64(parsed)
            .map(Value::Number)
            .ok_or_else(|| invalid(key, raw))
    };
    let integer = |raw: &str| -> Result<Value, ConfigError> {
        raw.parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid(key, raw))
    };

    match current {
        Value::Number(n) if n.is_f64() => number(raw),
        Value::Number(_) => integer(raw),
        Value::Null if raw.eq_ignore_ascii_case("none") => Ok(Value::Null),
        Value::Null => integer(raw),
        Value::Array(_) => raw
            .split(',')
            .map(|part| number(part.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Bool(_) => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| invalid(key, raw)),
        Value::String(_) => Ok(Value::String(raw.to_string())),
        Value::Object(_) => Err(invalid(key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_validate() {
        let params = SimParams::default();
        let model = params.to_model().unwrap();
        assert_eq!(model.n_coder, 1);
        assert_eq!(model.fragment_size, Duration::from_millis(500));
        assert!(model.interrupts.is_some());
        assert_eq!(params.duration().unwrap(), Duration::from_secs(100));
    }

    #[test]
    fn test_overrides_keep_types() {
        let mut params = SimParams::default();
        params
            .apply_overrides([
                "n_coder=3",
                "t_sim=250",
                "seed=7",
                "p_priority=0.5, 0.5",
                "code_queue_capacity=4",
            ])
            .unwrap();

        assert_eq!(params.n_coder, 3);
        assert_relative_eq!(params.t_sim, 250.0);
        assert_eq!(params.seed, 7);
        assert_eq!(params.p_priority, (0.5, 0.5));
        assert_eq!(params.code_queue_capacity, Some(4));

        params.apply_override("code_queue_capacity=none").unwrap();
        assert_eq!(params.code_queue_capacity, None);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut params = SimParams::default();
        assert_eq!(
            params.apply_override("n_programmer=3"),
            Err(ConfigError::UnknownParameter("n_programmer".to_string()))
        );
    }

    #[test]
    fn test_bad_values_rejected() {
        let mut params = SimParams::default();
        assert!(params.apply_override("n_coder=two").is_err());
        assert!(params.apply_override("n_coder=-1").is_err());
        assert!(params.apply_override("t_sim").is_err());
        assert_eq!(params, SimParams::default());
    }

    #[test]
    fn test_zero_fragment_size_rejected() {
        let params = SimParams {
            t_decomposition: 0.0,
            ..SimParams::default()
        };
        assert_eq!(
            params.to_model(),
            Err(ConfigError::NonPositiveFragmentSize(0.0))
        );

        let params = SimParams {
            t_decomposition: -1.0,
            ..SimParams::default()
        };
        assert!(params.to_model().is_err());
    }

    #[test]
    fn test_zero_interrupt_arrival_disables_interrupter() {
        let params = SimParams {
            t_interrupt_arrival: 0.0,
            ..SimParams::default()
        };
        assert_eq!(params.to_model().unwrap().interrupts, None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params: SimParams = serde_json::from_str(r#"{"n_coder": 4, "t_sim": 20}"#).unwrap();
        assert_eq!(params.n_coder, 4);
        assert_relative_eq!(params.t_sim, 20.0);
        assert_relative_eq!(params.t_decomposition, 0.5);

        assert!(serde_json::from_str::<SimParams>(r#"{"bogus": 1}"#).is_err());
    }

    proptest! {
        #[test]
        fn prop_float_override_round_trips(value in 0.001f64..1000.0) {
            let mut params = SimParams::default();
            params.apply_override(&format!("t_job_arrival={value}")).unwrap();
            prop_assert!((params.t_job_arrival - value).abs() < 1e-9);
        }
    }
}
