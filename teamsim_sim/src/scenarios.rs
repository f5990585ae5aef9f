//! Named scenarios for the team model.

use crate::params::SimParams;
use std::time::Duration;
use teamsim_core::{Arrivals, ConfigError, Interarrival, ModelConfig, Priority, ScriptedJob};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Random team: Poisson jobs, random interrupts, all parameters honored
    Default,

    /// One Coder splits a single large job into fragments
    Decomposition,

    /// One Coder gets interrupted after finishing its only job
    Interrupt,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Default,
            ScenarioId::Decomposition,
            ScenarioId::Interrupt,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Default => "default",
            ScenarioId::Decomposition => "decomposition",
            ScenarioId::Interrupt => "interrupt",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Default => "Poisson job arrivals and random interrupts across the team",
            ScenarioId::Decomposition => {
                "1 coder, fragment size 2, one decomposable job of 7 at t=0"
            }
            ScenarioId::Interrupt => "1 coder, one job of 3 at t=0, an interrupt every 5",
        }
    }

    /// Returns true if the scenario ignores the random-model parameters.
    pub fn is_scripted(&self) -> bool {
        !matches!(self, ScenarioId::Default)
    }

    /// Builds the model configuration for this scenario.
    ///
    /// Scripted scenarios fix their own team and workload and take only
    /// the interrupt duration and monitor interval from `params`.
    pub fn model(&self, params: &SimParams) -> Result<ModelConfig, ConfigError> {
        let base = params.to_model()?;
        let config = match self {
            ScenarioId::Default => base,
            ScenarioId::Decomposition => ModelConfig {
                n_coder: 1,
                fragment_size: Duration::from_secs(2),
                interrupts: None,
                arrivals: Arrivals::Scripted(vec![ScriptedJob {
                    at: Duration::ZERO,
                    duration: Duration::from_secs(7),
                    priority: Priority::Medium,
                    decompose: true,
                }]),
                code_queue_capacity: None,
                ..base
            },
            ScenarioId::Interrupt => ModelConfig {
                n_coder: 1,
                interrupts: Some(Interarrival::Fixed(Duration::from_secs(5))),
                arrivals: Arrivals::Scripted(vec![ScriptedJob {
                    at: Duration::ZERO,
                    duration: Duration::from_secs(3),
                    priority: Priority::Medium,
                    decompose: false,
                }]),
                code_queue_capacity: None,
                ..base
            },
        };
        config.validate()?;
        Ok(config)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" | "random" => Ok(ScenarioId::Default),
            "decomposition" | "a" => Ok(ScenarioId::Decomposition),
            "interrupt" | "b" => Ok(ScenarioId::Interrupt),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_scripted_scenarios_ignore_team_size() {
        let params = SimParams {
            n_coder: 5,
            ..SimParams::default()
        };
        assert_eq!(ScenarioId::Default.model(&params).unwrap().n_coder, 5);
        assert_eq!(ScenarioId::Decomposition.model(&params).unwrap().n_coder, 1);
        assert_eq!(ScenarioId::Interrupt.model(&params).unwrap().n_coder, 1);
    }

    #[test]
    fn test_invalid_params_fail_every_scenario() {
        let params = SimParams {
            t_queue_monitor: -1.0,
            ..SimParams::default()
        };
        for scenario in ScenarioId::all() {
            assert!(scenario.model(&params).is_err());
        }
    }
}
