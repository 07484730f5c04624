use expkit_core::KeyChoices;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::runner::{InputSource, ScriptedInput};
use crate::timeline::{PluginParams, TrialSpec};

/// Response model of the simulated participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub mu_ms: f64,
    pub sigma_ms: f64,
    pub tau_ms: f64,
    /// Probability of answering a trial that accepts keys.
    pub response_rate: f64,
    /// Probability of withholding the response on a stop trial with a stop signal.
    pub stop_success_rate: f64,
    pub feedback_text: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mu_ms: 500.0,
            sigma_ms: 50.0,
            tau_ms: 150.0,
            response_rate: 0.95,
            stop_success_rate: 0.5,
            feedback_text: "No feedback.".into(),
        }
    }
}

/// Normal(mu, sigma) plus Exponential(1/tau), floored at 1 ms.
pub fn sample_ex_gaussian<R: Rng>(rng: &mut R, mu: f64, sigma: f64, tau: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    let normal = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    let u3: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let exponential = -tau * u3.ln();
    (mu + sigma * normal + exponential).max(1.0)
}

/// Answers trials with ex-Gaussian reaction times
pub struct SimulatedParticipant<R: Rng> {
    rng: R,
    config: SimulationConfig,
}

impl<R: Rng> SimulatedParticipant<R> {
    pub fn new(rng: R, config: SimulationConfig) -> Self {
        Self { rng, config }
    }

    fn rt_ms(&mut self) -> u64 {
        let SimulationConfig {
            mu_ms,
            sigma_ms,
            tau_ms,
            ..
        } = self.config;
        sample_ex_gaussian(&mut self.rng, mu_ms, sigma_ms, tau_ms).round() as u64
    }

    fn responds(&mut self) -> bool {
        self.rng.random_bool(self.config.response_rate.clamp(0.0, 1.0))
    }

    fn pick_key(&mut self, choices: &KeyChoices, preferred: Option<&str>) -> Option<String> {
        match choices {
            KeyChoices::NoKeys => None,
            _ if preferred.is_some_and(|k| choices.allows(k, false)) => preferred.map(str::to_owned),
            KeyChoices::AllKeys => {
                let letter = self.rng.random_range(b'a'..=b'z');
                Some(char::from(letter).to_string())
            }
            KeyChoices::Keys(keys) if keys.is_empty() => None,
            KeyChoices::Keys(keys) => Some(keys[self.rng.random_range(0..keys.len())].clone()),
        }
    }

    fn key_press(&mut self, choices: &KeyChoices, preferred: Option<&str>) -> Vec<ScriptedInput> {
        if !self.responds() {
            return Vec::new();
        }
        match self.pick_key(choices, preferred) {
            Some(key) => vec![ScriptedInput::key(self.rt_ms(), key)],
            None => Vec::new(),
        }
    }
}

impl<R: Rng> InputSource for SimulatedParticipant<R> {
    fn script_for(&mut self, spec: &TrialSpec) -> Vec<ScriptedInput> {
        let script = match &spec.plugin {
            PluginParams::StopSignal(p) => {
                let has_signal = p.ss_trial_type.is_stop() && p.ssd.is_some_and(|ssd| ssd >= 0);
                let stop_rate = self.config.stop_success_rate.clamp(0.0, 1.0);
                if has_signal && self.rng.random_bool(stop_rate) {
                    Vec::new()
                } else {
                    self.key_press(&p.choices, p.correct_choice.as_deref())
                }
            }
            PluginParams::AttentionCheck(p) => {
                let expected = p
                    .key_answer
                    .and_then(char::from_u32)
                    .map(|c| c.to_lowercase().to_string());
                self.key_press(&p.choices, expected.as_deref())
            }
            PluginParams::HtmlKeyboardResponse(p) => self.key_press(&p.choices, None),
            PluginParams::PostBatteryFeedback(_) => {
                let typed_at = self.rt_ms();
                vec![
                    ScriptedInput::typed(typed_at, self.config.feedback_text.clone()),
                    ScriptedInput::submit(typed_at + 500),
                ]
            }
        };
        trace!(trial_type = spec.plugin.trial_type(), inputs = script.len(), "simulated inputs");
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KeyboardResponseParams, StopSignalParams};
    use crate::runner::InputAction;
    use expkit_core::SecondaryTrialKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn participant(config: SimulationConfig) -> SimulatedParticipant<StdRng> {
        SimulatedParticipant::new(StdRng::seed_from_u64(7), config)
    }

    #[test]
    fn ex_gaussian_samples_are_plausible() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<f64> = (0..2000)
            .map(|_| sample_ex_gaussian(&mut rng, 500.0, 50.0, 150.0))
            .collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(samples.iter().all(|s| *s >= 1.0));
        assert!((600.0..700.0).contains(&mean), "mean {mean}");
    }

    #[test]
    fn answers_with_the_correct_key_when_allowed() {
        let mut sim = participant(SimulationConfig {
            response_rate: 1.0,
            ..SimulationConfig::default()
        });
        let spec = TrialSpec::new(PluginParams::StopSignal(StopSignalParams {
            stimulus: "X".into(),
            ss_stimulus: None,
            ss_trial_type: SecondaryTrialKind::Go,
            stimulus_duration: -1,
            ss_duration: -1,
            trial_duration: 1500,
            ssd: None,
            prompt: String::new(),
            choices: KeyChoices::keys([",", "."]),
            correct_choice: Some(".".into()),
            response_ends_trial: false,
        }));

        let script = sim.script_for(&spec);
        assert_eq!(script.len(), 1);
        assert_eq!(script[0].action, InputAction::Key { key: ".".into() });
    }

    #[test]
    fn withholds_on_successful_stop() {
        let mut sim = participant(SimulationConfig {
            response_rate: 1.0,
            stop_success_rate: 1.0,
            ..SimulationConfig::default()
        });
        let spec: TrialSpec = serde_json::from_value(serde_json::json!({
            "type": "poldracklab-stop-signal",
            "stimulus": "X",
            "SS_trial_type": "stop",
            "SSD": 250,
            "choices": [",", "."],
        }))
        .unwrap();
        assert!(sim.script_for(&spec).is_empty());
    }

    #[test]
    fn no_keys_trials_get_no_presses() {
        let mut sim = participant(SimulationConfig {
            response_rate: 1.0,
            ..SimulationConfig::default()
        });
        let spec = TrialSpec::new(PluginParams::HtmlKeyboardResponse(
            KeyboardResponseParams::new("wait", KeyChoices::NoKeys),
        ));
        assert!(sim.script_for(&spec).is_empty());
    }
}
