//! Homeostatic plasticity for the new-born stage of the Spatial Pooler.
//!
//! A freshly initialized pooler relies on boosting to give every column a chance to win. Once the
//! pooler has seen its inputs often enough, boosting only makes the output of an already learned
//! input drift. The controller watches, for every distinct input, the SDR the pooler produced the
//! last time and how many columns it activated:
//! - After `min_cycles` cycles, the first repeated input ends the new-born stage and boosting is
//!   switched off for good.
//! - An input is stable when its SDR keeps at least `required_similarity_threshold` of its bits
//!   and its active column count no longer varies.
//! - The pooler is stable once every seen input has stayed stable for more than
//!   `cycles_to_wait_on_change` appearances. Listeners are notified on every change of that state.

use fxhash::FxHashMap;
use log::debug;
use std::collections::VecDeque;

/// Number of past active column counts kept per input.
const COUNT_HISTORY: usize = 5;

/// Reported to the stability listener when the pooler becomes stable or unstable again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityEvent {
    pub is_stable: bool,

    /// Number of distinct inputs seen so far.
    pub num_inputs: usize,

    /// Average change of the active column count of the current input, -1 if not computed.
    pub avg_derivation: f64,

    /// Controller cycle in which the change happened.
    pub cycle: usize,
}

type StabilityListener = Box<dyn FnMut(&StabilityEvent) + Send>;

#[derive(Debug, Clone)]
struct InputHistory {
    last_output: Vec<usize>,
    active_counts: VecDeque<usize>,
    stable_cycles: usize,
}

/// Tracks the stability of the pooler's output per input and decides when boosting ends.
pub struct HomeostaticPlasticityController {
    min_cycles: usize,
    cycles_to_wait_on_change: usize,
    required_similarity_threshold: f64,
    cycle: usize,
    newborn: bool,
    stable: bool,
    inputs: FxHashMap<Vec<usize>, InputHistory>,
    listener: Option<StabilityListener>,
}

impl HomeostaticPlasticityController {
    pub fn new(
        min_cycles: usize,
        cycles_to_wait_on_change: usize,
        required_similarity_threshold: f64,
    ) -> Self {
        Self {
            min_cycles,
            cycles_to_wait_on_change,
            required_similarity_threshold,
            cycle: 0,
            newborn: true,
            stable: false,
            inputs: FxHashMap::default(),
            listener: None,
        }
    }

    /// Registers a listener called whenever the stability state flips.
    pub fn on_stability_changed(
        mut self,
        listener: impl FnMut(&StabilityEvent) + Send + 'static,
    ) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Records the output of one learning cycle. Returns true if the pooler is stable after it.
    pub fn compute(&mut self, input: &[bool], active_columns: &[usize]) -> bool {
        let key: Vec<usize> = (0..input.len()).filter(|&bit| input[bit]).collect();
        let cycle = self.cycle;
        self.cycle += 1;

        let Some(history) = self.inputs.get_mut(&key) else {
            self.inputs.insert(
                key,
                InputHistory {
                    last_output: active_columns.to_vec(),
                    active_counts: VecDeque::from(vec![0; COUNT_HISTORY]),
                    stable_cycles: 0,
                },
            );
            return false;
        };

        history.active_counts.pop_front();
        history.active_counts.push_back(active_columns.len());

        if cycle >= self.min_cycles && self.newborn {
            self.newborn = false;
            debug!("new-born stage ended after {} cycles, boosting disabled", cycle);
        }

        let similarity = similarity(&history.last_output, active_columns);
        history.last_output = active_columns.to_vec();

        if similarity < self.required_similarity_threshold {
            history.stable_cycles = 0;
            if self.stable {
                self.set_stable(false, -1.0, cycle);
            }
            return false;
        }

        let avg_derivation = avg_delta(&history.active_counts);
        if avg_derivation == 0.0 {
            history.stable_cycles += 1;
        } else {
            history.stable_cycles = 0;
        }
        let stable_cycles = history.stable_cycles;

        let wait = self.cycles_to_wait_on_change;
        let all_stable = self.inputs.values().all(|h| h.stable_cycles >= wait);
        if cycle >= self.min_cycles && stable_cycles > wait && all_stable {
            if !self.stable {
                self.set_stable(true, avg_derivation, cycle);
            }
            return true;
        }
        false
    }

    fn set_stable(&mut self, stable: bool, avg_derivation: f64, cycle: usize) {
        self.stable = stable;
        let event = StabilityEvent {
            is_stable: stable,
            num_inputs: self.inputs.len(),
            avg_derivation,
            cycle,
        };
        debug!("spatial pooler stability changed: {:?}", event);
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
    }

    /// True while boosting is still allowed.
    #[inline]
    pub fn is_newborn(&self) -> bool {
        self.newborn
    }

    #[inline]
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    #[inline]
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Number of distinct inputs seen so far.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }
}

/// Share of `current` found in `previous`, relative to the longer of both; -1 if either is empty.
pub fn similarity(previous: &[usize], current: &[usize]) -> f64 {
    if previous.is_empty() || current.is_empty() {
        return -1.0;
    }
    let shared = current.iter().filter(|col| previous.contains(col)).count();
    shared as f64 / previous.len().max(current.len()) as f64
}

/// Mean absolute difference between neighboring values, over the number of values.
fn avg_delta(values: &VecDeque<usize>) -> f64 {
    let sum: usize = values
        .iter()
        .zip(values.iter().skip(1))
        .map(|(&a, &b)| a.abs_diff(b))
        .sum();
    sum as f64 / values.len() as f64
}
