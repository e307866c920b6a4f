//! Bounded-memory termination evaluator for eventually-until loops.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use std::collections::{HashMap, VecDeque};

const DEFAULT_MAX_HISTORY: usize = 100;
const MIN_SAMPLES: usize = 3;
const RECENT_WINDOW: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorStats {
    pub total: usize,
    pub successes: usize,
    pub success_rate: f64,
}

/// Ring-buffered success/failure history deciding when an eventually-until
/// loop has converged. Terminates on two consecutive successes or a recent
/// success rate of 0.8+, never before three samples.
#[derive(Debug, Clone)]
pub struct EventuallyUntilEvaluator {
    confidence_threshold: f64,
    evaluations: VecDeque<bool>,
    max_history: usize,
}

impl EventuallyUntilEvaluator {
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
            evaluations: VecDeque::with_capacity(DEFAULT_MAX_HISTORY),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Record one evaluation; returns true while the loop should continue.
    pub fn observe(&mut self, result: bool) -> bool {
        if self.evaluations.len() == self.max_history {
            self.evaluations.pop_front();
        }
        self.evaluations.push_back(result);

        let n = self.evaluations.len();
        if n < MIN_SAMPLES {
            return true;
        }

        let consecutive_successes = self
            .evaluations
            .iter()
            .rev()
            .take_while(|ok| **ok)
            .count();

        let window = RECENT_WINDOW.min(n);
        let recent_successes = self
            .evaluations
            .iter()
            .rev()
            .take(window)
            .filter(|ok| **ok)
            .count();
        let recent_success_rate = recent_successes as f64 / window as f64;

        let should_terminate = consecutive_successes >= 2 || recent_success_rate >= 0.8;
        !should_terminate
    }

    pub fn stats(&self) -> EvaluatorStats {
        let total = self.evaluations.len();
        let successes = self.evaluations.iter().filter(|ok| **ok).count();
        EvaluatorStats {
            total,
            successes,
            success_rate: if total > 0 {
                successes as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

static EVALUATORS: Lazy<Mutex<HashMap<String, EventuallyUntilEvaluator>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Feed an evaluation into the keyed registry, creating the evaluator with
/// the process-wide context's confidence threshold on first use.
pub fn evaluator_observe(key: &str, result: bool) -> bool {
    let confidence = crate::with_current(|ctx| ctx.eventually_until_confidence());
    let mut evaluators = EVALUATORS.lock();
    evaluators
        .entry(key.to_string())
        .or_insert_with(|| EventuallyUntilEvaluator::new(confidence))
        .observe(result)
}

/// Drop all registered evaluators; personality changes call this so stale
/// confidence thresholds never leak across contexts.
pub fn clear_evaluators() {
    EVALUATORS.lock().clear();
}
