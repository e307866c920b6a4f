//! Personality context: chaos computation and the single metered randomness source.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    resolve_mood, CallSite, ChaosProfile, ConstructKind, ConstructScope, ErrorStyle, ErrorTracker,
    HavocResult, PersonalitySnapshot, ProbabilityKey, RandomSource, SeededSource,
};

use crate::rng::DetachedSource;

const MIN_CHAOS_LEVEL: u8 = 1;
const MAX_CHAOS_LEVEL: u8 = 10;

/// Seed configuration report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeedInfo {
    pub seed: Option<u64>,
    pub reproducible: bool,
}

#[derive(Debug, Clone)]
struct DriftRecord {
    created: Instant,
    last_access: Instant,
    access_count: u64,
    accumulated_drift: f64,
}

/// Drift bookkeeping for one tracked variable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DriftStats {
    pub age_seconds: f64,
    pub seconds_since_access: f64,
    pub access_count: u64,
    pub accumulated_drift: f64,
}

/// The stateful chaos controller. Owns the one seeded generator every
/// probabilistic decision routes through; reconfiguration always builds a
/// fresh context rather than mutating this one.
#[derive(Debug)]
pub struct PersonalityContext {
    mood: String,
    profile: &'static ChaosProfile,
    chaos_level: u8,
    chaos_multiplier: f64,
    execution_count: u64,
    instability_level: f64,
    drift: BTreeMap<String, DriftRecord>,
    construct_stack: Vec<ConstructScope>,
    seed: Option<u64>,
    source: Box<dyn RandomSource>,
    pub error_tracker: ErrorTracker,
}

impl Default for PersonalityContext {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MOOD, 5, None)
    }
}

impl PersonalityContext {
    pub fn new(mood: &str, chaos_level: u8, seed: Option<u64>) -> Self {
        let (mood, profile) = resolve_mood(mood);
        let chaos_level = clamp_chaos_level(chaos_level);
        Self {
            mood,
            profile,
            chaos_level,
            chaos_multiplier: multiplier_for_level(chaos_level),
            execution_count: 0,
            instability_level: 0.0,
            drift: BTreeMap::new(),
            construct_stack: Vec::new(),
            seed,
            source: Box::new(SeededSource::new(seed)),
            error_tracker: ErrorTracker::default(),
        }
    }

    pub fn mood(&self) -> &str {
        &self.mood
    }

    pub fn profile(&self) -> &'static ChaosProfile {
        self.profile
    }

    pub fn chaos_level(&self) -> u8 {
        self.chaos_level
    }

    pub fn chaos_multiplier(&self) -> f64 {
        self.chaos_multiplier
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    pub fn instability_level(&self) -> f64 {
        self.instability_level
    }

    pub fn seed_info(&self) -> SeedInfo {
        SeedInfo {
            seed: self.seed,
            reproducible: self.seed.is_some(),
        }
    }

    pub fn error_message_style(&self) -> ErrorStyle {
        self.profile.error_style()
    }

    pub fn snapshot(&self) -> PersonalitySnapshot {
        PersonalitySnapshot {
            chaos_level: self.chaos_level,
            chaos_multiplier: self.chaos_multiplier,
            execution_count: self.execution_count,
            instability_level: self.instability_level,
        }
    }

    fn combined_amplifier(&self) -> f64 {
        self.profile.chaos_amplifier * self.chaos_multiplier
    }

    /// Chaos-adjusted probability for a construct key.
    ///
    /// A combined amplifier below 1 pulls the base toward its successful
    /// extreme; above 1 pulls it toward a coin flip. Instability discounts
    /// the result further via the profile's cascade strength.
    pub fn chaos_probability(&self, key: ProbabilityKey) -> f64 {
        let base = key.base_of(self.profile);
        let amplifier = self.combined_amplifier();

        let mut adjusted = if amplifier < 1.0 {
            if base >= 0.5 {
                base + (1.0 - base) * (1.0 - amplifier)
            } else {
                base * amplifier
            }
        } else if base > 0.5 {
            base - (base - 0.5) * (amplifier - 1.0)
        } else {
            base + (0.5 - base) * (amplifier - 1.0)
        };

        if self.instability_level > 0.0 {
            let cascade_impact = self.instability_level * self.profile.cascade_strength;
            adjusted *= 1.0 - cascade_impact;
        }

        adjusted.clamp(0.0, 1.0)
    }

    pub fn fuzz_range(&self) -> (i64, i64) {
        let amplifier = self.combined_amplifier();
        let (lo, hi) = self.profile.int_fuzz_range;
        ((lo as f64 * amplifier) as i64, (hi as f64 * amplifier) as i64)
    }

    pub fn float_drift_range(&self) -> (f64, f64) {
        let amplifier = self.combined_amplifier();
        let (lo, hi) = self.profile.float_drift_range;
        (lo * amplifier, hi * amplifier)
    }

    pub fn approx_variance(&self) -> f64 {
        self.profile.approx_variance * self.combined_amplifier()
    }

    pub fn approx_tolerance(&self) -> f64 {
        self.profile.approx_tolerance * self.combined_amplifier()
    }

    pub fn bool_uncertainty(&self) -> f64 {
        let mut uncertainty = self.profile.bool_uncertainty * self.combined_amplifier();
        if self.instability_level > 0.1 {
            uncertainty += self.instability_level * 0.1;
        }
        uncertainty.clamp(0.0, 0.5)
    }

    /// Chaos-adjusted (positive, negative, neutral) outcome probabilities,
    /// renormalized so the three always sum to 1.
    pub fn binary_probabilities(&self) -> (f64, f64, f64) {
        let mut pos = self.profile.binary_pos_prob;
        let mut neg = self.profile.binary_neg_prob;
        let mut neutral = self.profile.binary_neutral_prob;

        let amplifier = self.combined_amplifier();
        if amplifier > 1.0 {
            // More chaotic: push toward the extremes.
            let factor = amplifier - 1.0;
            pos *= 1.0 + factor * 0.5;
            neg *= 1.0 + factor * 0.5;
            neutral *= 1.0 - factor * 0.5;
        } else if amplifier < 1.0 {
            // More reliable: balance toward neutral.
            let factor = 1.0 - amplifier;
            pos += (neutral - pos) * factor * 0.3;
            neg += (neutral - neg) * factor * 0.3;
        }

        // Extreme amplifiers can drive the neutral weight negative; floor
        // each component before renormalizing so the sum-to-1 invariant holds.
        pos = pos.max(0.0);
        neg = neg.max(0.0);
        neutral = neutral.max(0.0);

        let total = pos + neg + neutral;
        if total > 0.0 {
            (pos / total, neg / total, neutral / total)
        } else {
            (pos, neg, neutral)
        }
    }

    pub fn fuzzy_repeat_variance(&self) -> f64 {
        self.profile.fuzzy_repeat_variance * self.combined_amplifier()
    }

    /// Confidence threshold for eventually-until termination: chaos lowers it
    /// (terminate earlier), reliability raises it, clamped to [0.5, 0.99].
    pub fn eventually_until_confidence(&self) -> f64 {
        let base = self.profile.eventually_until_confidence;
        let amplifier = self.combined_amplifier();
        let adjusted = if amplifier > 1.0 {
            base - ((amplifier - 1.0) * 0.2).min(0.3)
        } else {
            base + (1.0 - amplifier) * 0.1
        };
        adjusted.clamp(0.5, 0.99)
    }

    pub fn update_instability(&mut self, failed: bool) {
        if failed {
            self.instability_level += 0.1 * self.profile.cascade_strength;
        } else {
            // Stability slowly recovers.
            self.instability_level *= 0.95;
        }
        self.instability_level = self.instability_level.clamp(0.0, 1.0);
    }

    pub fn note_execution(&mut self) {
        self.execution_count = self.execution_count.saturating_add(1);
    }

    /// Combined instability + execution bookkeeping; never fails.
    pub fn update_chaos_state(&mut self, failed: bool) {
        self.update_instability(failed);
        self.note_execution();
    }

    // --- time-based drift ---

    pub fn register_variable(&mut self, name: &str, _initial_value: f64) {
        let now = Instant::now();
        self.drift.insert(
            name.to_string(),
            DriftRecord {
                created: now,
                last_access: now,
                access_count: 0,
                accumulated_drift: 0.0,
            },
        );
    }

    /// Age-, usage-, and recency-driven perturbation for a tracked variable,
    /// sampled through the metered generator. Unregistered names never drift.
    pub fn time_drift(&mut self, name: &str, current_value: f64) -> HavocResult<f64> {
        let now = Instant::now();
        let (age_seconds, idle_seconds, access_count) = {
            let Some(record) = self.drift.get_mut(name) else {
                return Ok(0.0);
            };
            let age = now.duration_since(record.created).as_secs_f64();
            let idle = now.duration_since(record.last_access).as_secs_f64();
            record.access_count = record.access_count.saturating_add(1);
            record.last_access = now;
            (age, idle, record.access_count)
        };

        let base_rate = self.profile.drift_rate;
        if base_rate <= 0.0 {
            return Ok(0.0);
        }

        // Each factor is capped so long-lived, hot variables plateau.
        let age_factor = (age_seconds / 1000.0).min(1.0);
        let usage_factor = (access_count as f64 / 100.0).min(1.0);
        let recency_factor = (10.0 / (idle_seconds + 1.0)).clamp(0.1, 1.0);

        let mut magnitude = base_rate * (age_factor + usage_factor + recency_factor) / 3.0;
        magnitude *= self.combined_amplifier();

        let value_magnitude = current_value.abs().max(1.0);
        let max_drift = (magnitude * value_magnitude * 0.1).max(0.01);

        self.push_construct(ConstructScope::new(ConstructKind::TimeDrift));
        let sampled = self.chaos_uniform(-max_drift, max_drift);
        self.pop_construct();
        let drift = sampled?;

        if let Some(record) = self.drift.get_mut(name) {
            record.accumulated_drift += drift.abs();
        }
        Ok(drift)
    }

    pub fn variable_age(&self, name: &str) -> f64 {
        self.drift
            .get(name)
            .map(|r| r.created.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    pub fn drift_stats(&self, name: &str) -> Option<DriftStats> {
        self.drift.get(name).map(|r| DriftStats {
            age_seconds: r.created.elapsed().as_secs_f64(),
            seconds_since_access: r.last_access.elapsed().as_secs_f64(),
            access_count: r.access_count,
            accumulated_drift: r.accumulated_drift,
        })
    }

    pub fn reset_variable_drift(&mut self, name: &str) {
        if let Some(record) = self.drift.get_mut(name) {
            let now = Instant::now();
            record.created = now;
            record.last_access = now;
            record.access_count = 0;
            record.accumulated_drift = 0.0;
        }
    }

    // --- construct scope markers ---

    pub fn push_construct(&mut self, scope: ConstructScope) {
        self.construct_stack.push(scope);
    }

    pub fn pop_construct(&mut self) -> Option<ConstructScope> {
        self.construct_stack.pop()
    }

    pub fn construct_scope(&self) -> &[ConstructScope] {
        &self.construct_stack
    }

    // --- randomness primitives ---
    //
    // Every randomness-consuming decision in the engine funnels through these
    // five calls; that is the invariant record/replay depends on.

    /// Uniform float in [0, 1).
    pub fn chaos_float(&mut self) -> HavocResult<f64> {
        let snapshot = self.snapshot();
        self.source.next_float(&CallSite {
            snapshot,
            scope: &self.construct_stack,
        })
    }

    /// Integer in the inclusive range [lo, hi].
    pub fn chaos_int(&mut self, lo: i64, hi: i64) -> HavocResult<i64> {
        let snapshot = self.snapshot();
        self.source.next_int(
            lo,
            hi,
            &CallSite {
                snapshot,
                scope: &self.construct_stack,
            },
        )
    }

    /// Uniform float between lo and hi.
    pub fn chaos_uniform(&mut self, lo: f64, hi: f64) -> HavocResult<f64> {
        let snapshot = self.snapshot();
        self.source.next_uniform(
            lo,
            hi,
            &CallSite {
                snapshot,
                scope: &self.construct_stack,
            },
        )
    }

    /// Index drawn proportionally to the given weights.
    pub fn chaos_weighted(&mut self, weights: &[f64]) -> HavocResult<usize> {
        let snapshot = self.snapshot();
        self.source.next_weighted(
            weights,
            &CallSite {
                snapshot,
                scope: &self.construct_stack,
            },
        )
    }

    /// Gaussian sample with the given mean and standard deviation.
    pub fn chaos_gauss(&mut self, mu: f64, sigma: f64) -> HavocResult<f64> {
        let snapshot = self.snapshot();
        self.source.next_gauss(
            mu,
            sigma,
            &CallSite {
                snapshot,
                scope: &self.construct_stack,
            },
        )
    }

    // --- source swapping (recorder/replayer boundary) ---

    pub(crate) fn wrap_source(
        &mut self,
        wrap: impl FnOnce(Box<dyn RandomSource>) -> Box<dyn RandomSource>,
    ) {
        let inner = std::mem::replace(&mut self.source, Box::new(DetachedSource));
        self.source = wrap(inner);
    }

    pub(crate) fn unwrap_source(&mut self) {
        let wrapper = std::mem::replace(&mut self.source, Box::new(DetachedSource));
        self.source = wrapper.unwrap_inner();
    }
}

fn clamp_chaos_level(level: u8) -> u8 {
    if (MIN_CHAOS_LEVEL..=MAX_CHAOS_LEVEL).contains(&level) {
        level
    } else {
        let clamped = level.clamp(MIN_CHAOS_LEVEL, MAX_CHAOS_LEVEL);
        tracing::warn!("chaos level {level} out of range; clamping to {clamped}");
        clamped
    }
}

/// Level-to-multiplier mapping: five linear segments with the default level 5
/// sitting exactly at the neutral multiplier 1.0.
pub fn multiplier_for_level(level: u8) -> f64 {
    let level = clamp_chaos_level(level);
    let l = f64::from(level);
    match level {
        1..=2 => 0.2 + (l - 1.0) * 0.2,
        3..=4 => 0.6 + (l - 3.0) * 0.2,
        5..=6 => 1.0 + (l - 5.0) * 0.4,
        7..=8 => 1.6 + (l - 7.0) * 0.2,
        _ => 2.0 + (l - 9.0) * 0.2,
    }
}

// --- process-wide slot ---

static CURRENT: Lazy<Mutex<Option<Arc<Mutex<PersonalityContext>>>>> =
    Lazy::new(|| Mutex::new(None));

/// Install a context as the process-wide current one, replacing any previous.
pub fn install(ctx: PersonalityContext) -> Arc<Mutex<PersonalityContext>> {
    let handle = Arc::new(Mutex::new(ctx));
    *CURRENT.lock() = Some(Arc::clone(&handle));
    handle
}

/// Get the process-wide context, creating a default one on first use.
pub fn current() -> Arc<Mutex<PersonalityContext>> {
    let mut slot = CURRENT.lock();
    match slot.as_ref() {
        Some(handle) => Arc::clone(handle),
        None => {
            let handle = Arc::new(Mutex::new(PersonalityContext::default()));
            *slot = Some(Arc::clone(&handle));
            handle
        }
    }
}

/// Drop the process-wide context. Outstanding handles keep working; the next
/// `current()` call creates a fresh default.
pub fn teardown() {
    CURRENT.lock().take();
}

pub fn with_current<R>(f: impl FnOnce(&mut PersonalityContext) -> R) -> R {
    let handle = current();
    let mut ctx = handle.lock();
    f(&mut ctx)
}

/// Switch the process-wide mood, rebuilding the context wholesale and
/// carrying the current chaos level and seed.
pub fn set_mood(mood: &str) {
    with_current(|ctx| {
        let (level, seed) = (ctx.chaos_level(), ctx.seed());
        *ctx = PersonalityContext::new(mood, level, seed);
    });
    crate::clear_evaluators();
}

/// Switch the process-wide chaos level, rebuilding the context wholesale.
pub fn set_chaos_level(level: u8) {
    with_current(|ctx| {
        let (mood, seed) = (ctx.mood().to_string(), ctx.seed());
        *ctx = PersonalityContext::new(&mood, level, seed);
    });
    crate::clear_evaluators();
}

/// Switch the process-wide seed, rebuilding the context wholesale.
pub fn set_seed(seed: Option<u64>) {
    with_current(|ctx| {
        let (mood, level) = (ctx.mood().to_string(), ctx.chaos_level());
        *ctx = PersonalityContext::new(&mood, level, seed);
    });
    crate::clear_evaluators();
}

/// Feed a success/failure signal into the process-wide context.
pub fn update_chaos_state(failed: bool) {
    with_current(|ctx| ctx.update_chaos_state(failed));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MOOD_NAMES;

    #[test]
    fn default_level_is_neutral() {
        assert_eq!(multiplier_for_level(5), 1.0);
    }

    #[test]
    fn multiplier_is_monotonic_over_levels() {
        let values: Vec<f64> = (1..=10).map(multiplier_for_level).collect();
        assert_eq!(values[0], 0.2);
        assert_eq!(values[9], 2.2);
        for pair in values.windows(2) {
            assert!(pair[0] < pair[1], "multiplier not increasing: {values:?}");
        }
    }

    #[test]
    fn out_of_range_level_clamps() {
        let low = PersonalityContext::new("playful", 0, None);
        let high = PersonalityContext::new("playful", 99, None);
        assert_eq!(low.chaos_level(), 1);
        assert_eq!(high.chaos_level(), 10);
    }

    #[test]
    fn probability_stays_in_bounds_for_all_moods_and_levels() {
        let keys = [
            ProbabilityKey::Sometimes,
            ProbabilityKey::Maybe,
            ProbabilityKey::Probably,
            ProbabilityKey::Rarely,
            ProbabilityKey::SoftPrint,
            ProbabilityKey::SometimesWhile,
            ProbabilityKey::MaybeFor,
        ];
        for mood in MOOD_NAMES {
            for level in 1..=10 {
                let ctx = PersonalityContext::new(mood, level, Some(1));
                for key in keys {
                    let p = ctx.chaos_probability(key);
                    assert!(
                        (0.0..=1.0).contains(&p),
                        "{mood} level {level} {key:?} -> {p}"
                    );
                }
            }
        }
    }

    #[test]
    fn low_amplifier_pulls_toward_success_extreme() {
        // reliable at level 1: combined amplifier well below 1, high base rises.
        let ctx = PersonalityContext::new("reliable", 1, Some(1));
        let base = ctx.profile().probably_base;
        assert!(ctx.chaos_probability(ProbabilityKey::Probably) > base);

        // professional's rarely sits below 0.5, so it gets pulled lower.
        let ctx = PersonalityContext::new("professional", 1, Some(1));
        let rare_base = ctx.profile().rarely_base;
        assert!(ctx.chaos_probability(ProbabilityKey::Rarely) < rare_base);
    }

    #[test]
    fn high_amplifier_pulls_toward_coin_flip() {
        let calm = PersonalityContext::new("playful", 5, Some(1));
        let wild = PersonalityContext::new("playful", 10, Some(1));
        let calm_p = calm.chaos_probability(ProbabilityKey::Probably);
        let wild_p = wild.chaos_probability(ProbabilityKey::Probably);
        assert!((wild_p - 0.5).abs() < (calm_p - 0.5).abs());

        let calm_r = calm.chaos_probability(ProbabilityKey::Rarely);
        let wild_r = wild.chaos_probability(ProbabilityKey::Rarely);
        assert!((wild_r - 0.5).abs() < (calm_r - 0.5).abs());
    }

    #[test]
    fn reliable_level_one_contexts_agree_and_stay_high() {
        let a = PersonalityContext::new("reliable", 1, Some(7));
        let b = PersonalityContext::new("reliable", 1, Some(7));
        let pa = a.chaos_probability(ProbabilityKey::Sometimes);
        let pb = b.chaos_probability(ProbabilityKey::Sometimes);
        assert_eq!(pa, pb);
        assert!(pa >= 0.5);
    }

    #[test]
    fn binary_probabilities_sum_to_one_everywhere() {
        for mood in MOOD_NAMES {
            for level in 1..=10 {
                let ctx = PersonalityContext::new(mood, level, Some(1));
                let (pos, neg, neutral) = ctx.binary_probabilities();
                assert!(pos >= 0.0 && neg >= 0.0 && neutral >= 0.0);
                let total = pos + neg + neutral;
                assert!(
                    (total - 1.0).abs() < 1e-9,
                    "{mood} level {level} sums to {total}"
                );
            }
        }
    }

    #[test]
    fn instability_rises_on_failure_and_decays_on_success() {
        let mut ctx = PersonalityContext::new("chaotic", 5, Some(1));
        assert_eq!(ctx.instability_level(), 0.0);
        ctx.update_instability(true);
        let after_failure = ctx.instability_level();
        assert!(after_failure > 0.0);
        ctx.update_instability(false);
        assert!(ctx.instability_level() < after_failure);

        for _ in 0..1000 {
            ctx.update_instability(true);
        }
        assert!(ctx.instability_level() <= 1.0);
    }

    #[test]
    fn context_owns_its_error_tracker() {
        let mut ctx = PersonalityContext::new("playful", 5, Some(1));
        ctx.error_tracker
            .record("fuzzy_int", "fuzz out of range", "n=7", true)
            .expect("warning mode never fails");
        assert_eq!(ctx.error_tracker.errors().len(), 1);
        ctx.update_chaos_state(true);
        assert!(ctx.instability_level() > 0.0);
    }

    #[test]
    fn instability_discounts_probability() {
        let mut ctx = PersonalityContext::new("chaotic", 5, Some(1));
        let before = ctx.chaos_probability(ProbabilityKey::Probably);
        for _ in 0..10 {
            ctx.update_instability(true);
        }
        assert!(ctx.chaos_probability(ProbabilityKey::Probably) < before);
    }

    #[test]
    fn bool_uncertainty_clamps_to_half() {
        let mut ctx = PersonalityContext::new("chaotic", 10, Some(1));
        for _ in 0..50 {
            ctx.update_instability(true);
        }
        let u = ctx.bool_uncertainty();
        assert!((0.0..=0.5).contains(&u));
    }

    #[test]
    fn construct_scope_stack_pushes_and_pops() {
        let mut ctx = PersonalityContext::new("playful", 5, Some(1));
        assert!(ctx.construct_scope().is_empty());
        ctx.push_construct(ConstructScope::new(ConstructKind::Sometimes));
        ctx.push_construct(ConstructScope::at(ConstructKind::FuzzyInt, "demo.hvc:4"));
        assert_eq!(ctx.construct_scope().len(), 2);
        let popped = ctx.pop_construct().expect("inner scope");
        assert_eq!(popped.kind, ConstructKind::FuzzyInt);
        assert_eq!(ctx.construct_scope().len(), 1);
    }

    #[test]
    fn same_seed_contexts_produce_identical_sequences() {
        let mut a = PersonalityContext::new("playful", 5, Some(42));
        let mut b = PersonalityContext::new("playful", 5, Some(42));
        for _ in 0..10 {
            assert_eq!(a.chaos_float().unwrap(), b.chaos_float().unwrap());
            assert_eq!(a.chaos_int(0, 100).unwrap(), b.chaos_int(0, 100).unwrap());
            assert_eq!(
                a.chaos_gauss(0.0, 1.0).unwrap(),
                b.chaos_gauss(0.0, 1.0).unwrap()
            );
        }
    }

    #[test]
    fn unregistered_variable_never_drifts() {
        let mut ctx = PersonalityContext::new("playful", 5, Some(3));
        assert_eq!(ctx.time_drift("ghost", 10.0).unwrap(), 0.0);
        assert_eq!(ctx.variable_age("ghost"), 0.0);
        assert!(ctx.drift_stats("ghost").is_none());
    }

    #[test]
    fn zero_drift_rate_mood_never_drifts() {
        let mut ctx = PersonalityContext::new("reliable", 5, Some(3));
        ctx.register_variable("steady", 10.0);
        assert_eq!(ctx.time_drift("steady", 10.0).unwrap(), 0.0);
    }

    #[test]
    fn registered_variable_accumulates_and_resets() {
        let mut ctx = PersonalityContext::new("chaotic", 8, Some(3));
        ctx.register_variable("hot", 100.0);
        let mut total = 0.0;
        for _ in 0..20 {
            total += ctx.time_drift("hot", 100.0).unwrap().abs();
        }
        assert!(total > 0.0, "chaotic drift should perturb");
        let stats = ctx.drift_stats("hot").expect("stats");
        assert_eq!(stats.access_count, 20);
        assert!(stats.accumulated_drift > 0.0);

        ctx.reset_variable_drift("hot");
        let stats = ctx.drift_stats("hot").expect("stats");
        assert_eq!(stats.access_count, 0);
        assert_eq!(stats.accumulated_drift, 0.0);
    }

    #[test]
    fn ranges_scale_with_the_combined_amplifier() {
        let calm = PersonalityContext::new("playful", 1, Some(1));
        let wild = PersonalityContext::new("playful", 10, Some(1));
        assert!(wild.approx_variance() > calm.approx_variance());
        assert!(wild.approx_tolerance() > calm.approx_tolerance());
        assert!(wild.fuzzy_repeat_variance() > calm.fuzzy_repeat_variance());

        let (calm_lo, calm_hi) = calm.float_drift_range();
        let (wild_lo, wild_hi) = wild.float_drift_range();
        assert!(wild_hi > calm_hi && wild_lo < calm_lo);

        // (-2, 2) at amplifier 2.2 widens; at 0.2 it truncates to nothing.
        assert_eq!(wild.fuzz_range(), (-4, 4));
        assert_eq!(calm.fuzz_range(), (0, 0));
    }

    #[test]
    fn seed_info_reports_reproducibility() {
        let seeded = PersonalityContext::new("playful", 5, Some(5));
        assert_eq!(
            seeded.seed_info(),
            SeedInfo {
                seed: Some(5),
                reproducible: true
            }
        );
        assert!(!PersonalityContext::new("playful", 5, None)
            .seed_info()
            .reproducible);
        assert_eq!(seeded.error_message_style(), ErrorStyle::Snarky);
    }

    #[test]
    fn eventually_until_confidence_stays_bounded() {
        for mood in MOOD_NAMES {
            for level in 1..=10 {
                let ctx = PersonalityContext::new(mood, level, Some(1));
                let c = ctx.eventually_until_confidence();
                assert!((0.5..=0.99).contains(&c), "{mood} level {level} -> {c}");
            }
        }
    }

    #[test]
    fn slot_lifecycle_rebuilds_wholesale() {
        let _handle = install(PersonalityContext::new("cautious", 3, Some(9)));
        with_current(|ctx| ctx.note_execution());
        set_mood("snarky");
        with_current(|ctx| {
            assert_eq!(ctx.mood(), "snarky");
            assert_eq!(ctx.chaos_level(), 3);
            assert_eq!(ctx.seed(), Some(9));
            // Counters do not survive reconstruction.
            assert_eq!(ctx.execution_count(), 0);
        });
        set_chaos_level(7);
        with_current(|ctx| {
            assert_eq!(ctx.mood(), "snarky");
            assert_eq!(ctx.chaos_level(), 7);
        });
        teardown();
    }
}
