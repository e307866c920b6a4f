//! Mood profiles: named bundles of base probabilities and fuzz ranges.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MOOD: &str = "playful";

/// Base keys a probability lookup can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityKey {
    Sometimes,
    Maybe,
    Probably,
    Rarely,
    SoftPrint,
    SometimesWhile,
    MaybeFor,
}

impl ProbabilityKey {
    pub fn base_of(self, profile: &ChaosProfile) -> f64 {
        match self {
            Self::Sometimes => profile.sometimes_base,
            Self::Maybe => profile.maybe_base,
            Self::Probably => profile.probably_base,
            Self::Rarely => profile.rarely_base,
            Self::SoftPrint => profile.soft_print_base,
            Self::SometimesWhile => profile.sometimes_while_base,
            Self::MaybeFor => profile.maybe_for_base,
        }
    }
}

/// Error message tone derived from a profile's snark level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStyle {
    Professional,
    Friendly,
    Snarky,
    Chaotic,
}

/// Immutable chaos configuration for one mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaosProfile {
    // Conditional construct base probabilities
    pub sometimes_base: f64,
    pub maybe_base: f64,
    pub probably_base: f64,
    pub rarely_base: f64,
    pub soft_print_base: f64,

    // Loop continuation probabilities
    pub sometimes_while_base: f64,
    pub maybe_for_base: f64,

    // Repetition variance (stddev as fraction of n)
    pub fuzzy_repeat_variance: f64,

    // Termination confidence threshold for eventually-until loops
    pub eventually_until_confidence: f64,

    // Numeric fuzz ranges
    pub int_fuzz_range: (i64, i64),
    pub float_drift_range: (f64, f64),
    pub approx_variance: f64,
    pub approx_tolerance: f64,

    // Boolean flip probability
    pub bool_uncertainty: f64,

    // Ternary outcome base probabilities
    pub binary_pos_prob: f64,
    pub binary_neg_prob: f64,
    pub binary_neutral_prob: f64,

    // Chaos amplification
    pub chaos_amplifier: f64,
    pub drift_rate: f64,
    pub cascade_strength: f64,

    // Error message tone (0-1)
    pub error_snark_level: f64,
}

impl ChaosProfile {
    pub fn error_style(&self) -> ErrorStyle {
        if self.error_snark_level < 0.3 {
            ErrorStyle::Professional
        } else if self.error_snark_level < 0.6 {
            ErrorStyle::Friendly
        } else if self.error_snark_level < 0.8 {
            ErrorStyle::Snarky
        } else {
            ErrorStyle::Chaotic
        }
    }
}

pub const PROFESSIONAL: ChaosProfile = ChaosProfile {
    sometimes_base: 0.85,
    maybe_base: 0.8,
    probably_base: 0.9,
    rarely_base: 0.1,
    soft_print_base: 0.9,
    sometimes_while_base: 0.8,
    maybe_for_base: 0.85,
    fuzzy_repeat_variance: 0.15,
    eventually_until_confidence: 0.85,
    int_fuzz_range: (-1, 1),
    float_drift_range: (-0.1, 0.1),
    approx_variance: 1.0,
    approx_tolerance: 1.5,
    bool_uncertainty: 0.05,
    binary_pos_prob: 0.6,
    binary_neg_prob: 0.2,
    binary_neutral_prob: 0.2,
    chaos_amplifier: 0.5,
    drift_rate: 0.01,
    cascade_strength: 0.05,
    error_snark_level: 0.2,
};

pub const FRIENDLY: ChaosProfile = ChaosProfile {
    sometimes_base: 0.75,
    maybe_base: 0.7,
    probably_base: 0.8,
    rarely_base: 0.2,
    soft_print_base: 0.85,
    sometimes_while_base: 0.7,
    maybe_for_base: 0.8,
    fuzzy_repeat_variance: 0.25,
    eventually_until_confidence: 0.75,
    int_fuzz_range: (-1, 1),
    float_drift_range: (-0.3, 0.3),
    approx_variance: 1.5,
    approx_tolerance: 2.0,
    bool_uncertainty: 0.08,
    binary_pos_prob: 0.5,
    binary_neg_prob: 0.3,
    binary_neutral_prob: 0.2,
    chaos_amplifier: 0.8,
    drift_rate: 0.03,
    cascade_strength: 0.15,
    error_snark_level: 0.4,
};

pub const SNARKY: ChaosProfile = ChaosProfile {
    sometimes_base: 0.6,
    maybe_base: 0.65,
    probably_base: 0.75,
    rarely_base: 0.1,
    soft_print_base: 0.7,
    sometimes_while_base: 0.65,
    maybe_for_base: 0.7,
    fuzzy_repeat_variance: 0.35,
    eventually_until_confidence: 0.75,
    int_fuzz_range: (-2, 2),
    float_drift_range: (-0.8, 0.8),
    approx_variance: 3.0,
    approx_tolerance: 3.0,
    bool_uncertainty: 0.15,
    binary_pos_prob: 0.3,
    binary_neg_prob: 0.5,
    binary_neutral_prob: 0.2,
    chaos_amplifier: 1.2,
    drift_rate: 0.07,
    cascade_strength: 0.3,
    error_snark_level: 0.7,
};

pub const RELIABLE: ChaosProfile = ChaosProfile {
    sometimes_base: 0.95,
    maybe_base: 0.95,
    probably_base: 0.95,
    rarely_base: 0.85,
    soft_print_base: 0.95,
    sometimes_while_base: 0.90,
    maybe_for_base: 0.95,
    fuzzy_repeat_variance: 0.10,
    eventually_until_confidence: 0.95,
    int_fuzz_range: (0, 0),
    float_drift_range: (0.0, 0.0),
    approx_variance: 0.5,
    approx_tolerance: 1.0,
    bool_uncertainty: 0.02,
    binary_pos_prob: 0.8,
    binary_neg_prob: 0.1,
    binary_neutral_prob: 0.1,
    chaos_amplifier: 0.2,
    drift_rate: 0.0,
    cascade_strength: 0.0,
    error_snark_level: 0.1,
};

pub const CAUTIOUS: ChaosProfile = ChaosProfile {
    sometimes_base: 0.7,
    maybe_base: 0.75,
    probably_base: 0.8,
    rarely_base: 0.25,
    soft_print_base: 0.85,
    sometimes_while_base: 0.75,
    maybe_for_base: 0.85,
    fuzzy_repeat_variance: 0.20,
    eventually_until_confidence: 0.90,
    int_fuzz_range: (-1, 1),
    float_drift_range: (-0.2, 0.2),
    approx_variance: 1.5,
    approx_tolerance: 1.5,
    bool_uncertainty: 0.05,
    binary_pos_prob: 0.5,
    binary_neg_prob: 0.3,
    binary_neutral_prob: 0.2,
    chaos_amplifier: 0.6,
    drift_rate: 0.01,
    cascade_strength: 0.1,
    error_snark_level: 0.3,
};

pub const PLAYFUL: ChaosProfile = ChaosProfile {
    sometimes_base: 0.5,
    maybe_base: 0.6,
    probably_base: 0.7,
    rarely_base: 0.15,
    soft_print_base: 0.8,
    sometimes_while_base: 0.60,
    maybe_for_base: 0.70,
    fuzzy_repeat_variance: 0.30,
    eventually_until_confidence: 0.80,
    int_fuzz_range: (-2, 2),
    float_drift_range: (-0.5, 0.5),
    approx_variance: 2.5,
    approx_tolerance: 2.0,
    bool_uncertainty: 0.1,
    binary_pos_prob: 0.4,
    binary_neg_prob: 0.4,
    binary_neutral_prob: 0.2,
    chaos_amplifier: 1.0,
    drift_rate: 0.05,
    cascade_strength: 0.2,
    error_snark_level: 0.6,
};

pub const CHAOTIC: ChaosProfile = ChaosProfile {
    sometimes_base: 0.3,
    maybe_base: 0.4,
    probably_base: 0.5,
    rarely_base: 0.05,
    soft_print_base: 0.6,
    sometimes_while_base: 0.40,
    maybe_for_base: 0.50,
    fuzzy_repeat_variance: 0.40,
    eventually_until_confidence: 0.70,
    int_fuzz_range: (-5, 5),
    float_drift_range: (-2.0, 2.0),
    approx_variance: 5.0,
    approx_tolerance: 4.0,
    bool_uncertainty: 0.25,
    binary_pos_prob: 0.2,
    binary_neg_prob: 0.6,
    binary_neutral_prob: 0.2,
    chaos_amplifier: 1.8,
    drift_rate: 0.1,
    cascade_strength: 0.5,
    error_snark_level: 0.9,
};

pub const MOOD_NAMES: &[&str] = &[
    "professional",
    "friendly",
    "snarky",
    "reliable",
    "cautious",
    "playful",
    "chaotic",
];

pub fn profile_for(mood: &str) -> Option<&'static ChaosProfile> {
    match mood {
        "professional" => Some(&PROFESSIONAL),
        "friendly" => Some(&FRIENDLY),
        "snarky" => Some(&SNARKY),
        "reliable" => Some(&RELIABLE),
        "cautious" => Some(&CAUTIOUS),
        "playful" => Some(&PLAYFUL),
        "chaotic" => Some(&CHAOTIC),
        _ => None,
    }
}

/// Resolve a mood name to its profile, falling back to the default mood.
/// Returns the normalized name actually used.
pub fn resolve_mood(mood: &str) -> (String, &'static ChaosProfile) {
    let normalized = mood.trim().to_ascii_lowercase();
    match profile_for(&normalized) {
        Some(profile) => (normalized, profile),
        None => {
            tracing::warn!("unknown mood {mood:?}; falling back to {DEFAULT_MOOD}");
            (DEFAULT_MOOD.to_string(), &PLAYFUL)
        }
    }
}
