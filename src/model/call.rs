//! Per-call records captured by the recorder and consumed by the replayer.

use serde::{Deserialize, Serialize};

/// Absolute tolerance used when comparing recorded float arguments to live ones.
pub const FLOAT_MATCH_TOLERANCE: f64 = 1e-10;

/// One randomness primitive invocation: method tag, typed arguments, result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PrimitiveCall {
    Float {
        result: f64,
    },
    Int {
        lo: i64,
        hi: i64,
        result: i64,
    },
    Uniform {
        lo: f64,
        hi: f64,
        result: f64,
    },
    Weighted {
        weights: Vec<f64>,
        result: usize,
    },
    Gauss {
        mu: f64,
        sigma: f64,
        result: f64,
    },
}

impl PrimitiveCall {
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Float { .. } => "float",
            Self::Int { .. } => "int",
            Self::Uniform { .. } => "uniform",
            Self::Weighted { .. } => "weighted",
            Self::Gauss { .. } => "gauss",
        }
    }
}

pub fn floats_match(recorded: f64, live: f64) -> bool {
    (recorded - live).abs() <= FLOAT_MATCH_TOLERANCE
}

/// Volatile personality fields captured at call time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PersonalitySnapshot {
    pub chaos_level: u8,
    pub chaos_multiplier: f64,
    pub execution_count: u64,
    pub instability_level: f64,
}

/// Fuzzy construct kinds a randomness call can be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructKind {
    Sometimes,
    Maybe,
    Probably,
    Rarely,
    SoftPrint,
    SometimesWhile,
    MaybeFor,
    FuzzyRepeat,
    EventuallyUntil,
    FuzzyInt,
    FuzzyFloat,
    FuzzyBool,
    FuzzyBinary,
    Approx,
    TimeDrift,
    DirectCall,
}

impl ConstructKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sometimes => "sometimes",
            Self::Maybe => "maybe",
            Self::Probably => "probably",
            Self::Rarely => "rarely",
            Self::SoftPrint => "soft_print",
            Self::SometimesWhile => "sometimes_while",
            Self::MaybeFor => "maybe_for",
            Self::FuzzyRepeat => "fuzzy_repeat",
            Self::EventuallyUntil => "eventually_until",
            Self::FuzzyInt => "fuzzy_int",
            Self::FuzzyFloat => "fuzzy_float",
            Self::FuzzyBool => "fuzzy_bool",
            Self::FuzzyBinary => "fuzzy_binary",
            Self::Approx => "approx",
            Self::TimeDrift => "time_drift",
            Self::DirectCall => "direct_call",
        }
    }

    pub fn impact(self) -> &'static str {
        match self {
            Self::Sometimes => "conditional execution (50% base probability)",
            Self::Maybe => "conditional execution (60% base probability)",
            Self::Probably => "conditional execution (70% base probability)",
            Self::Rarely => "conditional execution (15% base probability)",
            Self::SoftPrint => "probabilistic output (80% base probability)",
            Self::SometimesWhile => "loop continuation decision",
            Self::MaybeFor => "per-item loop execution decision",
            Self::FuzzyRepeat => "fuzzed repetition count",
            Self::EventuallyUntil => "statistical loop termination",
            Self::FuzzyInt => "integer fuzz",
            Self::FuzzyFloat => "float drift",
            Self::FuzzyBool => "boolean uncertainty flip",
            Self::FuzzyBinary => "ternary outcome (yes/no/maybe)",
            Self::Approx => "fuzzy value or comparison",
            Self::TimeDrift => "age-based value perturbation",
            Self::DirectCall => "direct random number generation",
        }
    }
}

/// One entry on the context's construct marker stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructScope {
    pub kind: ConstructKind,
    pub location: Option<String>,
}

impl ConstructScope {
    pub fn new(kind: ConstructKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn at(kind: ConstructKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: Some(location.into()),
        }
    }

    pub fn render(&self) -> String {
        match &self.location {
            Some(loc) => format!("{} @ {loc}", self.kind.name()),
            None => self.kind.name().to_string(),
        }
    }
}

/// Construct attribution stored on a recorded call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructInfo {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub impact: String,
}

impl ConstructInfo {
    /// Attribute a call to the innermost active construct scope, or to a
    /// direct call when no scope is open.
    pub fn from_scope(scope: &[ConstructScope]) -> Self {
        match scope.last() {
            Some(active) => Self {
                kind: active.kind.name().to_string(),
                location: active.location.clone(),
                impact: active.kind.impact().to_string(),
            },
            None => Self {
                kind: ConstructKind::DirectCall.name().to_string(),
                location: None,
                impact: ConstructKind::DirectCall.impact().to_string(),
            },
        }
    }
}

/// Number of scope frames kept on each recorded call.
pub const SCOPE_WINDOW: usize = 10;

/// One recorded randomness invocation with full context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RngCall {
    pub call_id: String,
    pub timestamp_ms: u64,
    pub sequence_number: u64,
    #[serde(flatten)]
    pub primitive: PrimitiveCall,
    pub thread: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
    pub personality: PersonalitySnapshot,
    pub construct: ConstructInfo,
}
