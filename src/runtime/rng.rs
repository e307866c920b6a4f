//! The five-primitive randomness provider boundary.
//!
//! `PersonalityContext` owns exactly one `RandomSource`. The recorder and the
//! replayer are alternate implementations that wrap the live one, so attaching
//! and detaching them is a typed source swap rather than a method rewrite.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore as _, SeedableRng as _};

use crate::{ConstructScope, HavocError, HavocResult, PersonalitySnapshot};

/// Context the owning personality passes into every primitive call. The
/// concrete generator ignores it; the recording wrapper persists it.
#[derive(Debug)]
pub struct CallSite<'a> {
    pub snapshot: PersonalitySnapshot,
    pub scope: &'a [ConstructScope],
}

pub trait RandomSource: std::fmt::Debug + Send {
    fn next_float(&mut self, site: &CallSite<'_>) -> HavocResult<f64>;
    fn next_int(&mut self, lo: i64, hi: i64, site: &CallSite<'_>) -> HavocResult<i64>;
    fn next_uniform(&mut self, lo: f64, hi: f64, site: &CallSite<'_>) -> HavocResult<f64>;
    fn next_weighted(&mut self, weights: &[f64], site: &CallSite<'_>) -> HavocResult<usize>;
    fn next_gauss(&mut self, mu: f64, sigma: f64, site: &CallSite<'_>) -> HavocResult<f64>;

    /// Detach one wrapper layer, returning the wrapped source. Concrete
    /// generators return themselves.
    fn unwrap_inner(self: Box<Self>) -> Box<dyn RandomSource>;
}

pub fn gen_seed() -> u64 {
    let mut seed = [0u8; 8];
    rand_core::OsRng.fill_bytes(&mut seed);
    u64::from_le_bytes(seed)
}

fn expand_seed(seed: u64) -> [u8; 32] {
    let seed_bytes = blake3::hash(&seed.to_le_bytes()).as_bytes().to_owned();
    let mut seed32 = [0u8; 32];
    seed32.copy_from_slice(&seed_bytes[..32]);
    seed32
}

/// The one seeded generator behind every fresh randomness decision.
#[derive(Debug)]
pub struct SeededSource {
    rng: ChaCha20Rng,
}

impl SeededSource {
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(gen_seed);
        Self {
            rng: ChaCha20Rng::from_seed(expand_seed(seed)),
        }
    }

    fn unit(&mut self) -> f64 {
        // 53 significand bits of a u64 draw, uniform in [0, 1).
        (self.rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

impl RandomSource for SeededSource {
    fn next_float(&mut self, _site: &CallSite<'_>) -> HavocResult<f64> {
        Ok(self.unit())
    }

    fn next_int(&mut self, lo: i64, hi: i64, _site: &CallSite<'_>) -> HavocResult<i64> {
        if lo > hi {
            return Err(HavocError::InvalidArgument(format!(
                "empty integer range: lo={lo} hi={hi}"
            )));
        }
        let span = (hi as i128 - lo as i128 + 1) as u128;
        let offset = (u128::from(self.rng.next_u64())) % span;
        Ok((lo as i128 + offset as i128) as i64)
    }

    fn next_uniform(&mut self, lo: f64, hi: f64, _site: &CallSite<'_>) -> HavocResult<f64> {
        Ok(lo + (hi - lo) * self.unit())
    }

    fn next_weighted(&mut self, weights: &[f64], _site: &CallSite<'_>) -> HavocResult<usize> {
        if weights.is_empty() {
            return Err(HavocError::InvalidArgument(
                "cannot choose from an empty weight set".to_string(),
            ));
        }
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(HavocError::InvalidArgument(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(HavocError::InvalidArgument(
                "weights must sum to a positive value".to_string(),
            ));
        }
        let pick = self.unit() * total;
        let mut acc = 0.0;
        for (idx, w) in weights.iter().enumerate() {
            acc += w;
            if pick < acc {
                return Ok(idx);
            }
        }
        Ok(weights.len() - 1)
    }

    fn next_gauss(&mut self, mu: f64, sigma: f64, _site: &CallSite<'_>) -> HavocResult<f64> {
        // Box-Muller transform over the same metered stream.
        let u1 = loop {
            let u = self.unit();
            if u > f64::EPSILON {
                break u;
            }
        };
        let u2 = self.unit();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        Ok(mu + sigma * z)
    }

    fn unwrap_inner(self: Box<Self>) -> Box<dyn RandomSource> {
        self
    }
}

/// Placeholder installed while a wrapper swap is in flight. Never observable
/// by callers; erroring beats silently generating unmetered values.
#[derive(Debug)]
pub(crate) struct DetachedSource;

impl RandomSource for DetachedSource {
    fn next_float(&mut self, _site: &CallSite<'_>) -> HavocResult<f64> {
        Err(detached())
    }

    fn next_int(&mut self, _lo: i64, _hi: i64, _site: &CallSite<'_>) -> HavocResult<i64> {
        Err(detached())
    }

    fn next_uniform(&mut self, _lo: f64, _hi: f64, _site: &CallSite<'_>) -> HavocResult<f64> {
        Err(detached())
    }

    fn next_weighted(&mut self, _weights: &[f64], _site: &CallSite<'_>) -> HavocResult<usize> {
        Err(detached())
    }

    fn next_gauss(&mut self, _mu: f64, _sigma: f64, _site: &CallSite<'_>) -> HavocResult<f64> {
        Err(detached())
    }

    fn unwrap_inner(self: Box<Self>) -> Box<dyn RandomSource> {
        self
    }
}

fn detached() -> HavocError {
    HavocError::Lifecycle("randomness source detached mid-swap".to_string())
}
