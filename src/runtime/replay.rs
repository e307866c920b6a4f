//! Replay engine: substitutes recorded results for fresh randomness.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use std::path::Path;
use std::sync::Arc;

use crate::{
    floats_match, CallSite, HavocError, HavocResult, PersonalityContext, PrimitiveCall,
    RandomSource, RecordingSession, RngCall,
};

/// One audited divergence between a live call and its recorded counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplayMismatch {
    pub sequence_number: u64,
    pub method: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub session_id: String,
    pub total_calls: usize,
    pub calls_replayed: usize,
    pub success_rate: f64,
    pub mismatches: Vec<ReplayMismatch>,
    pub replay_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStatus {
    Idle,
    Replaying,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayProgress {
    pub status: ReplayStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub current_call: usize,
    pub total_calls: usize,
    pub progress_percent: f64,
    pub mismatches: usize,
}

#[derive(Debug)]
struct ReplayBook {
    session: RecordingSession,
    replaying: bool,
    cursor: usize,
    mismatches: Vec<ReplayMismatch>,
}

/// Drives a fresh execution from a recorded session, returning each recorded
/// result in sequence and auditing divergence between live and recorded calls.
#[derive(Debug)]
pub struct ReplayEngine {
    book: Arc<Mutex<ReplayBook>>,
}

impl ReplayEngine {
    pub fn new(session: RecordingSession) -> Self {
        Self {
            book: Arc::new(Mutex::new(ReplayBook {
                session,
                replaying: false,
                cursor: 0,
                mismatches: Vec::new(),
            })),
        }
    }

    pub fn from_path(path: &Path) -> HavocResult<Self> {
        Ok(Self::new(RecordingSession::read_json(path)?))
    }

    pub fn is_replaying(&self) -> bool {
        self.book.lock().replaying
    }

    /// Begin replay: rebuild the context from the session's initial snapshot
    /// and install the replaying source.
    pub fn start_replay(&self, ctx: &mut PersonalityContext) -> HavocResult<String> {
        let mut book = self.book.lock();
        if book.replaying {
            return Err(HavocError::Lifecycle(
                "replay already in progress; stop the current replay first".to_string(),
            ));
        }
        let initial = book.session.initial_personality.clone();
        let session_id = book.session.session_id.clone();
        book.replaying = true;
        book.cursor = 0;
        book.mismatches.clear();
        drop(book);

        *ctx = PersonalityContext::new(&initial.mood, initial.chaos_level, initial.seed);
        let shared = Arc::clone(&self.book);
        ctx.wrap_source(move |inner| Box::new(ReplaySource { inner, book: shared }));
        tracing::debug!("replay of session {session_id} started");
        Ok(session_id)
    }

    /// Stop replay, restore the original source, and report what happened.
    pub fn stop_replay(&self, ctx: &mut PersonalityContext) -> HavocResult<ReplaySummary> {
        let mut book = self.book.lock();
        if !book.replaying {
            return Err(HavocError::Lifecycle(
                "no replay session in progress".to_string(),
            ));
        }
        book.replaying = false;
        let total_calls = book.session.calls.len();
        let calls_replayed = book.cursor;
        let summary = ReplaySummary {
            session_id: book.session.session_id.clone(),
            total_calls,
            calls_replayed,
            success_rate: if total_calls > 0 {
                calls_replayed as f64 / total_calls as f64 * 100.0
            } else {
                100.0
            },
            mismatches: book.mismatches.clone(),
            replay_complete: calls_replayed == total_calls,
        };
        drop(book);

        ctx.unwrap_source();
        Ok(summary)
    }

    /// Point-in-time replay position; callable from any thread.
    pub fn replay_progress(&self) -> ReplayProgress {
        let book = self.book.lock();
        if !book.replaying {
            return ReplayProgress {
                status: ReplayStatus::Idle,
                session_id: None,
                current_call: 0,
                total_calls: 0,
                progress_percent: 0.0,
                mismatches: book.mismatches.len(),
            };
        }
        let total_calls = book.session.calls.len();
        ReplayProgress {
            status: ReplayStatus::Replaying,
            session_id: Some(book.session.session_id.clone()),
            current_call: book.cursor,
            total_calls,
            progress_percent: if total_calls > 0 {
                book.cursor as f64 / total_calls as f64 * 100.0
            } else {
                100.0
            },
            mismatches: book.mismatches.len(),
        }
    }
}

/// Wrapper source installed during replay. Never touches the inner generator;
/// it exists only so stopping restores the exact original source.
#[derive(Debug)]
struct ReplaySource {
    inner: Box<dyn RandomSource>,
    book: Arc<Mutex<ReplayBook>>,
}

impl ReplaySource {
    /// Consume the next recorded call, in strict sequence order. Running past
    /// the end of the log is a hard failure, never fresh randomness.
    fn advance(&self, live_method: &str) -> HavocResult<RngCall> {
        let mut book = self.book.lock();
        if !book.replaying {
            return Err(HavocError::Lifecycle(
                "replay source called outside an active replay".to_string(),
            ));
        }
        if book.cursor >= book.session.calls.len() {
            return Err(HavocError::Replay(format!(
                "replay exhausted: live {live_method} call has no recorded counterpart \
                 (all {} recorded calls consumed)",
                book.session.calls.len()
            )));
        }
        let call = book.session.calls[book.cursor].clone();
        book.cursor += 1;
        Ok(call)
    }

    fn note_mismatch(&self, sequence_number: u64, method: &str, message: String) {
        self.book.lock().mismatches.push(ReplayMismatch {
            sequence_number,
            method: method.to_string(),
            message,
        });
    }

    /// Recorded and live calls target different primitives. Typed results
    /// cannot cross methods, so this divergence is fatal.
    fn method_divergence(
        &self,
        sequence_number: u64,
        live_method: &str,
        recorded: &PrimitiveCall,
    ) -> HavocError {
        let message = format!(
            "replay diverged at call {sequence_number}: recorded {}, live {live_method}",
            recorded.method_name()
        );
        self.note_mismatch(sequence_number, live_method, message.clone());
        HavocError::Replay(message)
    }
}

impl RandomSource for ReplaySource {
    fn next_float(&mut self, _site: &CallSite<'_>) -> HavocResult<f64> {
        let call = self.advance("float")?;
        match call.primitive {
            PrimitiveCall::Float { result } => Ok(result),
            other => Err(self.method_divergence(call.sequence_number, "float", &other)),
        }
    }

    fn next_int(&mut self, lo: i64, hi: i64, _site: &CallSite<'_>) -> HavocResult<i64> {
        let call = self.advance("int")?;
        match call.primitive {
            PrimitiveCall::Int {
                lo: rec_lo,
                hi: rec_hi,
                result,
            } => {
                if rec_lo != lo || rec_hi != hi {
                    self.note_mismatch(
                        call.sequence_number,
                        "int",
                        format!(
                            "argument mismatch: recorded bounds ({rec_lo}, {rec_hi}), \
                             live bounds ({lo}, {hi})"
                        ),
                    );
                }
                Ok(result)
            }
            other => Err(self.method_divergence(call.sequence_number, "int", &other)),
        }
    }

    fn next_uniform(&mut self, lo: f64, hi: f64, _site: &CallSite<'_>) -> HavocResult<f64> {
        let call = self.advance("uniform")?;
        match call.primitive {
            PrimitiveCall::Uniform {
                lo: rec_lo,
                hi: rec_hi,
                result,
            } => {
                if !floats_match(rec_lo, lo) || !floats_match(rec_hi, hi) {
                    self.note_mismatch(
                        call.sequence_number,
                        "uniform",
                        format!(
                            "argument mismatch: recorded bounds ({rec_lo}, {rec_hi}), \
                             live bounds ({lo}, {hi})"
                        ),
                    );
                }
                Ok(result)
            }
            other => Err(self.method_divergence(call.sequence_number, "uniform", &other)),
        }
    }

    fn next_weighted(&mut self, weights: &[f64], _site: &CallSite<'_>) -> HavocResult<usize> {
        let call = self.advance("weighted")?;
        match call.primitive {
            PrimitiveCall::Weighted {
                weights: rec_weights,
                result,
            } => {
                let matches = rec_weights.len() == weights.len()
                    && rec_weights
                        .iter()
                        .zip(weights)
                        .all(|(r, l)| floats_match(*r, *l));
                if !matches {
                    self.note_mismatch(
                        call.sequence_number,
                        "weighted",
                        format!(
                            "argument mismatch: recorded weights {rec_weights:?}, \
                             live weights {weights:?}"
                        ),
                    );
                }
                Ok(result)
            }
            other => Err(self.method_divergence(call.sequence_number, "weighted", &other)),
        }
    }

    fn next_gauss(&mut self, mu: f64, sigma: f64, _site: &CallSite<'_>) -> HavocResult<f64> {
        let call = self.advance("gauss")?;
        match call.primitive {
            PrimitiveCall::Gauss {
                mu: rec_mu,
                sigma: rec_sigma,
                result,
            } => {
                if !floats_match(rec_mu, mu) || !floats_match(rec_sigma, sigma) {
                    self.note_mismatch(
                        call.sequence_number,
                        "gauss",
                        format!(
                            "argument mismatch: recorded (mu={rec_mu}, sigma={rec_sigma}), \
                             live (mu={mu}, sigma={sigma})"
                        ),
                    );
                }
                Ok(result)
            }
            other => Err(self.method_divergence(call.sequence_number, "gauss", &other)),
        }
    }

    fn unwrap_inner(self: Box<Self>) -> Box<dyn RandomSource> {
        self.inner
    }
}
