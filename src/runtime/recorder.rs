//! Execution recorder: captures every randomness decision into a session log.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    epoch_millis, wall_time_iso_utc, CallSite, ConstructInfo, HavocError, HavocResult,
    InitialPersonality, PersonalityContext, PrimitiveCall, RandomSource, RecordingSession,
    RngCall, SCOPE_WINDOW,
};

#[derive(Debug)]
struct RecorderBook {
    recording: bool,
    session: Option<RecordingSession>,
    sequence: u64,
    started: Option<Instant>,
}

/// Records the context's randomness calls for exact replay debugging.
///
/// Attaching swaps the context's `RandomSource` for a wrapper that invokes
/// the original first and then logs the call; results are never altered.
#[derive(Debug)]
pub struct ExecutionRecorder {
    output_path: Option<PathBuf>,
    book: Arc<Mutex<RecorderBook>>,
}

impl Default for ExecutionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionRecorder {
    pub fn new() -> Self {
        Self {
            output_path: None,
            book: Arc::new(Mutex::new(RecorderBook {
                recording: false,
                session: None,
                sequence: 0,
                started: None,
            })),
        }
    }

    pub fn with_output_path(path: PathBuf) -> Self {
        let mut recorder = Self::new();
        recorder.output_path = Some(path);
        recorder
    }

    pub fn set_output_path(&mut self, path: Option<PathBuf>) {
        self.output_path = path;
    }

    pub fn is_recording(&self) -> bool {
        self.book.lock().recording
    }

    /// Begin a recording session on the given context.
    ///
    /// Fails fast if this recorder already has an active session.
    pub fn start_recording(
        &self,
        ctx: &mut PersonalityContext,
        input: &str,
        command_line: &[String],
    ) -> HavocResult<String> {
        let mut book = self.book.lock();
        if book.recording {
            return Err(HavocError::Lifecycle(
                "recording already in progress; stop the current session first".to_string(),
            ));
        }

        let session_id = Uuid::new_v4().to_string();
        let initial = InitialPersonality {
            mood: ctx.mood().to_string(),
            chaos_level: ctx.chaos_level(),
            chaos_multiplier: ctx.chaos_multiplier(),
            seed: ctx.seed(),
            reproducible: ctx.seed().is_some(),
            execution_count: ctx.execution_count(),
            instability_level: ctx.instability_level(),
        };
        book.session = Some(RecordingSession::new(
            session_id.clone(),
            input.to_string(),
            command_line.to_vec(),
            initial,
        ));
        book.recording = true;
        book.sequence = 0;
        book.started = Some(Instant::now());
        drop(book);

        let shared = Arc::clone(&self.book);
        ctx.wrap_source(move |inner| Box::new(RecordingSource { inner, book: shared }));
        tracing::debug!("recording session {session_id} started");
        Ok(session_id)
    }

    /// Stop recording, restore the original randomness source, and return the
    /// frozen session. Persists it when an output path is configured.
    pub fn stop_recording(
        &self,
        ctx: &mut PersonalityContext,
    ) -> HavocResult<RecordingSession> {
        let mut book = self.book.lock();
        if !book.recording {
            return Err(HavocError::Lifecycle(
                "no recording session in progress".to_string(),
            ));
        }
        book.recording = false;
        let elapsed_ms = book
            .started
            .take()
            .map(|s| s.elapsed().as_millis().min(u128::from(u64::MAX)) as u64)
            .unwrap_or(0);
        let mut session = book
            .session
            .take()
            .ok_or_else(|| HavocError::Lifecycle("recording session is missing".to_string()))?;
        session.finished_at = Some(wall_time_iso_utc());
        session.duration_ms = Some(elapsed_ms);
        session.total_calls = session.calls.len() as u64;
        // Keep the frozen session around so summaries stay answerable.
        book.session = Some(session.clone());
        drop(book);

        ctx.unwrap_source();

        if let Some(path) = &self.output_path {
            session.write_json(path)?;
        }
        tracing::debug!(
            "recording session {} stopped with {} calls",
            session.session_id,
            session.total_calls
        );
        Ok(session)
    }

    /// Point-in-time view of the current session; callable from any thread.
    pub fn session_summary(&self) -> SessionSummary {
        let book = self.book.lock();
        let Some(session) = book.session.as_ref() else {
            return SessionSummary {
                status: RecorderStatus::NoSession,
                session_id: None,
                input: None,
                elapsed_ms: None,
                rng_calls: 0,
                construct_usage: BTreeMap::new(),
            };
        };
        SessionSummary {
            status: if book.recording {
                RecorderStatus::Active
            } else {
                RecorderStatus::Stopped
            },
            session_id: Some(session.session_id.clone()),
            input: Some(session.input.clone()),
            elapsed_ms: book
                .started
                .map(|s| s.elapsed().as_millis().min(u128::from(u64::MAX)) as u64),
            rng_calls: session.calls.len(),
            construct_usage: session.construct_usage.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderStatus {
    NoSession,
    Active,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub status: RecorderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    pub rng_calls: usize,
    pub construct_usage: BTreeMap<String, u64>,
}

/// Wrapper source installed while recording. The inner source produces every
/// value; bookkeeping happens afterwards under the recorder's mutex and must
/// never alter or abort the host call.
#[derive(Debug)]
struct RecordingSource {
    inner: Box<dyn RandomSource>,
    book: Arc<Mutex<RecorderBook>>,
}

impl RecordingSource {
    fn record(&self, primitive: PrimitiveCall, site: &CallSite<'_>) {
        // Bookkeeping only: nothing in here may propagate into the host call.
        let mut book = self.book.lock();
        if !book.recording {
            return;
        }
        book.sequence = book.sequence.saturating_add(1);
        let sequence_number = book.sequence;
        let Some(session) = book.session.as_mut() else {
            return;
        };

        let construct = ConstructInfo::from_scope(site.scope);
        let skip = site.scope.len().saturating_sub(SCOPE_WINDOW);
        let scope: Vec<String> = site.scope.iter().skip(skip).map(|s| s.render()).collect();

        session.calls.push(RngCall {
            call_id: Uuid::new_v4().to_string(),
            timestamp_ms: epoch_millis(),
            sequence_number,
            primitive,
            thread: format!("{:?}", std::thread::current().id()),
            scope,
            personality: site.snapshot,
            construct: construct.clone(),
        });
        *session.construct_usage.entry(construct.kind).or_insert(0) += 1;
    }
}

impl RandomSource for RecordingSource {
    fn next_float(&mut self, site: &CallSite<'_>) -> HavocResult<f64> {
        let result = self.inner.next_float(site)?;
        self.record(PrimitiveCall::Float { result }, site);
        Ok(result)
    }

    fn next_int(&mut self, lo: i64, hi: i64, site: &CallSite<'_>) -> HavocResult<i64> {
        let result = self.inner.next_int(lo, hi, site)?;
        self.record(PrimitiveCall::Int { lo, hi, result }, site);
        Ok(result)
    }

    fn next_uniform(&mut self, lo: f64, hi: f64, site: &CallSite<'_>) -> HavocResult<f64> {
        let result = self.inner.next_uniform(lo, hi, site)?;
        self.record(PrimitiveCall::Uniform { lo, hi, result }, site);
        Ok(result)
    }

    fn next_weighted(&mut self, weights: &[f64], site: &CallSite<'_>) -> HavocResult<usize> {
        let result = self.inner.next_weighted(weights, site)?;
        self.record(
            PrimitiveCall::Weighted {
                weights: weights.to_vec(),
                result,
            },
            site,
        );
        Ok(result)
    }

    fn next_gauss(&mut self, mu: f64, sigma: f64, site: &CallSite<'_>) -> HavocResult<f64> {
        let result = self.inner.next_gauss(mu, sigma, site)?;
        self.record(PrimitiveCall::Gauss { mu, sigma, result }, site);
        Ok(result)
    }

    fn unwrap_inner(self: Box<Self>) -> Box<dyn RandomSource> {
        self.inner
    }
}
