use std::path::PathBuf;
use std::sync::Arc;

use havoc::{
    ExecutionRecorder, HavocError, PersonalityContext, RecordingSession, ReplayEngine,
    ReplayStatus,
};

fn temp_workspace(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("havoc-golden-{name}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).expect("create temp workspace");
    root
}

/// Record one call per primitive with seed 42, persist, reload, and replay
/// the same sequence: every result must match with zero mismatches.
#[test]
fn golden_record_persist_load_replay() {
    let ws = temp_workspace("roundtrip");
    let out = ws.join("session.havoc");

    let mut ctx = PersonalityContext::new("playful", 5, Some(42));
    let recorder = ExecutionRecorder::with_output_path(out.clone());
    let session_id = recorder
        .start_recording(&mut ctx, "demo.hvc", &["run".to_string(), "demo.hvc".to_string()])
        .expect("start recording");

    let recorded = [
        ctx.chaos_float().expect("float"),
        ctx.chaos_int(1, 6).expect("int") as f64,
        ctx.chaos_uniform(-1.0, 1.0).expect("uniform"),
        ctx.chaos_weighted(&[0.4, 0.4, 0.2]).expect("weighted") as f64,
        ctx.chaos_gauss(0.0, 1.0).expect("gauss"),
    ];

    let session = recorder.stop_recording(&mut ctx).expect("stop recording");
    assert_eq!(session.session_id, session_id);
    assert_eq!(session.total_calls, 5);
    assert!(out.exists(), "persisted session missing");

    let loaded = RecordingSession::read_json(&out).expect("load session");
    assert_eq!(loaded.session_id, session.session_id);
    assert_eq!(loaded.calls, session.calls);
    assert_eq!(loaded.initial_personality, session.initial_personality);
    assert_eq!(loaded.construct_usage, session.construct_usage);

    let engine = ReplayEngine::new(loaded);
    let mut replay_ctx = PersonalityContext::new("chaotic", 9, None);
    engine.start_replay(&mut replay_ctx).expect("start replay");

    let replayed = [
        replay_ctx.chaos_float().expect("float"),
        replay_ctx.chaos_int(1, 6).expect("int") as f64,
        replay_ctx.chaos_uniform(-1.0, 1.0).expect("uniform"),
        replay_ctx.chaos_weighted(&[0.4, 0.4, 0.2]).expect("weighted") as f64,
        replay_ctx.chaos_gauss(0.0, 1.0).expect("gauss"),
    ];

    let summary = engine.stop_replay(&mut replay_ctx).expect("stop replay");
    assert_eq!(replayed, recorded);
    assert!(summary.mismatches.is_empty(), "unexpected mismatches");
    assert!(summary.replay_complete);
    assert_eq!(summary.total_calls, 5);
    assert_eq!(summary.success_rate, 100.0);
}

#[test]
fn replay_from_persisted_file_exhausts_loudly() {
    let ws = temp_workspace("exhaustion");
    let out = ws.join("short.havoc");

    let mut ctx = PersonalityContext::new("cautious", 4, Some(7));
    let recorder = ExecutionRecorder::with_output_path(out.clone());
    recorder
        .start_recording(&mut ctx, "short.hvc", &[])
        .expect("start recording");
    ctx.chaos_float().expect("float");
    ctx.chaos_float().expect("float");
    recorder.stop_recording(&mut ctx).expect("stop recording");

    let engine = ReplayEngine::from_path(&out).expect("load engine");
    let mut replay_ctx = PersonalityContext::default();
    engine.start_replay(&mut replay_ctx).expect("start replay");

    replay_ctx.chaos_float().expect("first replayed call");
    replay_ctx.chaos_float().expect("second replayed call");
    let err = replay_ctx
        .chaos_float()
        .expect_err("third call must exhaust");
    assert!(matches!(err, HavocError::Replay(_)));
    assert!(err.to_string().contains("replay exhausted"));

    let summary = engine.stop_replay(&mut replay_ctx).expect("stop replay");
    assert_eq!(summary.calls_replayed, 2);
    assert!(summary.replay_complete, "all recorded calls were consumed");
}

/// After a replay detaches, the restored source generates fresh metered
/// randomness again from the replayed seed position.
#[test]
fn context_keeps_working_after_replay_stops() {
    let mut ctx = PersonalityContext::new("playful", 5, Some(3));
    let recorder = ExecutionRecorder::new();
    recorder
        .start_recording(&mut ctx, "demo.hvc", &[])
        .expect("start");
    ctx.chaos_float().expect("recorded call");
    let session = recorder.stop_recording(&mut ctx).expect("stop");

    let engine = ReplayEngine::new(session);
    let mut replay_ctx = PersonalityContext::default();
    engine.start_replay(&mut replay_ctx).expect("start replay");
    replay_ctx.chaos_float().expect("replayed call");
    engine.stop_replay(&mut replay_ctx).expect("stop replay");

    // No replay wrapper left behind: fresh randomness works.
    replay_ctx.chaos_float().expect("fresh call after replay");
    replay_ctx.chaos_int(0, 5).expect("fresh int after replay");
}

#[test]
fn progress_is_readable_from_another_thread() {
    let mut ctx = PersonalityContext::new("playful", 5, Some(11));
    let recorder = ExecutionRecorder::new();
    recorder
        .start_recording(&mut ctx, "demo.hvc", &[])
        .expect("start");
    for _ in 0..10 {
        ctx.chaos_float().expect("recorded call");
    }
    let session = recorder.stop_recording(&mut ctx).expect("stop");

    let engine = Arc::new(ReplayEngine::new(session));
    let mut replay_ctx = PersonalityContext::default();
    engine.start_replay(&mut replay_ctx).expect("start replay");
    for _ in 0..4 {
        replay_ctx.chaos_float().expect("replayed call");
    }

    let observer = Arc::clone(&engine);
    let progress = std::thread::spawn(move || observer.replay_progress())
        .join()
        .expect("observer thread");
    assert_eq!(progress.status, ReplayStatus::Replaying);
    assert_eq!(progress.current_call, 4);
    assert_eq!(progress.total_calls, 10);
    assert_eq!(progress.mismatches, 0);

    engine.stop_replay(&mut replay_ctx).expect("stop replay");
    assert_eq!(engine.replay_progress().status, ReplayStatus::Idle);
}

#[test]
fn recorder_can_run_back_to_back_sessions() {
    let mut ctx = PersonalityContext::new("friendly", 6, Some(21));
    let recorder = ExecutionRecorder::new();

    recorder
        .start_recording(&mut ctx, "first.hvc", &[])
        .expect("first start");
    ctx.chaos_float().expect("call");
    let first = recorder.stop_recording(&mut ctx).expect("first stop");

    recorder
        .start_recording(&mut ctx, "second.hvc", &[])
        .expect("second start");
    ctx.chaos_float().expect("call");
    ctx.chaos_float().expect("call");
    let second = recorder.stop_recording(&mut ctx).expect("second stop");

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(first.total_calls, 1);
    assert_eq!(second.total_calls, 2);
    // Sequence numbers restart per session.
    assert_eq!(second.calls[0].sequence_number, 1);
}
