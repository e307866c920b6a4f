//! Havoc core library: chaos-control engine with deterministic record/replay.
//!
//! Every probabilistic decision in the host runtime funnels through one
//! seeded generator owned by [`PersonalityContext`]; mood profiles and the
//! chaos level shape what those decisions look like, and the recorder/replay
//! pair captures and reproduces the exact decision sequence.

#[path = "model/call.rs"]
mod call;
#[path = "runtime/clock.rs"]
mod clock;
#[path = "platform/config.rs"]
mod config;
#[path = "platform/error.rs"]
mod error;
#[path = "runtime/evaluator.rs"]
mod evaluator;
#[path = "runtime/personality.rs"]
mod personality;
#[path = "model/profile.rs"]
mod profile;
#[path = "runtime/recorder.rs"]
mod recorder;
#[path = "runtime/replay.rs"]
mod replay;
#[path = "runtime/rng.rs"]
mod rng;
#[path = "model/session.rs"]
mod session;
#[path = "model/tracker.rs"]
mod tracker;

pub use call::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use evaluator::*;
pub use personality::*;
pub use profile::*;
pub use recorder::*;
pub use replay::*;
pub use rng::{gen_seed, CallSite, RandomSource, SeededSource};
pub use session::*;
pub use tracker::*;
