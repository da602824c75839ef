//! Lossless coding for sac
//!
//! Every frame runs through an adaptive predictor cascade (OLS, a stack
//! of NLMS stages, bias correction) whose hyperparameters can be tuned
//! per frame by a DDS search. Residuals are coded bitplane by bitplane
//! with an adaptive binary range coder, optionally after remapping a
//! sparse sample alphabet onto a dense one.

pub mod cost;
pub mod dds;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod predictor;
pub mod profile;
pub mod remap;

pub use cost::CostKind;
pub use dds::{Dds, DdsResult, DdsSchedule};
pub use decoder::{DecodedAudio, Decoder};
pub use encoder::{EncodeReport, Encoder, Progress};
pub use frame::{FrameCoder, FrameState, FrameStats};
pub use predictor::{Predictor, PredictorParams};
pub use profile::{Profile, Role};
pub use remap::Remap;

use crate::core::{SacError, SacResult};

/// run `f` on a dedicated pool of `threads` workers, or in place for 0
pub(crate) fn run_in_pool<R, F>(threads: usize, f: F) -> SacResult<R>
where
    F: FnOnce() -> SacResult<R> + Send,
    R: Send,
{
    if threads == 0 {
        return f();
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SacError::Config(format!("cannot start {threads} worker threads: {e}")))?;
    pool.install(f)
}
