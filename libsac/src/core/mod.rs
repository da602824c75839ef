pub mod bits;
pub mod checksum;
pub mod config;
pub mod error;
pub mod math;
pub mod metadata;
pub mod pcm;
pub mod types;

pub use checksum::{Checksum, FrameHasher, CHECKSUM_SIZE};
pub use config::{CoderConfig, MtMode, OptimizeConfig, Preset, SearchMethod};
pub use error::{SacError, SacResult};
pub use metadata::StreamMetadata;
pub use pcm::{PcmSink, PcmSource, SampleSink, SampleSource};
pub use types::*;
