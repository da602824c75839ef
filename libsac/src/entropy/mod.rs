//! Entropy coding: binary range coder, adaptive bit models, the
//! bitplane residual coder and the remap bitmap coder.

pub mod bitplane;
pub mod map_coder;
pub mod model;
pub mod range_coder;

pub use bitplane::BitplaneCoder;
pub use map_coder::MapCoder;
pub use model::BitModel;
pub use range_coder::{RangeDecoder, RangeEncoder, PROB_BITS, PROB_SCALE};
