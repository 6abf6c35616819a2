//! The collection of pure, stateless integer kernels underneath the encoder.
//!
//! `delta` and `rle` together form the pattern-detection primitive: a
//! uniform-stride run of column indices delta-encodes to a repeated value,
//! which RLE collapses into a single countable record. `leb128` supplies the
//! variable-length integers of the ctl stream.

pub mod delta;
pub mod leb128;
pub mod rle;
