//! This file is the root of the `csx_core` crate.
//!
//! The crate compresses sparse matrices into CSX: geometric patterns in the
//! non-zero placements (horizontal, vertical, diagonal, anti-diagonal, and
//! 2D block runs) are detected across multiple traversal orders, the most
//! beneficial order is applied, and the result is serialized into a compact
//! ctl byte stream plus a parallel value array.
//!
//! The flow through the modules:
//!
//! 1. [`matrix`] holds the mutable matrix and its traversal-order transforms.
//! 2. [`encoder`] gathers statistics ([`kernels`] delta+RLE), selects an
//!    order, and replaces admitted runs with pattern descriptors.
//! 3. [`csx`] serializes the re-encoded rows into the final byte stream and
//!    can walk it back for verification.

pub mod config;
pub mod csx;
pub mod encoder;
pub mod error;
pub mod kernels;
pub mod matrix;

pub use config::EncoderConfig;
pub use csx::{CsxBuilder, CsxMatrix, CsxSymMatrix};
pub use encoder::DrleEncoder;
pub use error::CsxError;
pub use matrix::{Cell, IterationOrder, PatternDescriptor, SparseMatrix};
