//! This module contains the pure, stateless kernel for run-length encoding.
//!
//! RLE is the second half of the pattern-detection primitive: applied to a
//! delta-encoded column sequence, each `(value, freq)` record with a large
//! `freq` is a uniform-stride run and therefore a pattern candidate. Unlike
//! a byte-stream RLE codec, this kernel produces typed records for the
//! statistics and re-encoding passes to walk.

use num_traits::PrimInt;

/// One run of equal elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rle<T> {
    pub val: T,
    pub freq: u64,
}

/// Collapses consecutive equal elements into `(value, frequency)` records.
///
/// For an input of length `n`, the frequencies sum to `n`. An empty input
/// yields no records; a single element yields one record with frequency 1.
pub fn encode<T>(input: &[T]) -> Vec<Rle<T>>
where
    T: PrimInt,
{
    let mut output = Vec::new();
    let mut iter = input.iter();
    let mut run = match iter.next() {
        Some(&first) => Rle { val: first, freq: 1 },
        None => return output,
    };
    for &curr in iter {
        if curr == run.val {
            run.freq += 1;
        } else {
            output.push(run);
            run = Rle { val: curr, freq: 1 };
        }
    }
    output.push(run);
    output
}
