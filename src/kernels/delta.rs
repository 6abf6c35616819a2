//! This module contains the pure, stateless kernels for delta encoding.
//!
//! Delta encoding is the first half of the pattern-detection primitive: it
//! makes uniform-stride runs of column indices visible as repeated values,
//! which the RLE kernel then counts. The core algorithm is implemented
//! **in-place** for the seeded variant used by the ctl builder; the public
//! slice API allocates its output and leaves the input untouched.

use num_traits::{PrimInt, WrappingSub};

/// Delta-encodes a sequence: the first element is kept unchanged, every
/// subsequent element is replaced by its difference from the previous one.
///
/// Pure function; the input slice is not mutated.
pub fn encode<T>(input: &[T]) -> Vec<T>
where
    T: PrimInt + WrappingSub,
{
    let mut output = Vec::with_capacity(input.len());
    let mut prev = match input.first() {
        Some(&first) => {
            output.push(first);
            first
        }
        None => return output,
    };
    for &curr in &input[1..] {
        output.push(curr.wrapping_sub(&prev));
        prev = curr;
    }
    output
}

/// Delta-encodes a slice **in-place** against a seed value: `data[0]` becomes
/// `data[0] - seed`, and each later element its difference from the original
/// previous element.
///
/// This is the variant the ctl builder uses to turn a row's absolute columns
/// into a column jump followed by deltas.
pub fn encode_from<T>(seed: T, data: &mut [T])
where
    T: PrimInt + WrappingSub,
{
    let mut prev = seed;
    for slot in data.iter_mut() {
        let curr = *slot;
        *slot = curr.wrapping_sub(&prev);
        prev = curr;
    }
}
