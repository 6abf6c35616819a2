//! End-to-end encoder scenarios: detect, select, re-encode, serialize, and
//! walk the ctl stream back out.

use csx_core::csx::{decode::decode, pattern_id, CsxMatrix};
use csx_core::{
    Cell, CsxBuilder, CsxError, DrleEncoder, EncoderConfig, IterationOrder, PatternDescriptor,
    SparseMatrix,
};

fn config(min_limit: u64, max_limit: u64, min_perc: f64) -> EncoderConfig {
    EncoderConfig {
        min_limit,
        max_limit,
        min_perc,
    }
}

fn sorted(mut triplets: Vec<(u64, u64, f64)>) -> Vec<(u64, u64, f64)> {
    triplets.sort_by(|a, b| a.partial_cmp(b).unwrap());
    triplets
}

/// Runs the full pipeline and checks the round-trip property: the walked
/// ctl stream reproduces the input multiset exactly.
fn assert_roundtrip(
    nr_rows: u64,
    nr_cols: u64,
    triplets: &[(u64, u64, f64)],
    cfg: EncoderConfig,
) -> CsxMatrix {
    let mut m = SparseMatrix::from_triplets(nr_rows, nr_cols, triplets).unwrap();
    let mut enc = DrleEncoder::new(&mut m, cfg);
    enc.encode_all().unwrap();
    let csx = CsxBuilder::new(&m).build().unwrap();

    assert_eq!(csx.nnz, triplets.len() as u64);
    assert_eq!(csx.values.len(), triplets.len());
    let walked = decode(&csx).unwrap();
    assert_eq!(walked.len(), triplets.len());
    assert_eq!(sorted(walked), sorted(triplets.to_vec()));
    csx
}

#[test]
fn identity_matrix_becomes_one_diagonal_unit() {
    let triplets: Vec<(u64, u64, f64)> = (1..=5).map(|i| (i, i, 1.0)).collect();
    let csx = assert_roundtrip(5, 5, &triplets, config(2, 254, 0.1));

    // One unit: flag 0, size 5, column jump 1. No row markers.
    assert_eq!(csx.ctl, vec![0x00, 5, 1]);
    assert_eq!(csx.id_map[0], pattern_id(IterationOrder::Diagonal, 1) as i64);
    assert_eq!(csx.values, vec![1.0; 5]);
    assert!(!csx.row_jumps);
}

#[test]
fn capped_run_leaves_tail_singletons() {
    let triplets: Vec<(u64, u64, f64)> = (1..=8).map(|c| (1, c, c as f64)).collect();
    let csx = assert_roundtrip(1, 8, &triplets, config(4, 6, 0.1));

    // A horizontal pattern of six cells, then a two-cell singleton run:
    // flags 0 / size 6 / jump 1, then flags 1 / size 2 / jump 1 / delta 1.
    assert_eq!(csx.ctl, vec![0x00, 6, 1, 0x01, 2, 1, 1]);
    assert_eq!(
        csx.id_map[0],
        pattern_id(IterationOrder::Horizontal, 1) as i64
    );
    let sizes_total: u64 = [6u64, 2].iter().sum();
    assert_eq!(sizes_total, csx.nnz);
}

#[test]
fn leading_empty_rows_emit_one_row_jump() {
    let csx = assert_roundtrip(4, 4, &[(4, 2, 5.0)], EncoderConfig::default());
    assert!(csx.row_jumps);
    assert_eq!(csx.ctl, vec![0b1100_0000, 1, 4, 2]);
    assert_eq!(decode(&csx).unwrap(), vec![(4, 2, 5.0)]);
}

#[test]
fn square_block_becomes_one_block_row_unit() {
    let triplets = vec![(1, 1, 1.0), (2, 1, 2.0), (1, 2, 3.0), (2, 2, 4.0)];
    let mut m = SparseMatrix::from_triplets(2, 2, &triplets).unwrap();
    let mut enc = DrleEncoder::new(&mut m, config(4, 254, 0.1));
    enc.gen_all_stats();
    assert_eq!(enc.choose_order(), Some(IterationOrder::BlockRow(2)));
    enc.encode(IterationOrder::BlockRow(2)).unwrap();

    let csx = CsxBuilder::new(&m).build().unwrap();
    assert_eq!(
        csx.id_map[0],
        pattern_id(IterationOrder::BlockRow(2), 2) as i64
    );
    assert_eq!(csx.ctl, vec![0x00, 4, 1]);
    // Values arrive in block traversal order: down each aligned column pair.
    assert_eq!(csx.values, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(sorted(decode(&csx).unwrap()), sorted(triplets));
}

#[test]
fn run_of_300_splits_at_the_size_cap() {
    let triplets: Vec<(u64, u64, f64)> = (1..=300).map(|c| (1, c, c as f64)).collect();
    let mut m = SparseMatrix::from_triplets(1, 300, &triplets).unwrap();
    let mut enc = DrleEncoder::new(&mut m, config(4, 254, 0.1));
    enc.encode_all().unwrap();

    let sizes: Vec<u64> = m.row(0).iter().map(Cell::size).collect();
    assert_eq!(sizes, vec![254, 46]);

    let csx = CsxBuilder::new(&m).build().unwrap();
    assert_eq!(sorted(decode(&csx).unwrap()), sorted(triplets));
}

#[test]
fn only_admitted_deltas_become_patterns() {
    // One run of five delta-2 cells, one run of three delta-7 cells: the
    // short run fails min_limit and stays singletons.
    let mut triplets: Vec<(u64, u64, f64)> = vec![(1, 1, 0.5)];
    triplets.extend((1..=5).map(|i| (1, 1 + 2 * i, i as f64)));
    triplets.extend((1..=3).map(|i| (1, 11 + 7 * i, 100.0 + i as f64)));
    let mut m = SparseMatrix::from_triplets(1, 40, &triplets).unwrap();
    let mut enc = DrleEncoder::new(&mut m, config(4, 254, 0.5));
    enc.gen_all_stats();
    assert_eq!(enc.choose_order(), Some(IterationOrder::Horizontal));
    enc.encode(IterationOrder::Horizontal).unwrap();

    let patterns: Vec<&Cell> = m.row(0).iter().filter(|c| !c.is_plain()).collect();
    assert_eq!(patterns.len(), 1);
    match patterns[0] {
        Cell::Patterned { pattern, .. } => {
            assert_eq!(pattern.delta, 2);
            assert_eq!(pattern.size, 5);
        }
        _ => unreachable!(),
    }
    assert_eq!(m.nr_singletons(), 4);

    let csx = CsxBuilder::new(&m).build().unwrap();
    assert_eq!(sorted(decode(&csx).unwrap()), sorted(triplets));
}

#[test]
fn encode_all_round_trips_a_mixed_matrix() {
    // A composite: dense top row, a long column, a diagonal band, and a
    // block of ones, plus scattered noise.
    let mut triplets: Vec<(u64, u64, f64)> = Vec::new();
    triplets.extend((1..=30).map(|c| (1, c, c as f64)));
    triplets.extend((2..=30).map(|r| (r, 1, 1000.0 + r as f64)));
    triplets.extend((5..=25).map(|i| (i, i + 3, 2000.0 + i as f64)));
    for r in 10..=13 {
        for c in 20..=23 {
            if r != c + 3 {
                triplets.push((r, c, 1.0));
            }
        }
    }
    triplets.push((29, 17, -1.0));
    triplets.push((7, 29, -2.0));

    let csx = assert_roundtrip(30, 30, &triplets, config(4, 254, 0.05));
    assert!(csx.ctl.len() < 6 * triplets.len());
}

#[test]
fn chosen_order_strictly_reduces_singletons() {
    let triplets: Vec<(u64, u64, f64)> = (1..=3)
        .flat_map(|r| (10..=29).map(move |c| (r, c, (r * 100 + c) as f64)))
        .collect();
    let mut m = SparseMatrix::from_triplets(3, 40, &triplets).unwrap();
    let before = m.nr_singletons();
    let mut enc = DrleEncoder::new(&mut m, EncoderConfig::default());
    enc.gen_all_stats();
    let order = enc.choose_order().expect("a run-heavy matrix must encode");
    enc.encode(order).unwrap();
    assert!(m.nr_singletons() < before);
}

#[test]
fn no_encoding_is_a_no_op() {
    let triplets = vec![(1, 1, 1.0), (2, 3, 2.0), (4, 2, 3.0)];
    let mut m = SparseMatrix::from_triplets(4, 4, &triplets).unwrap();
    let mut enc = DrleEncoder::new(&mut m, EncoderConfig::default());
    enc.gen_all_stats();
    assert_eq!(enc.choose_order(), None);
    enc.encode_all().unwrap();
    assert_eq!(m.nr_singletons(), 3);
    assert_eq!(sorted(m.triplets()), sorted(triplets));
}

#[test]
fn ignored_orders_are_never_applied() {
    let triplets: Vec<(u64, u64, f64)> = (1..=5).map(|i| (i, i, 1.0)).collect();
    let mut m = SparseMatrix::from_triplets(5, 5, &triplets).unwrap();
    let mut enc = DrleEncoder::new(&mut m, config(2, 254, 0.1));
    enc.add_ignore(IterationOrder::Diagonal);
    enc.encode_all().unwrap();
    assert_eq!(m.nr_singletons(), 5);
}

#[test]
fn wide_strides_round_trip_alongside_small_ones() {
    // A horizontal run with stride 10,005 and a vertical run with stride 5:
    // the two identities must get distinct flags, and the walk must
    // reproduce both geometries exactly.
    let mut triplets: Vec<(u64, u64, f64)> =
        (0..5).map(|i| (1, 1 + i * 10_005, i as f64)).collect();
    triplets.extend((0..5).map(|i| (2 + i * 5, 2, 50.0 + i as f64)));
    let csx = assert_roundtrip(30, 45_000, &triplets, config(4, 254, 0.1));

    let ids: Vec<i64> = csx.id_map.iter().copied().filter(|&id| id >= 0).collect();
    assert!(ids.contains(&(pattern_id(IterationOrder::Horizontal, 10_005) as i64)));
    assert!(ids.contains(&(pattern_id(IterationOrder::Vertical, 5) as i64)));
}

#[test]
fn flag_space_overflow_is_reported() {
    // Sixty-five distinct (kind, delta) identities cannot fit 6-bit flags.
    let mut anchors = Vec::new();
    let mut col = 1u64;
    for d in 1..=65u64 {
        anchors.push((col, d));
        col += d + 2;
    }
    let nnz = 2 * anchors.len();
    let triplets: Vec<(u64, u64, f64)> = (1..=nnz as u64).map(|i| (1, i, 1.0)).collect();
    let mut m = SparseMatrix::from_triplets(1, 2 * col, &triplets).unwrap();
    let row: Vec<Cell> = anchors
        .iter()
        .map(|&(anchor, d)| Cell::Patterned {
            col: anchor,
            pattern: PatternDescriptor {
                order: IterationOrder::Horizontal,
                delta: d,
                size: 2,
            },
            vals: vec![1.0, 2.0],
        })
        .collect();
    m.replace_row(0, row);

    match CsxBuilder::new(&m).build() {
        Err(CsxError::TooManyPatterns(limit)) => assert_eq!(limit, 64),
        other => panic!("expected TooManyPatterns, got {other:?}"),
    }
}

#[test]
fn symmetric_build_keeps_diagonal_separate() {
    // Strictly-lower triangle of a 5x5 symmetric matrix.
    let lower = vec![
        (2, 1, 1.0),
        (3, 1, 2.0),
        (3, 2, 3.0),
        (5, 2, 4.0),
        (5, 4, 5.0),
    ];
    let diagonal = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let m = SparseMatrix::from_triplets(5, 5, &lower).unwrap();
    let sym = CsxBuilder::new(&m).build_sym(diagonal.clone()).unwrap();

    assert_eq!(sym.dvalues, diagonal);
    assert_eq!(sym.lower.nnz, lower.len() as u64);
    assert_eq!(sorted(decode(&sym.lower).unwrap()), sorted(lower));
}

#[test]
fn row_info_tracks_pattern_spans() {
    // A vertical run down column 2 anchored at row 1.
    let triplets: Vec<(u64, u64, f64)> = (1..=6).map(|r| (r, 2, r as f64)).collect();
    let mut m = SparseMatrix::from_triplets(6, 4, &triplets).unwrap();
    let mut enc = DrleEncoder::new(&mut m, config(4, 254, 0.1));
    enc.encode_all().unwrap();

    let csx = CsxBuilder::new(&m).build().unwrap();
    assert_eq!(csx.row_info[0].span, 5);
    assert_eq!(sorted(decode(&csx).unwrap()), sorted(triplets));
}
