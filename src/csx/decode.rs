//! Expansion of a CSX matrix back into `(row, column, value)` triples.
//!
//! This is the reference walk of the ctl contract: the builder and this
//! module must agree byte for byte on unit layout, varints, payload
//! alignment, and the column-cursor rule. Malformed streams surface as
//! `CtlDecode` errors, never panics.

use std::io::Cursor;

use crate::csx::{
    unit_kind, CsxMatrix, UnitKind, CTL_FLAG_MASK, CTL_NR_MASK, CTL_RJMP_MASK,
};
use crate::error::CsxError;
use crate::kernels::leb128;
use crate::matrix::PatternDescriptor;

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, CsxError> {
    let pos = cursor.position() as usize;
    let byte = *cursor
        .get_ref()
        .get(pos)
        .ok_or_else(|| CsxError::CtlDecode("truncated unit header".to_string()))?;
    cursor.set_position((pos + 1) as u64);
    Ok(byte)
}

fn read_uint(cursor: &mut Cursor<&[u8]>, width: usize) -> Result<u64, CsxError> {
    let start = cursor.position() as usize;
    let end = start + width;
    let bytes = cursor
        .get_ref()
        .get(start..end)
        .ok_or_else(|| CsxError::CtlDecode("truncated delta payload".to_string()))?;
    cursor.set_position(end as u64);
    Ok(match width {
        1 => bytes[0] as u64,
        2 => bytemuck::pod_read_unaligned::<u16>(bytes) as u64,
        4 => bytemuck::pod_read_unaligned::<u32>(bytes) as u64,
        _ => bytemuck::pod_read_unaligned::<u64>(bytes),
    })
}

/// Walks the ctl stream and reproduces the matrix's non-zero triples,
/// 1-based and partition-local, in stream order.
pub fn decode(csx: &CsxMatrix) -> Result<Vec<(u64, u64, f64)>, CsxError> {
    let ctl = csx.ctl.as_slice();
    let mut cursor = Cursor::new(ctl);
    let mut out = Vec::with_capacity(csx.nnz as usize);

    let mut values_idx = 0usize;
    let mut row: u64 = 1;
    let mut last_col: u64 = 0;
    let mut first_unit = true;

    let mut next_value = |idx: &mut usize| -> Result<f64, CsxError> {
        let v = csx
            .values
            .get(*idx)
            .copied()
            .ok_or_else(|| CsxError::CtlDecode("value array exhausted".to_string()))?;
        *idx += 1;
        Ok(v)
    };

    while (cursor.position() as usize) < ctl.len() {
        let flags = read_u8(&mut cursor)?;
        let size = read_u8(&mut cursor)? as u64;
        if size == 0 {
            return Err(CsxError::CtlDecode("zero-size unit".to_string()));
        }

        if flags & CTL_RJMP_MASK != 0 {
            let jump: u64 = leb128::decode_one(&mut cursor)?;
            if jump < 2 {
                return Err(CsxError::CtlDecode(format!("bad row jump {jump}")));
            }
            // The jump counts the skipped empty rows plus one. A leading
            // jump is absolute: rows 1..jump-1 were empty.
            row = if first_unit { jump } else { row + jump };
            last_col = 0;
        } else if flags & CTL_NR_MASK != 0 {
            if !first_unit {
                row += 1;
            }
            last_col = 0;
        }

        let flag = (flags & CTL_FLAG_MASK) as usize;
        let id = csx.id_map[flag];
        if id < 0 {
            return Err(CsxError::CtlDecode(format!("unknown pattern flag {flag}")));
        }
        let kind = unit_kind(id as u64)
            .ok_or_else(|| CsxError::CtlDecode(format!("unmapped pattern id {id}")))?;

        let jump: u64 = leb128::decode_one(&mut cursor)?;
        let col = last_col + jump;

        match kind {
            UnitKind::Delta { width } => {
                out.push((row, col, next_value(&mut values_idx)?));
                let mut cur = col;
                if size > 1 {
                    let aligned = (cursor.position() as usize).next_multiple_of(width);
                    cursor.set_position(aligned as u64);
                    for _ in 0..size - 1 {
                        cur += read_uint(&mut cursor, width)?;
                        out.push((row, cur, next_value(&mut values_idx)?));
                    }
                }
                last_col = cur;
            }
            UnitKind::Pattern { order, delta } => {
                if order == crate::matrix::IterationOrder::AntiDiagonal
                    && col < (size - 1) * delta
                {
                    return Err(CsxError::CtlDecode(format!(
                        "anti-diagonal unit at column {col} walks out of the matrix"
                    )));
                }
                let descriptor = PatternDescriptor { order, delta, size };
                for (r, c) in descriptor.cells(row, col) {
                    out.push((r, c, next_value(&mut values_idx)?));
                }
                last_col = descriptor.last_col_on_anchor_row(col);
            }
        }
        first_unit = false;
    }

    if values_idx != csx.values.len() {
        return Err(CsxError::CtlDecode(format!(
            "walk consumed {} of {} values",
            values_idx,
            csx.values.len()
        )));
    }
    Ok(out)
}
