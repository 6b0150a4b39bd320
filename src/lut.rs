//! Lookup tables reducing raw P-bit circular codes to pattern classes.
//!
//! All tables are pure functions of P. Raw codes are read with the first
//! ring sample as the most significant bit, so a circular rotation of the
//! ring is a circular rotation of the P-bit value.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::options::TableKind;

/// Largest supported sample count; the average-bit table has `2^(P+1)` entries.
pub const MAX_POINTS: u32 = 16;

#[inline]
fn mask(points: u32) -> u32 {
    (1u32 << points) - 1
}

/// Rotate the low `points` bits of `code` right by `k` (`k < points`).
#[inline]
pub fn rotate_right(code: u32, k: u32, points: u32) -> u32 {
    if k == 0 {
        return code;
    }
    ((code >> k) | (code << (points - k))) & mask(points)
}

/// Number of 0/1 changes in the circular bit sequence of `code`.
#[inline]
pub fn transitions(code: u32, points: u32) -> u32 {
    (code ^ rotate_right(code, 1, points)).count_ones()
}

#[inline]
pub fn is_uniform(code: u32, points: u32) -> bool {
    transitions(code, points) <= 2
}

/// Smallest value among all circular rotations of `code`.
pub fn min_rotation(code: u32, points: u32) -> u32 {
    (1..points).fold(code, |best, k| best.min(rotate_right(code, k, points)))
}

/// Identity over `[0, 2^points)`.
pub fn identity(points: u32) -> Vec<u32> {
    (0..1u32 << points).collect()
}

/// Each code maps to its minimal rotation.
pub fn rotation_invariant(points: u32) -> Vec<u32> {
    (0..1u32 << points)
        .map(|code| min_rotation(code, points))
        .collect()
}

/// Uniform patterns get consecutive labels in increasing code order; all
/// non-uniform patterns share the label right after the last uniform one.
pub fn uniform(points: u32) -> Vec<u32> {
    let sentinel = uniform_pattern_count(points);
    let mut next = 0;
    (0..1u32 << points)
        .map(|code| {
            if is_uniform(code, points) {
                next += 1;
                next - 1
            } else {
                sentinel
            }
        })
        .collect()
}

/// Uniform patterns map to their number of set bits (0..=P), non-uniform
/// ones to the sentinel `P + 1`.
pub fn uniform_rotation_invariant(points: u32) -> Vec<u32> {
    (0..1u32 << points)
        .map(|code| {
            if is_uniform(code, points) {
                code.count_ones()
            } else {
                points + 1
            }
        })
        .collect()
}

/// Identity over the `2^(P+1)` codes that carry the appended average bit.
///
/// This table is only selected when no rotation or uniform reduction is
/// active, so no further reduction applies.
pub fn average_bit(points: u32) -> Vec<u32> {
    identity(points + 1)
}

/// Count of uniform P-bit codes.
pub fn uniform_pattern_count(points: u32) -> u32 {
    (0..1u32 << points)
        .filter(|&code| is_uniform(code, points))
        .count() as u32
}

/// Build the table for `kind`.
#[cfg_attr(feature = "tracing", instrument(level = "debug"))]
pub fn build(kind: TableKind, points: u32) -> Vec<u32> {
    match kind {
        TableKind::Raw => identity(points),
        TableKind::AverageBit => average_bit(points),
        TableKind::Uniform => uniform(points),
        TableKind::RotationInvariant => rotation_invariant(points),
        TableKind::UniformRotationInvariant => uniform_rotation_invariant(points),
    }
}

/// Per-operator table cache.
///
/// Tables are built on first request and kept until P changes.
#[derive(Debug, Clone)]
pub struct LookupTables {
    points: u32,
    tables: [Option<Vec<u32>>; TableKind::COUNT],
}

impl LookupTables {
    pub fn new(points: u32) -> Self {
        Self {
            points,
            tables: Default::default(),
        }
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    /// Build `kind` unless it is already cached.
    pub fn ensure(&mut self, kind: TableKind) {
        let slot = &mut self.tables[kind.index()];
        if slot.is_none() {
            *slot = Some(build(kind, self.points));
        }
    }

    pub fn is_built(&self, kind: TableKind) -> bool {
        self.tables[kind.index()].is_some()
    }

    /// Cached table for `kind`, if built.
    pub fn get(&self, kind: TableKind) -> Option<&[u32]> {
        self.tables[kind.index()].as_deref()
    }
}
