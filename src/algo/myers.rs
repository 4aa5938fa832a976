//! Myers diff over ordered child-id sequences
//!
//! Produces the shortest Insert/Remove edit script turning the current child
//! ordering of a parent into the desired one. Substitutions do not exist:
//! a changed position is always a Remove plus an Insert.
//!
//! # Algorithm
//!
//! Classic greedy Myers, O((n+m)*d) time where d is the edit distance:
//!
//! - `v[k + offset]` holds the furthest x reached on diagonal `k = x - y`,
//!   offset by `n + m` so negative diagonals index cleanly.
//! - For each `d`, every diagonal in `[-d, d]` (step 2) extends from `k+1`
//!   (an insert) or `k-1` (a remove), whichever reaches further, then slides
//!   along matching elements (the snake).
//! - A snapshot of `v` is taken before each round; walking the snapshots
//!   backwards recovers one edit per round.
//!
//! # Script order and indices
//!
//! Operations come out in forward order. A Remove carries its index in the
//! *source* sequence, an Insert its index in the *destination* sequence.
//! [`apply_edit_script`] shows how a consumer turns those into positions.
//!
//! Duplicate ids are diffed positionally and are not deduplicated, so the
//! matching among duplicates is arbitrary (but the script is still correct).
//!
//! # References
//!
//! - Myers, E.W. "An O(ND) Difference Algorithm and Its Variations" (1986)

use std::fmt;

use crate::id::ElementId;

// =============================================================================
// Public Types
// =============================================================================

/// Operation kind of an [`EditOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Insert,
    Remove,
}

impl OpKind {
    /// ASCII name used in the batch wire format
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "Insert",
            Self::Remove => "Remove",
        }
    }

    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"Insert" => Some(Self::Insert),
            b"Remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single step of an edit script
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditOp {
    pub op: OpKind,
    pub id: ElementId,
    /// Destination index for Insert, source index for Remove
    pub index: usize,
}

impl EditOp {
    pub fn insert(id: impl Into<ElementId>, index: usize) -> Self {
        Self {
            op: OpKind::Insert,
            id: id.into(),
            index,
        }
    }

    pub fn remove(id: impl Into<ElementId>, index: usize) -> Self {
        Self {
            op: OpKind::Remove,
            id: id.into(),
            index,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.op == OpKind::Insert
    }

    pub fn is_remove(&self) -> bool {
        self.op == OpKind::Remove
    }
}

/// Index-only edit step, independent of the element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// Remove `source[source_idx]`
    Remove { source_idx: usize },
    /// Insert `dest[dest_idx]` at `dest_idx`
    Insert { dest_idx: usize },
}

// =============================================================================
// Main API
// =============================================================================

/// Shortest edit script from `source` to `dest`.
///
/// ```
/// use zui_vdom::algo::{edit_script, EditOp};
/// use zui_vdom::ElementId;
///
/// let a: Vec<ElementId> = ["a", "b", "c"].map(ElementId::from).to_vec();
/// let b: Vec<ElementId> = ["b", "c", "d"].map(ElementId::from).to_vec();
/// assert_eq!(
///     edit_script(&a, &b),
///     vec![EditOp::remove("a", 0), EditOp::insert("d", 2)]
/// );
/// ```
pub fn edit_script(source: &[ElementId], dest: &[ElementId]) -> Vec<EditOp> {
    diff_indices(source, dest)
        .into_iter()
        .map(|edit| match edit {
            Edit::Remove { source_idx } => EditOp::remove(source[source_idx].clone(), source_idx),
            Edit::Insert { dest_idx } => EditOp::insert(dest[dest_idx].clone(), dest_idx),
        })
        .collect()
}

/// Shortest edit script as index steps, for any comparable element type.
pub fn diff_indices<T: PartialEq>(source: &[T], dest: &[T]) -> Vec<Edit> {
    let n = source.len();
    let m = dest.len();

    // Quick paths
    if n == 0 {
        return (0..m).map(|dest_idx| Edit::Insert { dest_idx }).collect();
    }
    if m == 0 {
        return (0..n).map(|source_idx| Edit::Remove { source_idx }).collect();
    }

    let trace = forward(source, dest);
    backtrack(&trace, n, m)
}

/// Apply an edit script to `source`, processing operations in order.
///
/// A Remove at source index `i` lands at `i + inserted - removed` in the
/// working list; an Insert at destination index `j` lands at `j`, because
/// the first `j` destination elements are already in place when it runs.
/// Ops whose position falls outside the working list are skipped.
pub fn apply_edit_script(source: &[ElementId], ops: &[EditOp]) -> Vec<ElementId> {
    let mut out = source.to_vec();
    let mut offset: isize = 0;

    for op in ops {
        match op.op {
            OpKind::Remove => {
                let pos = op.index as isize + offset;
                if pos < 0 || pos as usize >= out.len() {
                    continue;
                }
                out.remove(pos as usize);
                offset -= 1;
            }
            OpKind::Insert => {
                if op.index > out.len() {
                    continue;
                }
                out.insert(op.index, op.id.clone());
                offset += 1;
            }
        }
    }

    out
}

/// Compute several independent edit scripts in parallel.
#[cfg(feature = "parallel")]
pub fn edit_scripts_par(pairs: &[(Vec<ElementId>, Vec<ElementId>)]) -> Vec<Vec<EditOp>> {
    use rayon::prelude::*;

    pairs
        .par_iter()
        .map(|(source, dest)| edit_script(source, dest))
        .collect()
}

// =============================================================================
// Myers Core
// =============================================================================

/// Forward pass. Returns the snapshot of `v` taken before each round `d`.
fn forward<T: PartialEq>(source: &[T], dest: &[T]) -> Vec<Vec<usize>> {
    let n = source.len();
    let m = dest.len();
    let max_d = n + m;
    let offset = max_d as isize;

    // One extra slot: round d reads v[k+1] with k up to d.
    let mut v = vec![0usize; 2 * max_d + 2];
    let mut trace: Vec<Vec<usize>> = Vec::new();

    for d in 0..=max_d as isize {
        trace.push(v.clone());

        for k in (-d..=d).step_by(2) {
            let kk = (k + offset) as usize;

            // At k=-d we can only have come down from k+1 (insert),
            // at k=d only across from k-1 (remove).
            let mut x = if k == -d || (k != d && v[kk - 1] < v[kk + 1]) {
                v[kk + 1]
            } else {
                v[kk - 1] + 1
            };
            let mut y = (x as isize - k) as usize;

            while x < n && y < m && source[x] == dest[y] {
                x += 1;
                y += 1;
            }

            v[kk] = x;

            if x >= n && y >= m {
                return trace;
            }
        }
    }

    trace
}

/// Walk the snapshots backwards, one edit per round.
fn backtrack(trace: &[Vec<usize>], n: usize, m: usize) -> Vec<Edit> {
    let offset = (n + m) as isize;
    let mut x = n as isize;
    let mut y = m as isize;
    let mut edits = Vec::with_capacity(trace.len().saturating_sub(1));

    for d in (1..trace.len() as isize).rev() {
        let v = &trace[d as usize];
        let k = x - y;
        let kk = (k + offset) as usize;

        let prev_k = if k == -d || (k != d && v[kk - 1] < v[kk + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize] as isize;
        let prev_y = prev_x - prev_k;

        if prev_k < k {
            // x advanced by one: source[prev_x] was removed
            edits.push(Edit::Remove {
                source_idx: prev_x as usize,
            });
        } else {
            // y advanced by one: dest[prev_y] was inserted
            edits.push(Edit::Insert {
                dest_idx: prev_y as usize,
            });
        }

        x = prev_x;
        y = prev_y;
    }

    edits.reverse();
    edits
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(names: &[&str]) -> Vec<ElementId> {
        names.iter().map(|&n| ElementId::from(n)).collect()
    }

    /// Insert/remove-only edit distance via LCS: n + m - 2 * lcs.
    fn lcs_distance(a: &[ElementId], b: &[ElementId]) -> usize {
        let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
        for i in 0..a.len() {
            for j in 0..b.len() {
                dp[i + 1][j + 1] = if a[i] == b[j] {
                    dp[i][j] + 1
                } else {
                    dp[i][j + 1].max(dp[i + 1][j])
                };
            }
        }
        a.len() + b.len() - 2 * dp[a.len()][b.len()]
    }

    #[test]
    fn test_reference_scenario() {
        let a = ids(&["a", "b", "c", "e", "f", "h"]);
        let b = ids(&["b", "c", "d", "e", "f", "g"]);

        let script = edit_script(&a, &b);
        assert_eq!(
            script,
            vec![
                EditOp::remove("a", 0),
                EditOp::insert("d", 2),
                EditOp::remove("h", 5),
                EditOp::insert("g", 5),
            ]
        );
        assert_eq!(apply_edit_script(&a, &script), b);
    }

    #[test]
    fn test_empty_sequences() {
        assert!(edit_script(&[], &[]).is_empty());
    }

    #[test]
    fn test_insert_all() {
        let b = ids(&["x", "y", "z"]);
        let script = edit_script(&[], &b);
        assert_eq!(
            script,
            vec![
                EditOp::insert("x", 0),
                EditOp::insert("y", 1),
                EditOp::insert("z", 2),
            ]
        );
    }

    #[test]
    fn test_remove_all() {
        let a = ids(&["x", "y"]);
        let script = edit_script(&a, &[]);
        assert_eq!(script, vec![EditOp::remove("x", 0), EditOp::remove("y", 1)]);
        assert!(apply_edit_script(&a, &script).is_empty());
    }

    #[test]
    fn test_identical_sequences() {
        let a = ids(&["a", "b", "c"]);
        assert!(edit_script(&a, &a).is_empty());
    }

    #[test]
    fn test_reorder_is_remove_plus_insert() {
        let a = ids(&["a", "b"]);
        let b = ids(&["b", "a"]);
        let script = edit_script(&a, &b);
        assert_eq!(script.len(), 2);
        assert_eq!(apply_edit_script(&a, &script), b);
    }

    #[test]
    fn test_duplicates_are_positional() {
        let a = ids(&["a", "a", "b"]);
        let b = ids(&["a", "b", "a"]);
        let script = edit_script(&a, &b);
        assert_eq!(script.len(), 2);
        assert_eq!(apply_edit_script(&a, &script), b);
    }

    #[test]
    fn test_diff_indices_generic() {
        let edits = diff_indices(&[1, 2, 3], &[1, 3, 4]);
        assert_eq!(
            edits,
            vec![Edit::Remove { source_idx: 1 }, Edit::Insert { dest_idx: 2 }]
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let pairs = vec![
            (ids(&["a", "b"]), ids(&["b"])),
            (ids(&[]), ids(&["c"])),
        ];
        let scripts = edit_scripts_par(&pairs);
        assert_eq!(scripts[0], edit_script(&pairs[0].0, &pairs[0].1));
        assert_eq!(scripts[1], edit_script(&pairs[1].0, &pairs[1].1));
    }

    fn small_seq() -> impl Strategy<Value = Vec<ElementId>> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", "e"]), 0..12)
            .prop_map(|v| v.into_iter().map(ElementId::from).collect())
    }

    proptest! {
        #[test]
        fn prop_script_transforms_source_into_dest(a in small_seq(), b in small_seq()) {
            let script = edit_script(&a, &b);
            prop_assert_eq!(apply_edit_script(&a, &script), b);
        }

        #[test]
        fn prop_script_is_minimal(a in small_seq(), b in small_seq()) {
            let script = edit_script(&a, &b);
            prop_assert_eq!(script.len(), lcs_distance(&a, &b));
        }
    }
}
