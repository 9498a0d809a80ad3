//! CPU implementation of SparseCCL, following [DOI: 10.1109/DASIP48288.2019.9049184].
//!
//! Requires cells to be sorted in column major order. The same algorithm runs
//! on the GPU (`ccl_shaders::SPARSE_CCL`); both must stay in lockstep.

use crate::cell::CellCoords;

/// Upper bound on cells per module. The WGSL kernel allocates its equivalence
/// table statically at this size, so exceeding it is a configuration
/// precondition enforced at fill time, never checked inside the kernel.
pub const MAX_CELLS_PER_MODULE: usize = 1000;

/// Two cells are 8-connected when both channel deltas have magnitude <= 1.
///
/// Channels are unsigned; the wrapping square maps a delta of -1 to 1, so no
/// absolute value is needed.
pub fn is_adjacent<C: CellCoords>(a: &C, b: &C) -> bool {
    let d0 = a.channel0().wrapping_sub(b.channel0());
    let d1 = a.channel1().wrapping_sub(b.channel1());
    d0.wrapping_mul(d0) <= 1 && d1.wrapping_mul(d1) <= 1
}

/// True when `a` is beyond 8-connectivity range of `b` in the sort dimension.
/// Valid only for `a` ordered after `b` (column major), which is why no
/// absolute value is taken.
pub fn is_far_enough<C: CellCoords>(a: &C, b: &C) -> bool {
    a.channel1().wrapping_sub(b.channel1()) > 1
}

/// Follows the equivalence table until a self-referencing root is found.
fn find_root(equiv: &[u32], e: u32) -> u32 {
    let mut r = e;
    while equiv[r as usize] != r {
        r = equiv[r as usize];
    }
    r
}

/// Unions two entries by attaching the larger root under the smaller one.
fn make_union(equiv: &mut [u32], e1: u32, e2: u32) -> u32 {
    let e = e1.min(e2);
    equiv[e1.max(e2) as usize] = e;
    e
}

/// Labels one module's cells in place and returns its cluster count.
///
/// `labels` doubles as the equivalence table during the first pass; on return
/// it holds dense 1-based cluster ids (0 never survives to the output).
///
/// # Panics
///
/// Panics if `labels.len() != cells.len()`.
pub fn sparse_ccl<C: CellCoords>(cells: &[C], labels: &mut [u32]) -> u32 {
    assert_eq!(cells.len(), labels.len());
    if cells.is_empty() {
        return 0;
    }

    // First pass: union-find over the 8-adjacency relation. `start_j` is the
    // sliding-window prune riding on the column major sort; it only ever
    // advances, never resets.
    let mut start_j = 0usize;
    for i in 0..cells.len() {
        labels[i] = i as u32;
        let mut ai = i as u32;
        for j in start_j..i {
            if is_adjacent(&cells[i], &cells[j]) {
                let root_j = find_root(labels, j as u32);
                ai = make_union(labels, ai, root_j);
            } else if is_far_enough(&cells[i], &cells[j]) {
                start_j += 1;
            }
        }
    }

    // Second pass: transitive closure. Roots receive the next sequential
    // label; non-roots chase one level through an already-resolved earlier
    // entry (roots are always at the minimum index of their cluster).
    let mut labels_count = 0u32;
    for i in 0..cells.len() {
        if labels[i] == i as u32 {
            labels_count += 1;
            labels[i] = labels_count;
        } else {
            labels[i] = labels[labels[i] as usize];
        }
    }

    labels_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::InputCell;

    fn cells(coords: &[(u32, u32)]) -> Vec<InputCell> {
        coords.iter().map(|&(c0, c1)| InputCell::new(c0, c1)).collect()
    }

    fn run(coords: &[(u32, u32)]) -> (Vec<u32>, u32) {
        let cells = cells(coords);
        let mut labels = vec![0u32; cells.len()];
        let clusters = sparse_ccl(&cells, &mut labels);
        (labels, clusters)
    }

    #[test]
    fn empty_module_yields_zero_clusters() {
        let (labels, clusters) = run(&[]);
        assert!(labels.is_empty());
        assert_eq!(clusters, 0);
    }

    #[test]
    fn two_clusters_with_shared_first_label() {
        // (0,0) and (1,0) touch; (5,5) is isolated. Column major sorted.
        let (labels, clusters) = run(&[(0, 0), (1, 0), (5, 5)]);
        assert_eq!(clusters, 2);
        assert_eq!(labels, vec![1, 1, 2]);
        assert_eq!(labels.iter().sum::<u32>(), 4);
    }

    #[test]
    fn chain_collapses_into_one_cluster() {
        let (labels, clusters) = run(&[(0, 0), (0, 1), (0, 2)]);
        assert_eq!(clusters, 1);
        assert_eq!(labels, vec![1, 1, 1]);
    }

    #[test]
    fn diagonal_neighbors_are_adjacent() {
        let (labels, clusters) = run(&[(0, 0), (1, 1)]);
        assert_eq!(clusters, 1);
        assert_eq!(labels, vec![1, 1]);
    }

    #[test]
    fn adjacency_is_symmetric() {
        let a = InputCell::new(3, 7);
        for b in [
            InputCell::new(2, 6),
            InputCell::new(3, 7),
            InputCell::new(4, 8),
            InputCell::new(3, 9),
            InputCell::new(100, 7),
        ] {
            assert_eq!(is_adjacent(&a, &b), is_adjacent(&b, &a));
        }
    }

    #[test]
    fn labels_are_dense_and_in_range() {
        let (labels, clusters) = run(&[
            (0, 0),
            (4, 0),
            (0, 1),
            (8, 1),
            (4, 2),
            (9, 2),
            (0, 5),
            (1, 5),
        ]);
        for &l in &labels {
            assert!(l >= 1 && l <= clusters);
        }
        for expected in 1..=clusters {
            assert!(labels.contains(&expected));
        }
    }

    #[test]
    fn kernel_is_idempotent_on_fresh_labels() {
        let coords = [(0, 0), (1, 0), (3, 1), (4, 1), (0, 4), (9, 9)];
        let (first, n1) = run(&coords);
        let (second, n2) = run(&coords);
        assert_eq!(n1, n2);
        assert_eq!(first, second);
    }
}
