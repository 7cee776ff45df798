//! Operations on the local system of a single element.
use crate::config::DiagonalRelaxation;
use nalgebra::DMatrix;

/// Divides every diagonal entry of a local matrix by the relaxation factor.
pub fn apply_diagonal_relaxation(lhs: &mut DMatrix<f64>, relaxation: &DiagonalRelaxation) {
    if let DiagonalRelaxation::Factor(factor) = *relaxation {
        // Dividing by one would be exact, skip the work
        if factor != 1.0 {
            for i in 0..lhs.nrows().min(lhs.ncols()) {
                lhs[(i, i)] /= factor;
            }
        }
    }
}

/// Computes the local node indices of an element ordered by increasing global index.
pub fn connectivity_permutation(element_global_nodes: &[usize], permutation: &mut Vec<usize>) {
    permutation.clear();
    permutation.extend(0..element_global_nodes.len());
    permutation.sort_unstable_by_key(|i| element_global_nodes[*i]);
}
