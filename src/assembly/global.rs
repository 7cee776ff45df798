//! Global sparse systems that element contributions are scattered into.
use crate::mesh::ElementBlock;
use eyre::{eyre, WrapErr};
use nalgebra::storage::Storage;
use nalgebra::{DMatrix, DVector, Dyn, Matrix, U1};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use parking_lot::Mutex;
use std::collections::BTreeSet;

/// Receiver of local element systems.
///
/// Local rows and columns are ordered node by node, with index `dofs_per_node * n + c` for
/// component `c` of element node `n`.
pub trait LinearSystemSink: Sync {
    fn dofs_per_node(&self) -> usize;

    /// Adds a local system.
    ///
    /// `sorted_permutation` holds the local indices of the element nodes, ordered such that
    /// the corresponding global indices are sorted.
    fn sum_into(
        &self,
        lhs: &DMatrix<f64>,
        rhs: &DVector<f64>,
        element_nodes: &[usize],
        sorted_permutation: &[usize],
    ) -> eyre::Result<()>;
}

/// Sparsity pattern coupling all degrees of freedom of nodes that share an element.
pub fn assemble_pattern(block: &dyn ElementBlock, dofs_per_node: usize) -> eyre::Result<SparsityPattern> {
    // Here we optimize for memory usage rather than performance: by collecting into a
    // BTreeSet we store each matrix entry exactly once.
    let sdim = dofs_per_node;
    let mut matrix_entries = BTreeSet::new();
    let mut element_global_nodes = vec![usize::MAX; block.nodes_per_element()];
    for i in 0..block.num_elements() {
        block.populate_element_nodes(&mut element_global_nodes, i);

        for node_i in &element_global_nodes {
            for node_j in &element_global_nodes {
                for s_i in 0..sdim {
                    for s_j in 0..sdim {
                        matrix_entries.insert((sdim * node_i + s_i, sdim * node_j + s_j));
                    }
                }
            }
        }
    }

    let num_rows = sdim * block.num_nodes();
    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(matrix_entries.len());

    offsets.push(0);
    for (i, j) in matrix_entries {
        while i + 1 > offsets.len() {
            // This condition indicates that we have reached a new row. We need to run this
            // in a while loop to correctly handle consecutive empty rows
            offsets.push(column_indices.len());
        }
        column_indices.push(j);
    }

    // Make sure we fill out the remaining offsets if the last rows are empty
    while offsets.len() < (num_rows + 1) {
        offsets.push(column_indices.len());
    }

    SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, offsets, column_indices)
        .wrap_err("Failed to construct sparsity pattern from element block")
}

#[derive(Debug, Clone, Default)]
struct SystemRow {
    values: Vec<f64>,
    rhs: f64,
}

/// A CSR matrix with right-hand side that can be summed into from many threads.
///
/// Each global row is guarded by its own lock, and a scatter holds at most one row lock at
/// a time.
#[derive(Debug)]
pub struct CsrLinearSystem {
    pattern: SparsityPattern,
    dofs_per_node: usize,
    rows: Vec<Mutex<SystemRow>>,
}

impl CsrLinearSystem {
    pub fn from_pattern(pattern: SparsityPattern, dofs_per_node: usize) -> eyre::Result<Self> {
        if dofs_per_node == 0 {
            return Err(eyre!("At least one degree of freedom per node is required"));
        }
        if pattern.major_dim() != pattern.minor_dim() || pattern.major_dim() % dofs_per_node != 0 {
            return Err(eyre!(
                "Pattern of shape {}x{} is incompatible with {dofs_per_node} dof(s) per node",
                pattern.major_dim(),
                pattern.minor_dim()
            ));
        }
        let rows = (0..pattern.major_dim())
            .map(|i| {
                Mutex::new(SystemRow {
                    values: vec![0.0; pattern.lane(i).len()],
                    rhs: 0.0,
                })
            })
            .collect();
        Ok(Self {
            pattern,
            dofs_per_node,
            rows,
        })
    }

    pub fn from_element_block(block: &dyn ElementBlock, dofs_per_node: usize) -> eyre::Result<Self> {
        Self::from_pattern(assemble_pattern(block, dofs_per_node)?, dofs_per_node)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    /// Zeros all matrix entries and the right-hand side.
    pub fn reset(&self) {
        for row in &self.rows {
            let mut row = row.lock();
            row.values.fill(0.0);
            row.rhs = 0.0;
        }
    }

    pub fn rhs(&self) -> DVector<f64> {
        DVector::from_iterator(self.rows.len(), self.rows.iter().map(|row| row.lock().rhs))
    }

    pub fn to_csr(&self) -> eyre::Result<CsrMatrix<f64>> {
        let values = self
            .rows
            .iter()
            .flat_map(|row| row.lock().values.clone())
            .collect();
        CsrMatrix::try_from_pattern_and_values(self.pattern.clone(), values)
            .map_err(|e| eyre!("Failed to construct CSR matrix: {e}"))
    }

    pub fn into_parts(self) -> eyre::Result<(CsrMatrix<f64>, DVector<f64>)> {
        let matrix = self.to_csr()?;
        Ok((matrix, self.rhs()))
    }
}

impl LinearSystemSink for CsrLinearSystem {
    fn dofs_per_node(&self) -> usize {
        self.dofs_per_node
    }

    fn sum_into(
        &self,
        lhs: &DMatrix<f64>,
        rhs: &DVector<f64>,
        element_nodes: &[usize],
        sorted_permutation: &[usize],
    ) -> eyre::Result<()> {
        let sdim = self.dofs_per_node;
        let n = sdim * element_nodes.len();
        if lhs.shape() != (n, n) || rhs.len() != n {
            return Err(eyre!(
                "Local system of shape {:?} and length {} does not match {} node(s) with {sdim} dof(s)",
                lhs.shape(),
                rhs.len(),
                element_nodes.len()
            ));
        }

        for (local_node_idx, global_node_idx) in element_nodes.iter().enumerate() {
            for i in 0..sdim {
                let local_row_index = sdim * local_node_idx + i;
                let global_row_index = sdim * global_node_idx + i;
                let row = self
                    .rows
                    .get(global_row_index)
                    .ok_or_else(|| eyre!("Row {global_row_index} out of bounds"))?;
                let column_indices = self.pattern.lane(global_row_index);

                let mut row = row.lock();
                add_element_row_to_csr_row(
                    column_indices,
                    &mut row.values,
                    element_nodes,
                    sorted_permutation,
                    sdim,
                    &lhs.row(local_row_index),
                )?;
                row.rhs += rhs[local_row_index];
            }
        }
        Ok(())
    }
}

/// Add a row of a local element matrix to the provided row of a CSR matrix.
///
/// `node_connectivity`: The global indices of nodes.
/// `sorted_permutation`: The local indices of nodes in the element, ordered such that the
///    corresponding global indices are sorted.
/// `dim`: The solution dimension.
/// `local_row`: The local row of the element matrix that should be added to the CSR matrix.
fn add_element_row_to_csr_row<S>(
    column_indices: &[usize],
    values: &mut [f64],
    node_connectivity: &[usize],
    sorted_permutation: &[usize],
    dim: usize,
    local_row: &Matrix<f64, U1, Dyn, S>,
) -> eyre::Result<()>
where
    S: Storage<f64, U1, Dyn>,
{
    assert_eq!(node_connectivity.len(), sorted_permutation.len());
    assert_eq!(node_connectivity.len() * dim, local_row.ncols());
    assert!(dim >= 1);

    let mut csr_col_idx_iter = column_indices.iter().copied().enumerate();

    for &node_local_idx in sorted_permutation {
        let node_global_idx = node_connectivity[node_local_idx];

        for i in 0..dim {
            let local_col_idx = dim * node_local_idx + i;
            let global_col_index = dim * node_global_idx + i;

            let (local_csr_col_idx, _) = csr_col_idx_iter
                .find(|(_, csr_col_idx)| *csr_col_idx == global_col_index)
                .ok_or_else(|| eyre!("Column {global_col_index} is not part of the sparsity pattern"))?;
            values[local_csr_col_idx] += local_row[local_col_idx];
        }
    }
    Ok(())
}
