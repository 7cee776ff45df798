//! Procedural generation of structured high-order element blocks.
use crate::element::ElementDescription;
use crate::mesh::UniformElementBlock;
use eyre::eyre;
use nalgebra::DMatrix;

/// A structured block with its nodal coordinates (`dimension x num_nodes`).
#[derive(Debug, Clone)]
pub struct StructuredBlock {
    pub block: UniformElementBlock,
    pub coordinates: DMatrix<f64>,
}

/// Generates a structured block of `cells_per_dim` elements covering the axis-aligned box
/// `[lower, upper]`, with element nodes at the Gauss-Lobatto-Legendre positions of
/// `description`.
///
/// Global nodes are numbered lexicographically over the global node grid, with the first
/// coordinate varying fastest.
pub fn create_structured_block(
    description: &ElementDescription,
    cells_per_dim: &[usize],
    lower: &[f64],
    upper: &[f64],
) -> eyre::Result<StructuredBlock> {
    let dim = description.dimension();
    if cells_per_dim.len() != dim || lower.len() != dim || upper.len() != dim {
        return Err(eyre!("Expected {dim}-dimensional block parameters"));
    }
    if cells_per_dim.iter().any(|&n| n == 0) {
        return Err(eyre!("Number of cells must be positive in every direction"));
    }
    if lower.iter().zip(upper).any(|(a, b)| a >= b) {
        return Err(eyre!("Lower corner must be strictly below upper corner"));
    }

    let order = description.polynomial_order();
    let locs = description.node_locs_1d();
    let grid_points: Vec<usize> = cells_per_dim.iter().map(|&n| n * order + 1).collect();

    // 1D grid coordinates per direction
    let axes: Vec<Vec<f64>> = (0..dim)
        .map(|d| {
            let h = (upper[d] - lower[d]) / cells_per_dim[d] as f64;
            (0..grid_points[d])
                .map(|g| {
                    let (cell, local) = if g == grid_points[d] - 1 {
                        (cells_per_dim[d] - 1, order)
                    } else {
                        (g / order, g % order)
                    };
                    lower[d] + h * (cell as f64 + 0.5 * (locs[local] + 1.0))
                })
                .collect()
        })
        .collect();

    let num_nodes: usize = grid_points.iter().product();
    let grid_index = |g: &[usize]| -> usize {
        let mut index = 0;
        for d in (0..dim).rev() {
            index = index * grid_points[d] + g[d];
        }
        index
    };

    let mut coordinates = DMatrix::zeros(dim, num_nodes);
    let mut g = vec![0; dim];
    for node in 0..num_nodes {
        let mut remainder = node;
        for d in 0..dim {
            g[d] = remainder % grid_points[d];
            remainder /= grid_points[d];
            coordinates[(d, node)] = axes[d][g[d]];
        }
    }

    let num_elements: usize = cells_per_dim.iter().product();
    let mut connectivity = Vec::with_capacity(num_elements * description.nodes_per_element());
    let mut cell = vec![0; dim];
    for element in 0..num_elements {
        let mut remainder = element;
        for d in 0..dim {
            cell[d] = remainder % cells_per_dim[d];
            remainder /= cells_per_dim[d];
        }
        for local in 0..description.nodes_per_element() {
            let tensor_index = description.tensor_index(local);
            for d in 0..dim {
                g[d] = cell[d] * order + tensor_index[d];
            }
            connectivity.push(grid_index(&g));
        }
    }

    let block = UniformElementBlock::new(description.nodes_per_element(), num_nodes, connectivity)?;
    Ok(StructuredBlock { block, coordinates })
}
