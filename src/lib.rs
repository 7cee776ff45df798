//! Element-level core of a control-volume finite element method with arbitrary-order
//! tensor-product elements.
//!
//! Reference elements ([`element`]), Lagrange bases ([`basis`]) and sub-control-volume
//! quadrature ([`quadrature`]) are combined into master elements ([`master_element`]), which
//! provide the tables and operators used by physics kernels ([`kernel`]). Kernels are executed
//! over batches of elements by the [`assembly::ElementSolverAlgorithm`].
pub mod assembly;
pub mod basis;
pub mod config;
pub mod element;
pub mod error;
pub mod field;
pub mod kernel;
pub mod master_element;
pub mod mesh;
pub mod quadrature;
pub mod scratch;
pub mod simd;
pub mod time_integrator;

mod workspace;

pub use workspace::Workspace;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate cvfem_quadrature;
pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
