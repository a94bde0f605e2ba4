//! krysolve: Krylov subspace solvers and relaxation preconditioners for
//! sparse finite-element systems.
//!
//! The crate provides stationary relaxation sweeps (Jacobi, Gauss-Seidel,
//! SSOR and their start-from-zero variants), preconditioner adapters, the
//! Krylov engines CG, PCG, PCGNE, GMRES, MINRES/PMINRES, BiCGSTAB, GCR,
//! GMRESR and IDR(s), and a small dense Gaussian-elimination solver. Every
//! engine is available as a free function and as a driver implementing
//! [`LinearSolver`] and [`IterativeSolver`]; [`KspContext`] assembles a
//! driver from [`KspOptions`].
//!
//! The library logs through the `log` facade and installs no logger.

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use self::core::*;
pub use error::*;
pub use matrix::*;
pub use preconditioner::*;
pub use solver::*;
pub use utils::*;
