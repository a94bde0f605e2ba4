//! Context module for krysolve.
//!
//! Factories that turn [`KspOptions`](crate::config::KspOptions) into
//! preconditioners and solver drivers.
//!
//! Modules:
//! - [`ksp_context`]: the `KspContext` solver pipeline and `build_solver`.
//! - [`pc_context`]: `build_preconditioner`.

pub mod ksp_context;
pub mod pc_context;

pub use ksp_context::{BoxedSolver, KspContext, build_solver};
pub use pc_context::{BoxedPc, build_preconditioner};
