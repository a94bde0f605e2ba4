//! Command-line or API options for solvers and preconditioners.
//!
//! `KspOptions` collects everything [`KspContext`](crate::context::KspContext)
//! needs to assemble a solver pipeline. Solver and preconditioner kinds parse
//! from their lowercase names, so parameter files can name them directly.

use std::fmt;
use std::str::FromStr;

use crate::core::traits::{Real, real};
use crate::error::KError;
use crate::solver::Preconditioning;

/// Krylov method selected by [`KspOptions::solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Conjugate gradients (SPD, ignores the preconditioner)
    Cg,
    /// Preconditioned conjugate gradients (SPD)
    #[default]
    Pcg,
    /// Preconditioned CG on the normal equations A·Aᵗ u = b
    Pcgne,
    /// Restarted GMRES, left or right preconditioned
    Gmres,
    BiCgStab,
    /// Truncated GCR
    Gcr,
    /// GCR with inner GMRES
    Gmresr,
    /// IDR(s)
    Idrs,
    /// MINRES (symmetric indefinite, ignores the preconditioner)
    Minres,
    /// MINRES on a preconditioned Lanczos basis (SPD preconditioner)
    Pminres,
}

impl SolverKind {
    pub const ALL: [SolverKind; 10] = [
        SolverKind::Cg,
        SolverKind::Pcg,
        SolverKind::Pcgne,
        SolverKind::Gmres,
        SolverKind::BiCgStab,
        SolverKind::Gcr,
        SolverKind::Gmresr,
        SolverKind::Idrs,
        SolverKind::Minres,
        SolverKind::Pminres,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Cg => "cg",
            SolverKind::Pcg => "pcg",
            SolverKind::Pcgne => "pcgne",
            SolverKind::Gmres => "gmres",
            SolverKind::BiCgStab => "bicgstab",
            SolverKind::Gcr => "gcr",
            SolverKind::Gmresr => "gmresr",
            SolverKind::Idrs => "idrs",
            SolverKind::Minres => "minres",
            SolverKind::Pminres => "pminres",
        }
    }

    /// Whether the driver measures the residual relative to ‖b‖ unless told otherwise.
    pub fn relative_by_default(self) -> bool {
        matches!(
            self,
            SolverKind::Gmres | SolverKind::BiCgStab | SolverKind::Gcr | SolverKind::Gmresr | SolverKind::Idrs
        )
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        SolverKind::ALL
            .into_iter()
            .find(|k| k.name() == key)
            .ok_or_else(|| KError::InvalidParameter(format!("unknown solver '{s}'")))
    }
}

/// Preconditioner selected by [`KspOptions::pc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PcKind {
    /// Identity
    #[default]
    None,
    /// One Jacobi sweep from zero, scaled by ω
    Jacobi,
    /// Inverse diagonal of A, computed once
    Diag,
    /// Gauss-Seidel from zero, scaled by ω
    Gs,
    /// Symmetric Gauss-Seidel from zero
    Sgs,
    /// SSOR from zero
    Ssor,
    /// SSOR from zero with a cached diagonal
    SsorDiag,
    /// `sweeps` SSOR sweeps
    MultiSsor,
    /// Gauss-Seidel on A·Aᵗ (symmetric)
    Negs,
}

impl PcKind {
    pub const ALL: [PcKind; 9] = [
        PcKind::None,
        PcKind::Jacobi,
        PcKind::Diag,
        PcKind::Gs,
        PcKind::Sgs,
        PcKind::Ssor,
        PcKind::SsorDiag,
        PcKind::MultiSsor,
        PcKind::Negs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PcKind::None => "none",
            PcKind::Jacobi => "jacobi",
            PcKind::Diag => "diag",
            PcKind::Gs => "gs",
            PcKind::Sgs => "sgs",
            PcKind::Ssor => "ssor",
            PcKind::SsorDiag => "ssordiag",
            PcKind::MultiSsor => "multissor",
            PcKind::Negs => "negs",
        }
    }
}

impl fmt::Display for PcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for PcKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        if key == "dummy" || key == "identity" {
            return Ok(PcKind::None);
        }
        PcKind::ALL
            .into_iter()
            .find(|k| k.name() == key)
            .ok_or_else(|| KError::InvalidParameter(format!("unknown preconditioner '{s}'")))
    }
}

/// Solver pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct KspOptions<T> {
    pub solver: SolverKind,
    pub pc: PcKind,
    pub tol: T,
    pub max_iter: usize,
    /// `None` keeps the driver's own default (see [`SolverKind::relative_by_default`]).
    pub relative: Option<bool>,
    /// GMRES restart length; inner restart for GMRESR; truncation for GCR
    pub restart: usize,
    pub preconditioning: Preconditioning,
    /// GMRESR inner iteration budget
    pub inner_max_iter: usize,
    /// GMRESR inner relative tolerance
    pub inner_tol: T,
    /// Relaxation factor of the relaxation preconditioners
    pub omega: T,
    /// Sweeps of `PcKind::MultiSsor`
    pub sweeps: usize,
    /// IDR(s) shadow space dimension
    pub idrs_s: usize,
    pub omega_bound: T,
    pub seed: u64,
}

impl<T: Real> Default for KspOptions<T> {
    fn default() -> Self {
        Self {
            solver: SolverKind::default(),
            pc: PcKind::default(),
            tol: real(1e-8),
            max_iter: 1000,
            relative: None,
            restart: 30,
            preconditioning: Preconditioning::Left,
            inner_max_iter: 20,
            inner_tol: real(1e-2),
            omega: T::one(),
            sweeps: 2,
            idrs_s: 4,
            omega_bound: real(0.7),
            seed: 0x1d2_5eed,
        }
    }
}

impl<T: Real> KspOptions<T> {
    pub fn new(solver: SolverKind, pc: PcKind) -> Self {
        Self { solver, pc, ..Self::default() }
    }

    pub fn with_tol(mut self, tol: T) -> Self {
        self.tol = tol;
        self
    }
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }
    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = Some(relative);
        self
    }
    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }
    pub fn with_preconditioning(mut self, mode: Preconditioning) -> Self {
        self.preconditioning = mode;
        self
    }
    pub fn with_inner(mut self, max_iter: usize, tol: T) -> Self {
        self.inner_max_iter = max_iter;
        self.inner_tol = tol;
        self
    }
    pub fn with_omega(mut self, omega: T) -> Self {
        self.omega = omega;
        self
    }
    pub fn with_sweeps(mut self, sweeps: usize) -> Self {
        self.sweeps = sweeps;
        self
    }
    pub fn with_idrs(mut self, s: usize, omega_bound: T) -> Self {
        self.idrs_s = s;
        self.omega_bound = omega_bound;
        self
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Relative flag actually used by the driver.
    pub fn effective_relative(&self) -> bool {
        self.relative.unwrap_or_else(|| self.solver.relative_by_default())
    }

    /// Reject settings no driver could run with.
    pub fn validate(&self) -> Result<(), KError> {
        if self.tol.is_nan() || self.tol < T::zero() {
            return Err(KError::InvalidParameter(format!("tolerance {} must be non-negative", self.tol)));
        }
        let needs_restart = matches!(self.solver, SolverKind::Gmres | SolverKind::Gcr | SolverKind::Gmresr);
        if needs_restart && self.restart == 0 {
            return Err(KError::InvalidParameter(format!("{}: restart must be positive", self.solver)));
        }
        if self.solver == SolverKind::Idrs && self.idrs_s == 0 {
            return Err(KError::InvalidParameter("idrs: s must be positive".into()));
        }
        if self.pc == PcKind::MultiSsor && self.sweeps == 0 {
            return Err(KError::InvalidParameter("multissor: at least one sweep".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_names() {
        for k in SolverKind::ALL {
            assert_eq!(k.name().parse::<SolverKind>().unwrap(), k);
        }
        for k in PcKind::ALL {
            assert_eq!(k.to_string().parse::<PcKind>().unwrap(), k);
        }
        assert_eq!(" GMRES ".parse::<SolverKind>().unwrap(), SolverKind::Gmres);
        assert_eq!("dummy".parse::<PcKind>().unwrap(), PcKind::None);
        assert!(matches!("ilu0".parse::<PcKind>(), Err(KError::InvalidParameter(_))));
        assert!(matches!("qmr".parse::<SolverKind>(), Err(KError::InvalidParameter(_))));
    }

    #[test]
    fn relative_flag_follows_solver_default() {
        let opts = KspOptions::<f64>::new(SolverKind::Pcg, PcKind::Ssor);
        assert!(!opts.effective_relative());
        let opts = KspOptions::<f64>::new(SolverKind::Idrs, PcKind::None);
        assert!(opts.effective_relative());
        assert!(!opts.with_relative(false).effective_relative());
    }

    #[test]
    fn validate_rejects_unusable_settings() {
        assert!(KspOptions::<f64>::default().validate().is_ok());
        let bad = KspOptions::<f64>::new(SolverKind::Gmres, PcKind::None).with_restart(0);
        assert!(bad.validate().is_err());
        let bad = KspOptions::<f64>::default().with_tol(-1.0);
        assert!(bad.validate().is_err());
        let bad = KspOptions::<f64>::default().with_tol(f64::NAN);
        assert!(bad.validate().is_err());
    }
}
