//! Stationary relaxation sweeps: Jacobi, Gauss-Seidel and symmetric Gauss-Seidel.
//!
//! Every sweep overwrites `x` with one step of the chosen method for `A x = b`.
//! Start-from-zero variants skip the couplings to not yet updated entries and
//! are only exact for an incoming `x = 0`; the relaxed `GaussSeidel0` still
//! reads the old `x_i` through its `(1 - ω) x_i` term. As preconditioners
//! (`z = M⁻¹ r`) they clear `z` before the sweep. Continue variants start
//! from the current `x` and are the usual smoothers.
//!
//! The diagonal entry of every row must be stored; a structurally missing
//! diagonal is reported as [`KError::ZeroPivot`]. A stored zero diagonal is a
//! precondition violation and yields non-finite values.

use std::fmt;

use bitflags::bitflags;

use crate::core::traits::{Real, SparseMatrix};
use crate::error::KError;
use crate::matrix::SparseMatDiag;
use crate::preconditioner::Preconditioner;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct SweepType: u32 {
        const ZERO_INITIAL_GUESS = 0b0001;
        const FORWARD            = 0b0010; // forward Gauss–Seidel
        const BACKWARD           = 0b0100; // backward
        const SYMMETRIC          = Self::FORWARD.bits() | Self::BACKWARD.bits();
        const JACOBI             = 0b1000;
    }
}

/// The available relaxation variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelaxationMethod {
    Jacobi,
    GaussSeidel,
    SymmetricGaussSeidel,
    SymmetricGaussSeidel0,
    /// Jacobi with over-relaxation
    Jor,
    /// Gauss-Seidel with over-relaxation
    Sor,
    /// Symmetric Gauss-Seidel with over-relaxation
    Ssor,
    Ssor0,
    /// `SymmetricGaussSeidel0` with cached diagonal positions
    SymmetricGaussSeidel0Diag,
    /// `Ssor0` with cached diagonal positions
    Ssor0Diag,
    /// Identity
    Dummy,
    GaussSeidel0,
    Jacobi0,
}

impl RelaxationMethod {
    /// Direction and start policy of the underlying sweep.
    pub fn sweep_type(self) -> SweepType {
        use RelaxationMethod::*;
        match self {
            Jacobi | Jor => SweepType::JACOBI,
            Jacobi0 => SweepType::JACOBI | SweepType::ZERO_INITIAL_GUESS,
            GaussSeidel | Sor => SweepType::FORWARD,
            GaussSeidel0 => SweepType::FORWARD | SweepType::ZERO_INITIAL_GUESS,
            SymmetricGaussSeidel | Ssor => SweepType::SYMMETRIC,
            SymmetricGaussSeidel0 | Ssor0 | SymmetricGaussSeidel0Diag | Ssor0Diag => {
                SweepType::SYMMETRIC | SweepType::ZERO_INITIAL_GUESS
            }
            Dummy => SweepType::empty(),
        }
    }

    /// Whether the over-relaxation factor takes part in the sweep.
    pub fn has_omega(self) -> bool {
        use RelaxationMethod::*;
        matches!(self, Jor | Sor | Ssor | Ssor0 | Ssor0Diag | GaussSeidel0 | Jacobi0)
    }

    /// Whether diagonal positions are cached between applications.
    pub fn has_diag(self) -> bool {
        matches!(self, RelaxationMethod::SymmetricGaussSeidel0Diag | RelaxationMethod::Ssor0Diag)
    }
}

fn diag_index<M, T>(a: &M, i: usize, diag: Option<&SparseMatDiag>) -> Result<usize, KError>
where
    M: SparseMatrix<T> + ?Sized,
    T: Real,
{
    match diag {
        Some(d) => Ok(d.position(i)),
        None => a.diag_position(i).ok_or(KError::ZeroPivot(i)),
    }
}

/// One relaxation sweep on `x` for `A x = b`.
///
/// `omega` is used as given; pass one for the plain (non-relaxed) methods.
pub fn relax_step<M, T>(
    a: &M,
    x: &mut [T],
    b: &[T],
    sweep: SweepType,
    omega: T,
    diag: Option<&SparseMatDiag>,
) -> Result<(), KError>
where
    M: SparseMatrix<T> + ?Sized,
    T: Real,
{
    let n = a.nrows();
    assert_eq!(x.len(), n, "relax_step: x has incorrect length");
    assert_eq!(b.len(), n, "relax_step: b has incorrect length");
    let zero_start = sweep.contains(SweepType::ZERO_INITIAL_GUESS);

    if sweep.is_empty() {
        x.copy_from_slice(b);
        return Ok(());
    }

    if sweep.contains(SweepType::JACOBI) {
        if zero_start {
            for i in 0..n {
                let (_, vals) = a.row(i);
                let aii = vals[diag_index(a, i, diag)?];
                x[i] = omega * b[i] / aii;
            }
        } else {
            let mut y = vec![T::zero(); n];
            for i in 0..n {
                let (cols, vals) = a.row(i);
                let mut sum = b[i];
                let mut aii = T::zero();
                let mut found = false;
                for (&j, &v) in cols.iter().zip(vals) {
                    if j != i {
                        sum = sum - v * x[j];
                    } else {
                        aii = v;
                        found = true;
                    }
                }
                if !found {
                    return Err(KError::ZeroPivot(i));
                }
                y[i] = (T::one() - omega) * x[i] + omega * sum / aii;
            }
            x.copy_from_slice(&y);
        }
        return Ok(());
    }

    if sweep.contains(SweepType::FORWARD) {
        for i in 0..n {
            let (cols, vals) = a.row(i);
            let d = diag_index(a, i, diag)?;
            let mut sum = b[i];
            for k in 0..d {
                sum = sum - vals[k] * x[cols[k]];
            }
            if zero_start && sweep.contains(SweepType::BACKWARD) {
                x[i] = omega * sum / vals[d];
            } else if zero_start {
                // Lower part only; x_i is still the incoming (zero) value.
                x[i] = (T::one() - omega) * x[i] + omega * sum / vals[d];
            } else {
                for k in d + 1..cols.len() {
                    sum = sum - vals[k] * x[cols[k]];
                }
                x[i] = (T::one() - omega) * x[i] + omega * sum / vals[d];
            }
        }
    }

    if sweep.contains(SweepType::BACKWARD) {
        let two = T::one() + T::one();
        for i in (0..n).rev() {
            let (cols, vals) = a.row(i);
            let d = diag_index(a, i, diag)?;
            if zero_start && sweep.contains(SweepType::FORWARD) {
                // The forward pass left (b - L x)_i = a_ii x_i / omega in place.
                let mut sum = T::zero();
                for k in d + 1..cols.len() {
                    sum = sum - vals[k] * x[cols[k]];
                }
                x[i] = (two - omega) * x[i] + omega * sum / vals[d];
            } else if zero_start {
                let mut sum = b[i];
                for k in d + 1..cols.len() {
                    sum = sum - vals[k] * x[cols[k]];
                }
                x[i] = omega * sum / vals[d];
            } else {
                let mut sum = b[i];
                for (k, (&j, &v)) in cols.iter().zip(vals).enumerate() {
                    if k != d {
                        sum = sum - v * x[j];
                    }
                }
                x[i] = (T::one() - omega) * x[i] + omega * sum / vals[d];
            }
        }
    }
    Ok(())
}

/// Relaxation preconditioner/smoother for a fixed [`RelaxationMethod`].
#[derive(Clone, Debug)]
pub struct Relaxation<T> {
    method: RelaxationMethod,
    sweep: SweepType,
    omega: T,
    diag: Option<SparseMatDiag>,
}

impl<T: Real> Relaxation<T> {
    pub fn new(method: RelaxationMethod, omega: T) -> Self {
        Self { method, sweep: method.sweep_type(), omega, diag: None }
    }

    pub fn ssor_smooth(omega: T) -> Self {
        Self::new(RelaxationMethod::Ssor, omega)
    }
    pub fn sor_smooth(omega: T) -> Self {
        Self::new(RelaxationMethod::Sor, omega)
    }
    pub fn sgs_smooth() -> Self {
        Self::new(RelaxationMethod::SymmetricGaussSeidel, T::one())
    }
    pub fn jor_smooth(omega: T) -> Self {
        Self::new(RelaxationMethod::Jor, omega)
    }
    pub fn gs_smooth() -> Self {
        Self::new(RelaxationMethod::GaussSeidel, T::one())
    }
    pub fn jac_pc(omega: T) -> Self {
        Self::new(RelaxationMethod::Jacobi0, omega)
    }
    pub fn sgs_pc() -> Self {
        Self::new(RelaxationMethod::SymmetricGaussSeidel0, T::one())
    }
    pub fn ssor_pc(omega: T) -> Self {
        Self::new(RelaxationMethod::Ssor0, omega)
    }
    pub fn ssor_diag_pc(omega: T) -> Self {
        Self::new(RelaxationMethod::Ssor0Diag, omega)
    }
    pub fn gs_pc(omega: T) -> Self {
        Self::new(RelaxationMethod::GaussSeidel0, omega)
    }

    pub fn method(&self) -> RelaxationMethod {
        self.method
    }
    pub fn omega(&self) -> T {
        self.omega
    }
    pub fn set_omega(&mut self, omega: T) {
        self.omega = omega;
    }

    fn effective_omega(&self) -> T {
        if self.method.has_omega() { self.omega } else { T::one() }
    }

    fn refresh_diag<M>(&mut self, a: &M) -> Result<(), KError>
    where
        M: SparseMatrix<T> + ?Sized,
    {
        if !self.method.has_diag() {
            return Ok(());
        }
        let stale = match &self.diag {
            Some(d) => !d.is_valid_for(a),
            None => true,
        };
        if stale {
            self.diag = Some(SparseMatDiag::new(a)?);
        }
        Ok(())
    }

    /// Run `sweeps` sweeps on `x` for `A x = b`.
    pub fn smooth<M>(&mut self, a: &M, x: &mut [T], b: &[T], sweeps: usize) -> Result<(), KError>
    where
        M: SparseMatrix<T> + ?Sized,
    {
        self.refresh_diag(a)?;
        let omega = self.effective_omega();
        for _ in 0..sweeps {
            relax_step(a, x, b, self.sweep, omega, self.diag.as_ref())?;
        }
        Ok(())
    }
}

impl<T> fmt::Display for Relaxation<T>
where
    T: Real,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relaxation(method={:?}, omega={}, sweep={:?})", self.method, self.omega, self.sweep)
    }
}

impl<M, T> Preconditioner<M, T> for Relaxation<T>
where
    M: SparseMatrix<T> + ?Sized,
    T: Real,
{
    fn setup(&mut self, a: &M) -> Result<(), KError> {
        self.diag = None;
        self.refresh_diag(a)
    }

    fn apply(&mut self, a: &M, r: &[T], z: &mut [T]) -> Result<(), KError> {
        if self.sweep.contains(SweepType::ZERO_INITIAL_GUESS) {
            z.fill(T::zero());
        }
        self.smooth(a, z, r, 1)
    }
}

/// Several SSOR sweeps as one preconditioner application.
///
/// The first sweep starts from zero, the remaining `num - 1` continue from the
/// current iterate.
#[derive(Clone, Debug)]
pub struct MultiSsorPc<T> {
    omega: T,
    num: usize,
}

impl<T: Real> MultiSsorPc<T> {
    pub fn new(omega: T, num: usize) -> Self {
        Self { omega, num }
    }
    pub fn sweeps(&self) -> usize {
        self.num
    }
}

impl<M, T> Preconditioner<M, T> for MultiSsorPc<T>
where
    M: SparseMatrix<T> + ?Sized,
    T: Real,
{
    fn apply(&mut self, a: &M, r: &[T], z: &mut [T]) -> Result<(), KError> {
        relax_step(a, z, r, SweepType::SYMMETRIC | SweepType::ZERO_INITIAL_GUESS, self.omega, None)?;
        for _ in 1..self.num {
            relax_step(a, z, r, SweepType::SYMMETRIC, self.omega, None)?;
        }
        Ok(())
    }
}
