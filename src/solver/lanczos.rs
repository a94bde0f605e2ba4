//! Lanczos basis generators for MINRES.
//!
//! Three-term recursions computing an orthonormal basis (q₀, q₁, ...) of the
//! Krylov space of a symmetric `A` for a start vector r₀, together with the
//! tridiagonal coefficients `a` (diagonal) and `b` (off-diagonal). See
//! A. Reusken, "Numerical methods for elliptic partial differential
//! equations", pp. 148-153.
//!
//! A *lucky breakdown* (`b < 1e-15`) means the Krylov space built so far is
//! A-invariant: the exact correction lies in it and MINRES terminates with
//! the exact solution on the following step.

use std::mem;

use crate::core::traits::{MatShape, MatVec, Real, real};
use crate::core::vector::{axpy, dot, norm, scale};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::utils::sbuffer::SBuffer;

const BREAKDOWN_THRESHOLD: f64 = 1e-15;

/// Current state of a Lanczos recursion.
pub trait LanczosWindow<T> {
    fn breakdown(&self) -> bool;
    /// Norm of the start vector (in the preconditioner's inner product).
    fn norm_r0(&self) -> T;
    /// Current basis vector q₀.
    fn q0(&self) -> &[T];
    /// Current diagonal coefficient.
    fn a0(&self) -> T;
    /// Off-diagonal coefficient `b[i]`, `i ∈ {-1, 0}`.
    fn b(&self, i: isize) -> T;
}

/// A Lanczos recursion on operator `M`, as consumed by [`pminres`](crate::solver::pminres).
pub trait LanczosBasis<M: ?Sized, T>: LanczosWindow<T> {
    /// Reset the recursion for start vector `r0` and compute the first step.
    fn new_basis(&mut self, a: &M, r0: &[T]) -> Result<(), KError>;
    /// Advance by one step. Returns false on lucky breakdown.
    fn next(&mut self, a: &M) -> Result<bool, KError>;
}

/// One plain Lanczos step. Writes q₂ and returns (a₁, b₁, !breakdown).
fn lanczos_step<M, T>(a: &M, q0: &[T], q1: &[T], q2: &mut [T], b0: T) -> (T, T, bool)
where
    M: MatVec<T> + ?Sized,
    T: Real,
{
    a.matvec(q1, q2);
    axpy(-b0, q0, q2);
    let a1 = dot(q2, q1);
    axpy(-a1, q1, q2);
    let b1 = norm(q2);
    if b1 < real(BREAKDOWN_THRESHOLD) {
        return (a1, b1, false);
    }
    scale(T::one() / b1, q2);
    (a1, b1, true)
}

/// Plain Lanczos recursion.
#[derive(Clone, Debug)]
pub struct Lanczos<T> {
    q: SBuffer<Vec<T>, 3>,
    b: SBuffer<T, 2>,
    a0: T,
    norm_r0: T,
    nobreakdown: bool,
}

impl<T: Real> Default for Lanczos<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> Lanczos<T> {
    pub fn new() -> Self {
        Self {
            q: SBuffer::filled(Vec::new()),
            b: SBuffer::filled(T::zero()),
            a0: T::zero(),
            norm_r0: T::zero(),
            nobreakdown: true,
        }
    }

    fn step<M>(&mut self, a: &M) -> bool
    where
        M: MatVec<T> + ?Sized,
    {
        let mut q2 = mem::take(&mut self.q[1]);
        let (a1, b1, ok) = lanczos_step(a, &self.q[-1], &self.q[0], &mut q2, self.b[-1]);
        self.q[1] = q2;
        self.a0 = a1;
        self.b[0] = b1;
        self.nobreakdown = ok;
        ok
    }
}

impl<M, T> LanczosBasis<M, T> for Lanczos<T>
where
    M: MatVec<T> + MatShape + ?Sized,
    T: Real,
{
    fn new_basis(&mut self, a: &M, r0: &[T]) -> Result<(), KError> {
        let n = r0.len();
        self.q = SBuffer::filled(vec![T::zero(); n]);
        self.b = SBuffer::filled(T::zero());
        self.norm_r0 = norm(r0);
        if self.norm_r0 == T::zero() {
            self.a0 = T::zero();
            self.nobreakdown = false;
            return Ok(());
        }
        self.q[0].copy_from_slice(r0);
        scale(T::one() / self.norm_r0, &mut self.q[0]);
        self.step(a);
        Ok(())
    }

    fn next(&mut self, a: &M) -> Result<bool, KError> {
        self.q.rotate();
        self.b.rotate();
        Ok(self.step(a))
    }
}

impl<T: Real> LanczosWindow<T> for Lanczos<T> {
    fn breakdown(&self) -> bool {
        !self.nobreakdown
    }
    fn norm_r0(&self) -> T {
        self.norm_r0
    }
    fn q0(&self) -> &[T] {
        &self.q[0]
    }
    fn a0(&self) -> T {
        self.a0
    }
    fn b(&self, i: isize) -> T {
        self.b[i]
    }
}

/// Preconditioned Lanczos recursion: the basis is M⁻¹-orthonormal,
/// `t = M q` are the auxiliary vectors.
#[derive(Clone, Debug)]
pub struct PLanczos<P, T> {
    pc: P,
    q: SBuffer<Vec<T>, 2>,
    t: SBuffer<Vec<T>, 3>,
    b: SBuffer<T, 2>,
    a0: T,
    norm_r0: T,
    nobreakdown: bool,
}

impl<P, T: Real> PLanczos<P, T> {
    pub fn new(pc: P) -> Self {
        Self {
            pc,
            q: SBuffer::filled(Vec::new()),
            t: SBuffer::filled(Vec::new()),
            b: SBuffer::filled(T::zero()),
            a0: T::zero(),
            norm_r0: T::zero(),
            nobreakdown: true,
        }
    }

    pub fn pc_mut(&mut self) -> &mut P {
        &mut self.pc
    }

    fn step<M>(&mut self, a: &M) -> Result<bool, KError>
    where
        M: MatVec<T> + ?Sized,
        P: Preconditioner<M, T>,
    {
        // t2 = A q1 - b0 t0; a1 = t2·q1; t2 -= a1 t1; q2 = M t2
        let mut t2 = mem::take(&mut self.t[1]);
        a.matvec(&self.q[0], &mut t2);
        axpy(-self.b[-1], &self.t[-1], &mut t2);
        let a1 = dot(&t2, &self.q[0]);
        axpy(-a1, &self.t[0], &mut t2);
        let mut q2 = mem::take(&mut self.q[1]);
        let result = self.pc.apply(a, &t2, &mut q2).and_then(|()| {
            let b1sq = dot(&q2, &t2);
            if b1sq < T::zero() {
                Err(KError::InvalidParameter("PLanczos: preconditioner is not positive definite".into()))
            } else {
                Ok(b1sq.sqrt())
            }
        });
        let ok = match result {
            Ok(b1) => {
                self.b[0] = b1;
                b1 >= real(BREAKDOWN_THRESHOLD)
            }
            Err(_) => false,
        };
        if ok {
            let inv = T::one() / self.b[0];
            scale(inv, &mut t2);
            scale(inv, &mut q2);
        }
        self.t[1] = t2;
        self.q[1] = q2;
        self.a0 = a1;
        self.nobreakdown = ok;
        result.map(|_| ok)
    }
}

impl<M, P, T> LanczosBasis<M, T> for PLanczos<P, T>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T>,
    T: Real,
{
    fn new_basis(&mut self, a: &M, r0: &[T]) -> Result<(), KError> {
        let n = r0.len();
        self.t = SBuffer::filled(vec![T::zero(); n]);
        self.q = SBuffer::filled(vec![T::zero(); n]);
        self.b = SBuffer::filled(T::zero());
        self.pc.apply(a, r0, &mut self.q[-1])?;
        let nsq = dot(&self.q[-1], r0);
        if nsq < T::zero() {
            return Err(KError::InvalidParameter(
                "PLanczos: preconditioner is not positive definite".into(),
            ));
        }
        self.norm_r0 = nsq.sqrt();
        if self.norm_r0 == T::zero() {
            self.a0 = T::zero();
            self.nobreakdown = false;
            return Ok(());
        }
        let inv = T::one() / self.norm_r0;
        self.t[0].copy_from_slice(r0);
        scale(inv, &mut self.t[0]);
        let (q0, qm1) = self.q.pair_mut(0, -1);
        q0.copy_from_slice(qm1);
        scale(inv, q0);
        self.step(a)?;
        Ok(())
    }

    fn next(&mut self, a: &M) -> Result<bool, KError> {
        self.q.rotate();
        self.t.rotate();
        self.b.rotate();
        self.step(a)
    }
}

impl<P, T: Real> LanczosWindow<T> for PLanczos<P, T> {
    fn breakdown(&self) -> bool {
        !self.nobreakdown
    }
    fn norm_r0(&self) -> T {
        self.norm_r0
    }
    fn q0(&self) -> &[T] {
        &self.q[0]
    }
    fn a0(&self) -> T {
        self.a0
    }
    fn b(&self, i: isize) -> T {
        self.b[i]
    }
}
