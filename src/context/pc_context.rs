//! Preconditioner factory.
//!
//! Maps a [`PcKind`] plus the relaxation parameters of [`KspOptions`] to a
//! boxed [`Preconditioner`] for CSR systems.

use log::debug;

use crate::config::{KspOptions, PcKind};
use crate::core::traits::Real;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::{DiagPc, DummyPc, MultiSsorPc, NegsPc, Preconditioner, Relaxation};

/// Type-erased preconditioner for `CsrMatrix<T>` systems.
pub type BoxedPc<T> = Box<dyn Preconditioner<CsrMatrix<T>, T>>;

/// Build the preconditioner selected in `opts`.
///
/// `a` is only consulted by kinds that are derived from the matrix up front
/// ([`PcKind::Diag`]); the relaxation kinds read it on every application.
pub fn build_preconditioner<T: Real>(opts: &KspOptions<T>, a: &CsrMatrix<T>) -> Result<BoxedPc<T>, KError> {
    let omega = opts.omega;
    let pc: BoxedPc<T> = match opts.pc {
        PcKind::None => Box::new(DummyPc),
        PcKind::Jacobi => Box::new(Relaxation::jac_pc(omega)),
        PcKind::Diag => Box::new(DiagPc::inverse_diagonal(a)?),
        PcKind::Gs => Box::new(Relaxation::gs_pc(omega)),
        PcKind::Sgs => Box::new(Relaxation::sgs_pc()),
        PcKind::Ssor => Box::new(Relaxation::ssor_pc(omega)),
        PcKind::SsorDiag => Box::new(Relaxation::ssor_diag_pc(omega)),
        PcKind::MultiSsor => Box::new(MultiSsorPc::new(omega, opts.sweeps)),
        PcKind::Negs => Box::new(NegsPc::new(true)),
    };
    debug!("build_preconditioner: {} (omega {omega})", opts.pc);
    Ok(pc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_builds_and_applies() {
        let a = CsrMatrix::from_triplets(3, 3, &[
            (0, 0, 4.0), (0, 1, -1.0),
            (1, 0, -1.0), (1, 1, 4.0), (1, 2, -1.0),
            (2, 1, -1.0), (2, 2, 4.0),
        ])
        .unwrap();
        let r = vec![1.0, 2.0, 3.0];
        for kind in PcKind::ALL {
            let opts = KspOptions::new(crate::config::SolverKind::Pcg, kind);
            let mut pc = build_preconditioner(&opts, &a).unwrap();
            pc.setup(&a).unwrap();
            let mut z: Vec<f64> = vec![0.0; 3];
            pc.apply(&a, &r, &mut z).unwrap();
            assert!(z.iter().all(|v| v.is_finite()), "{kind}: {z:?}");
            assert!(z.iter().any(|v| *v != 0.0), "{kind}");
        }
    }

    #[test]
    fn diag_kind_needs_a_full_diagonal() {
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, 1.0)]).unwrap();
        let opts = KspOptions::new(crate::config::SolverKind::Pcg, PcKind::Diag);
        assert!(build_preconditioner(&opts, &a).is_err());
    }
}
