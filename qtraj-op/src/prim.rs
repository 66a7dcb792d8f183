//! Primitive strided operators acting on one or two freedoms
//!
//! A primitive operator is a fixed 2x2 (or 4x4) action on one (or two)
//! designated freedoms of a state, applied without ever materializing the
//! full product-space matrix: the implementation iterates over every fixed
//! setting of the remaining freedoms and mutates the addressed sub-block
//! through a strided view into the amplitude buffer.
//!
//! The built-in single-freedom actions are the Pauli operators and the
//! raising/lowering operators, each with an optional real scale so that
//! Lindblad channels can be formed directly from relaxation rates.

use crate::error::{OpError, Result};
use crate::operator::Operator;
use num_complex::Complex64;
use qtraj_state::State;

const I: Complex64 = Complex64::new(0.0, 1.0);
const MI: Complex64 = Complex64::new(0.0, -1.0);

/// The fixed 2x2 actions available on a single freedom
///
/// `Raise` moves amplitude from level 1 to level 0 (the matrix |0⟩⟨1|),
/// `Lower` the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimKind {
    /// Pauli X
    X,
    /// Pauli Y
    Y,
    /// Pauli Z
    Z,
    /// Raising operator |0⟩⟨1|
    Raise,
    /// Lowering operator |1⟩⟨0|
    Lower,
}

/// A scaled Pauli-family operator on one designated freedom
///
/// # Example
///
/// ```
/// use qtraj_op::{Operator, PrimOp};
/// use qtraj_state::State;
///
/// let x1 = PrimOp::x(1);
/// let psi = State::basis(&[2, 2], 0).unwrap();
/// let mut out = psi.clone();
/// x1.apply(&mut out, &psi, 0.0).unwrap();
/// assert_eq!(out.amplitudes()[1].re, 1.0); // |00⟩ -> |01⟩
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimOp {
    kind: PrimKind,
    freedom: usize,
    scale: f64,
}

impl PrimOp {
    /// Unscaled operator of the given kind on `freedom`
    pub fn new(kind: PrimKind, freedom: usize) -> Self {
        Self {
            kind,
            freedom,
            scale: 1.0,
        }
    }

    /// Pauli X on `freedom`
    pub fn x(freedom: usize) -> Self {
        Self::new(PrimKind::X, freedom)
    }

    /// Pauli Y on `freedom`
    pub fn y(freedom: usize) -> Self {
        Self::new(PrimKind::Y, freedom)
    }

    /// Pauli Z on `freedom`
    pub fn z(freedom: usize) -> Self {
        Self::new(PrimKind::Z, freedom)
    }

    /// Raising operator |0⟩⟨1| on `freedom`
    pub fn raising(freedom: usize) -> Self {
        Self::new(PrimKind::Raise, freedom)
    }

    /// Lowering operator |1⟩⟨0| on `freedom`
    pub fn lowering(freedom: usize) -> Self {
        Self::new(PrimKind::Lower, freedom)
    }

    /// Multiply the action by a real scale (builder style)
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Retarget the operator onto another freedom
    pub fn on(mut self, freedom: usize) -> Self {
        self.freedom = freedom;
        self
    }

    /// The addressed freedom
    pub fn freedom(&self) -> usize {
        self.freedom
    }

    /// The 2x2 action on the pair of amplitudes addressed by one setting of
    /// the other freedoms
    #[inline]
    fn kernel(&self, amps: &mut [Complex64], base: usize, skip: usize) {
        let s = self.scale;
        let v0 = amps[base];
        let v1 = amps[base + skip];
        match self.kind {
            PrimKind::X => {
                amps[base] = s * v1;
                amps[base + skip] = s * v0;
            }
            PrimKind::Y => {
                amps[base] = MI * s * v1;
                amps[base + skip] = I * s * v0;
            }
            PrimKind::Z => {
                amps[base] = s * v0;
                amps[base + skip] = -s * v1;
            }
            PrimKind::Raise => {
                amps[base] = s * v1;
                amps[base + skip] = Complex64::new(0.0, 0.0);
            }
            PrimKind::Lower => {
                amps[base + skip] = s * v0;
                amps[base] = Complex64::new(0.0, 0.0);
            }
        }
    }

    /// `s = op(s; t)`, mutating the state in place
    pub fn apply_in_place(&self, s: &mut State, _t: f64) -> Result<()> {
        if self.freedom >= s.n_freedoms() {
            return Err(OpError::FreedomOutOfRange {
                index: self.freedom,
                n_freedoms: s.n_freedoms(),
            });
        }

        let skip = s.skip(self.freedom);
        let outer = s.stride_before(self.freedom);
        let total = s.total();

        let amps = s.amplitudes_mut();
        let mut j = 0;
        while j < total {
            for i in 0..skip {
                self.kernel(amps, i + j, skip);
            }
            j += outer;
        }
        Ok(())
    }
}

impl Operator for PrimOp {
    fn apply(&self, out: &mut State, input: &State, t: f64) -> Result<()> {
        out.assign(input);
        self.apply_in_place(out, t)
    }
}

/// The fixed 4x4 actions available on a pair of freedoms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prim2Kind {
    /// X ⊗ X
    Xx,
    /// Z on the first freedom, X on the second
    Zx,
    /// Z ⊗ Z
    Zz,
}

/// A two-freedom coupling operator
///
/// Generalizes the strided-view technique of [`PrimOp`] to a 2-D
/// sub-block addressed by the two freedoms' strides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prim2Op {
    kind: Prim2Kind,
    freedom1: usize,
    freedom2: usize,
}

impl Prim2Op {
    pub fn new(kind: Prim2Kind, freedom1: usize, freedom2: usize) -> Self {
        Self {
            kind,
            freedom1,
            freedom2,
        }
    }

    /// X ⊗ X coupling
    pub fn xx(freedom1: usize, freedom2: usize) -> Self {
        Self::new(Prim2Kind::Xx, freedom1, freedom2)
    }

    /// Z ⊗ X coupling
    pub fn zx(freedom1: usize, freedom2: usize) -> Self {
        Self::new(Prim2Kind::Zx, freedom1, freedom2)
    }

    /// Z ⊗ Z coupling
    pub fn zz(freedom1: usize, freedom2: usize) -> Self {
        Self::new(Prim2Kind::Zz, freedom1, freedom2)
    }

    /// Retarget the operator onto another pair of freedoms
    pub fn on(mut self, freedom1: usize, freedom2: usize) -> Self {
        self.freedom1 = freedom1;
        self.freedom2 = freedom2;
        self
    }

    /// The 4x4 action on one addressed sub-block; `skip1`/`skip2` are the
    /// strides of the first/second freedom
    #[inline]
    fn kernel(&self, amps: &mut [Complex64], base: usize, skip1: usize, skip2: usize) {
        let b00 = base;
        let b01 = base + skip2;
        let b10 = base + skip1;
        let b11 = base + skip1 + skip2;
        match self.kind {
            Prim2Kind::Xx => {
                amps.swap(b00, b11);
                amps.swap(b01, b10);
            }
            Prim2Kind::Zx => {
                amps.swap(b00, b01);
                let tmp = amps[b10];
                amps[b10] = -amps[b11];
                amps[b11] = -tmp;
            }
            Prim2Kind::Zz => {
                amps[b01] = -amps[b01];
                amps[b10] = -amps[b10];
            }
        }
    }

    /// `s = op(s; t)`, mutating the state in place
    pub fn apply_in_place(&self, s: &mut State, _t: f64) -> Result<()> {
        for f in [self.freedom1, self.freedom2] {
            if f >= s.n_freedoms() {
                return Err(OpError::FreedomOutOfRange {
                    index: f,
                    n_freedoms: s.n_freedoms(),
                });
            }
        }
        if self.freedom1 == self.freedom2 {
            return Err(OpError::DuplicateFreedom {
                index: self.freedom1,
            });
        }

        let skip1 = s.skip(self.freedom1);
        let skip2 = s.skip(self.freedom2);

        let min_freedom = self.freedom1.min(self.freedom2);
        let max_freedom = self.freedom1.max(self.freedom2);

        let max_skip = s.skip(min_freedom);
        let next_max_skip = s.stride_before(min_freedom);
        let min_skip = s.skip(max_freedom);
        let next_min_skip = s.stride_before(max_freedom);

        let total = s.total();
        let amps = s.amplitudes_mut();

        let mut i = 0;
        while i < total {
            let mut j = 0;
            while j < max_skip {
                for k in 0..min_skip {
                    self.kernel(amps, i + j + k, skip1, skip2);
                }
                j += next_min_skip;
            }
            i += next_max_skip;
        }
        Ok(())
    }
}

impl Operator for Prim2Op {
    fn apply(&self, out: &mut State, input: &State, t: f64) -> Result<()> {
        out.assign(input);
        self.apply_in_place(out, t)
    }
}
