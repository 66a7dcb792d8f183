//! Sparse operators over the full product space
//!
//! A [`SparseOp`] is an explicit sparse matrix over the whole Hilbert
//! space together with its tracked [`OpProperty`]. Operators compose
//! algebraically (sum, difference, product, scalar multiple, tensor
//! product) with the property record recomputed by the fixed rules on
//! every mutation; the application paths dispatch on the diagonal flag to
//! an O(N) elementwise multiply instead of the general sparse
//! matrix-vector product.
//!
//! Small building blocks (Pauli matrices, rotations) are lifted into a
//! register with [`embed`], which tensors identities at every untargeted
//! freedom in canonical order.

use crate::csr::CsrMatrix;
use crate::error::{OpError, Result};
use crate::operator::Operator;
use crate::property::{OpProperty, Symmetry, Triangular};
use num_complex::Complex64;
use once_cell::unsync::OnceCell;
use qtraj_state::State;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A sparse operator with algebraic property tracking
///
/// # Example
///
/// ```
/// use qtraj_op::SparseOp;
///
/// // Composition keeps the property record current: a sum of diagonal
/// // operators stays on the fast diagonal apply path.
/// let h = &SparseOp::sigma_z() + &SparseOp::identity(2);
/// assert!(h.property().diagonal);
/// assert!(h.property().hermitian);
/// ```
#[derive(Debug, Clone)]
pub struct SparseOp {
    mat: CsrMatrix,
    prop: OpProperty,

    /// Lazily extracted dense diagonal backing the fast apply path; built
    /// on first apply after any mutation, invalidated by every mutation.
    diag_cache: OnceCell<Vec<Complex64>>,
}

impl PartialEq for SparseOp {
    fn eq(&self, other: &Self) -> bool {
        self.mat == other.mat && self.prop == other.prop
    }
}

impl SparseOp {
    /// Wrap a matrix with a caller-supplied property record
    ///
    /// The record is trusted, not checked against the matrix contents.
    pub fn new(mat: CsrMatrix, prop: OpProperty) -> Self {
        Self {
            mat,
            prop,
            diag_cache: OnceCell::new(),
        }
    }

    /// Tensor product of a list of operators, in order
    ///
    /// # Panics
    /// Panics if the list is empty.
    pub fn tensor_all(ops: &[&SparseOp]) -> Self {
        let mut out = ops[0].clone();
        for op in &ops[1..] {
            out.tensor_assign(op);
        }
        out
    }

    /// The zero operator of the given shape
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::new(CsrMatrix::zeros(nrows, ncols), OpProperty::diagonal_hermitian())
    }

    /// The zero operator shaped like `op`
    pub fn zeros_like(op: &SparseOp) -> Self {
        Self::zeros(op.mat.rows(), op.mat.cols())
    }

    /// The n x n identity
    pub fn identity(n: usize) -> Self {
        Self::new(CsrMatrix::identity(n), OpProperty::diagonal_hermitian())
    }

    /// The identity shaped like `op`
    ///
    /// # Errors
    /// Returns an error if `op` is not square.
    pub fn identity_like(op: &SparseOp) -> Result<Self> {
        if op.mat.rows() != op.mat.cols() {
            return Err(OpError::NotSquare {
                rows: op.mat.rows(),
                cols: op.mat.cols(),
            });
        }
        Ok(Self::identity(op.mat.rows()))
    }

    fn from_2x2(dense: [Complex64; 4], prop: OpProperty) -> Self {
        Self::new(CsrMatrix::from_dense(2, 2, &dense), prop)
    }

    /// Pauli X
    pub fn sigma_x() -> Self {
        Self::from_2x2(
            [ZERO, ONE, ONE, ZERO],
            OpProperty {
                symmetry: Symmetry::Normal,
                hermitian: true,
                diagonal: false,
                triangular: Triangular::Not,
            },
        )
    }

    /// Pauli Y
    pub fn sigma_y() -> Self {
        Self::from_2x2(
            [ZERO, Complex64::new(0.0, -1.0), Complex64::new(0.0, 1.0), ZERO],
            OpProperty {
                symmetry: Symmetry::Anti,
                hermitian: true,
                diagonal: false,
                triangular: Triangular::Not,
            },
        )
    }

    /// Pauli Z
    pub fn sigma_z() -> Self {
        Self::from_2x2(
            [ONE, ZERO, ZERO, Complex64::new(-1.0, 0.0)],
            OpProperty::diagonal_hermitian(),
        )
    }

    /// Raising operator |0⟩⟨1|
    pub fn sigma_plus() -> Self {
        Self::from_2x2(
            [ZERO, ONE, ZERO, ZERO],
            OpProperty {
                symmetry: Symmetry::Not,
                hermitian: false,
                diagonal: false,
                triangular: Triangular::Upper,
            },
        )
    }

    /// Lowering operator |1⟩⟨0|
    pub fn sigma_minus() -> Self {
        Self::from_2x2(
            [ZERO, ZERO, ONE, ZERO],
            OpProperty {
                symmetry: Symmetry::Not,
                hermitian: false,
                diagonal: false,
                triangular: Triangular::Lower,
            },
        )
    }

    /// Rotation about Z by `theta`
    pub fn rz(theta: f64) -> Self {
        let half = theta / 2.0;
        Self::from_2x2(
            [
                Complex64::new(half.cos(), -half.sin()),
                ZERO,
                ZERO,
                Complex64::new(half.cos(), half.sin()),
            ],
            OpProperty {
                symmetry: Symmetry::Normal,
                hermitian: false,
                diagonal: true,
                triangular: Triangular::Not,
            },
        )
    }

    /// Rotation about X by `theta`
    pub fn rx(theta: f64) -> Self {
        let half = theta / 2.0;
        Self::from_2x2(
            [
                Complex64::new(half.cos(), 0.0),
                Complex64::new(0.0, -half.sin()),
                Complex64::new(0.0, -half.sin()),
                Complex64::new(half.cos(), 0.0),
            ],
            OpProperty {
                symmetry: Symmetry::Normal,
                hermitian: true,
                diagonal: false,
                triangular: Triangular::Not,
            },
        )
    }

    /// Rotation about Y by `theta`
    pub fn ry(theta: f64) -> Self {
        let half = theta / 2.0;
        Self::from_2x2(
            [
                Complex64::new(half.cos(), 0.0),
                Complex64::new(-half.sin(), 0.0),
                Complex64::new(half.sin(), 0.0),
                Complex64::new(half.cos(), 0.0),
            ],
            OpProperty {
                symmetry: Symmetry::Not,
                hermitian: true,
                diagonal: false,
                triangular: Triangular::Not,
            },
        )
    }

    /// The matrix
    pub fn matrix(&self) -> &CsrMatrix {
        &self.mat
    }

    /// The tracked property record
    pub fn property(&self) -> &OpProperty {
        &self.prop
    }

    /// Dimension of the space the operator acts on
    pub fn dim(&self) -> usize {
        self.mat.rows()
    }

    fn invalidate(&mut self) {
        self.diag_cache = OnceCell::new();
    }

    fn diag(&self) -> &[Complex64] {
        self.diag_cache.get_or_init(|| self.mat.diagonal())
    }

    fn check_shapes(&self, out: &State, input: &State) -> Result<()> {
        if self.mat.cols() != input.total() {
            return Err(OpError::ShapeMismatch {
                op_dim: self.mat.cols(),
                state_dim: input.total(),
            });
        }
        if self.mat.rows() != out.total() {
            return Err(OpError::ShapeMismatch {
                op_dim: self.mat.rows(),
                state_dim: out.total(),
            });
        }
        Ok(())
    }

    /// `out += a * op(x; t)`
    pub fn axpy_apply(&self, out: &mut State, a: Complex64, x: &State, _t: f64) -> Result<()> {
        self.check_shapes(out, x)?;
        if self.prop.diagonal {
            let d = self.diag();
            let xa = x.amplitudes();
            for (i, y) in out.amplitudes_mut().iter_mut().enumerate() {
                *y += a * d[i] * xa[i];
            }
        } else {
            self.mat.axpy_spmv(out.amplitudes_mut(), a, x.amplitudes());
        }
        Ok(())
    }

    /// `out = a * op(x; t) + b * out`
    pub fn axpby_apply(
        &self,
        out: &mut State,
        a: Complex64,
        x: &State,
        b: Complex64,
        _t: f64,
    ) -> Result<()> {
        self.check_shapes(out, x)?;
        if self.prop.diagonal {
            let d = self.diag();
            let xa = x.amplitudes();
            for (i, y) in out.amplitudes_mut().iter_mut().enumerate() {
                *y = a * d[i] * xa[i] + b * *y;
            }
        } else {
            self.mat
                .axpby_spmv(out.amplitudes_mut(), a, x.amplitudes(), b);
        }
        Ok(())
    }

    /// In-place sum
    ///
    /// # Panics
    /// Panics if the shapes differ (operator algebra shape mismatches are
    /// programming errors).
    pub fn add_assign(&mut self, op: &SparseOp) {
        self.invalidate();
        self.mat = self
            .mat
            .add_scaled(&op.mat, ONE)
            .expect("operator shapes differ in add");
        self.prop.combine_add(&op.prop);
    }

    /// In-place difference
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn sub_assign(&mut self, op: &SparseOp) {
        self.invalidate();
        self.mat = self
            .mat
            .add_scaled(&op.mat, Complex64::new(-1.0, 0.0))
            .expect("operator shapes differ in sub");
        self.prop.combine_add(&op.prop);
    }

    /// In-place product `self = self * op`
    ///
    /// # Panics
    /// Panics if the inner dimensions differ.
    pub fn mul_assign(&mut self, op: &SparseOp) {
        self.invalidate();
        self.mat = self
            .mat
            .matmul(&op.mat)
            .expect("operator shapes differ in mul");
        self.prop.combine_mul(&op.prop);
    }

    /// In-place scalar multiple
    pub fn scale(&mut self, a: Complex64) {
        self.invalidate();
        self.mat.scale(a);
        self.prop.combine_scale();
    }

    /// In-place tensor product `self = self ⊗ op`
    pub fn tensor_assign(&mut self, op: &SparseOp) {
        self.invalidate();
        self.mat = self.mat.kron(&op.mat);
        self.prop.combine_tensor(&op.prop);
    }
}

impl Operator for SparseOp {
    /// `out = op(input; t)`
    ///
    /// Diagonal operators take an elementwise multiply; everything else
    /// goes through the general sparse matrix-vector product. Stale
    /// contents of `out` are overwritten, never read.
    fn apply(&self, out: &mut State, input: &State, t: f64) -> Result<()> {
        let _ = t;
        self.check_shapes(out, input)?;
        if self.prop.diagonal {
            let d = self.diag();
            let xa = input.amplitudes();
            for (i, y) in out.amplitudes_mut().iter_mut().enumerate() {
                *y = d[i] * xa[i];
            }
        } else {
            self.mat.spmv(out.amplitudes_mut(), input.amplitudes());
        }
        Ok(())
    }
}

/// `a ⊗ b`
pub fn tensor(a: &SparseOp, b: &SparseOp) -> SparseOp {
    let mut out = a.clone();
    out.tensor_assign(b);
    out
}

/// Lift small operators into an `n_freedoms`-qubit register
///
/// Places `ops[i]` at freedom `targets[i]` and the qubit identity at every
/// other freedom, then tensors in canonical freedom order. This is the
/// primary way Hamiltonian and dissipator terms for specific qubits become
/// full-system operators.
///
/// # Errors
/// Returns an error when the lists disagree in length, a target repeats,
/// or a target is out of range.
pub fn embed(n_freedoms: usize, ops: &[SparseOp], targets: &[usize]) -> Result<SparseOp> {
    if ops.len() != targets.len() {
        return Err(OpError::EmbedArity {
            ops: ops.len(),
            targets: targets.len(),
        });
    }
    let id = SparseOp::identity(2);
    let mut slots: Vec<&SparseOp> = vec![&id; n_freedoms];
    for (op, &target) in ops.iter().zip(targets) {
        if target >= n_freedoms {
            return Err(OpError::EmbedTarget {
                target,
                n_freedoms,
            });
        }
        if !std::ptr::eq(slots[target], &id) {
            return Err(OpError::EmbedDuplicate { target });
        }
        slots[target] = op;
    }
    Ok(SparseOp::tensor_all(&slots))
}

/// The aggregate dissipator `Σ L†ᵢ Lᵢ` of a channel list
///
/// Used by the optimized unravelings in place of the per-channel loop.
///
/// # Errors
/// Returns an error if the lists disagree in length or are empty.
pub fn sum_ldag_l(l: &[SparseOp], l_dag: &[SparseOp]) -> Result<SparseOp> {
    if l.len() != l_dag.len() || l.is_empty() {
        return Err(OpError::ChannelArity {
            l: l.len(),
            l_dag: l_dag.len(),
        });
    }
    let mut sum = l_dag[0].clone();
    sum.mul_assign(&l[0]);
    for (li, ldi) in l.iter().zip(l_dag).skip(1) {
        let mut term = ldi.clone();
        term.mul_assign(li);
        sum.add_assign(&term);
    }
    Ok(sum)
}

// Operator sugar over references; the owning *_assign methods above are
// the primitive forms.

impl std::ops::Add for &SparseOp {
    type Output = SparseOp;
    fn add(self, rhs: &SparseOp) -> SparseOp {
        let mut out = self.clone();
        out.add_assign(rhs);
        out
    }
}

impl std::ops::Sub for &SparseOp {
    type Output = SparseOp;
    fn sub(self, rhs: &SparseOp) -> SparseOp {
        let mut out = self.clone();
        out.sub_assign(rhs);
        out
    }
}

impl std::ops::Mul for &SparseOp {
    type Output = SparseOp;
    fn mul(self, rhs: &SparseOp) -> SparseOp {
        let mut out = self.clone();
        out.mul_assign(rhs);
        out
    }
}

impl std::ops::Mul<Complex64> for &SparseOp {
    type Output = SparseOp;
    fn mul(self, a: Complex64) -> SparseOp {
        let mut out = self.clone();
        out.scale(a);
        out
    }
}

impl std::ops::Mul<&SparseOp> for Complex64 {
    type Output = SparseOp;
    fn mul(self, op: &SparseOp) -> SparseOp {
        op * self
    }
}
