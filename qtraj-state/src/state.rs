//! Tensor-product state vectors over an ordered list of freedoms
//!
//! A [`State`] holds the complex amplitudes of a pure quantum state living
//! in the tensor product of a list of subsystems ("freedoms"). The shape is
//! an ordered dimension list; amplitudes are stored contiguously with
//! freedom 0 as the most significant digit of the basis index.
//!
//! Arithmetic is BLAS-1 style (`axpy`, `axpby`, scaling, inner products) so
//! that ODE integrators and unraveling methods can be written against a
//! narrow vector interface.

use crate::error::{Result, StateError};
use num_complex::Complex64;
use rand::Rng;
use std::fmt;

/// Norm below which [`State::normalize`] leaves the state untouched
/// instead of dividing by a vanishing quantity.
const NORMALIZE_FLOOR: f64 = 1e-8;

/// A pure quantum state over a tensor product of freedoms
///
/// The shape is fixed at construction: `dims[i]` is the dimension of
/// freedom `i`, and the amplitude buffer has length `Π dims[i]`. The basis
/// index is big-endian in the freedoms: one unit step of freedom `i` moves
/// `skip(i)` positions in the buffer, with freedom 0 varying slowest.
///
/// All binary operations require both operands to share the same shape and
/// panic otherwise; shape mismatches are programming errors, not runtime
/// conditions.
///
/// # Example
///
/// ```
/// use qtraj_state::State;
///
/// // |01⟩ of two qubits
/// let state = State::basis(&[2, 2], 1).unwrap();
/// assert_eq!(state.total(), 4);
/// assert_eq!(state.amplitudes()[1].re, 1.0);
/// ```
#[derive(Clone, PartialEq)]
pub struct State {
    /// Dimension of each freedom
    dims: Vec<usize>,

    /// Stride table: `skips[0]` is the total dimension, `skips[i + 1]` the
    /// buffer stride of freedom `i`
    skips: Vec<usize>,

    /// Contiguous amplitude buffer of length `skips[0]`
    amps: Vec<Complex64>,
}

fn build_skips(dims: &[usize]) -> Result<Vec<usize>> {
    let mut skips = vec![0; dims.len() + 1];
    let mut total = 1usize;
    for i in (0..dims.len()).rev() {
        if dims[i] == 0 {
            return Err(StateError::ZeroDimension { index: i });
        }
        skips[i + 1] = total;
        total *= dims[i];
    }
    skips[0] = total;
    Ok(skips)
}

impl State {
    /// Create a computational basis state
    ///
    /// All amplitudes are zero except the one at `basis`, which is 1.
    ///
    /// # Errors
    /// Returns an error if any dimension is zero or `basis` is outside the
    /// product space.
    pub fn basis(dims: &[usize], basis: usize) -> Result<Self> {
        let skips = build_skips(dims)?;
        let total = skips[0];
        if basis >= total {
            return Err(StateError::BasisOutOfRange { basis, total });
        }

        let mut amps = vec![Complex64::new(0.0, 0.0); total];
        amps[basis] = Complex64::new(1.0, 0.0);
        Ok(Self {
            dims: dims.to_vec(),
            skips,
            amps,
        })
    }

    /// Create a product state from single-freedom factors
    ///
    /// Each factor must itself be a single-freedom state of dimension at
    /// least 2. The resulting amplitudes are the products of the factor
    /// amplitudes in canonical freedom order.
    ///
    /// # Example
    ///
    /// ```
    /// use qtraj_state::State;
    ///
    /// let q0 = State::basis(&[2], 0).unwrap();
    /// let q1 = State::basis(&[2], 1).unwrap();
    /// let psi = State::product(&[&q0, &q1]).unwrap();
    /// assert_eq!(psi.amplitudes()[1].re, 1.0); // |01⟩
    /// ```
    pub fn product(factors: &[&State]) -> Result<Self> {
        let mut dims = Vec::with_capacity(factors.len());
        for (i, f) in factors.iter().enumerate() {
            if f.n_freedoms() != 1 || f.total() < 2 {
                return Err(StateError::InvalidProductFactor { index: i });
            }
            dims.push(f.dim(0));
        }
        let skips = build_skips(&dims)?;
        let total = skips[0];

        let mut amps = Vec::with_capacity(total);
        for i in 0..total {
            let mut k = i;
            let mut amp = Complex64::new(1.0, 0.0);
            for (j, f) in factors.iter().enumerate() {
                let skip = skips[j + 1];
                amp *= f.amps[k / skip];
                k %= skip;
            }
            amps.push(amp);
        }
        Ok(Self { dims, skips, amps })
    }

    /// Wrap an externally supplied amplitude buffer without copying
    ///
    /// This is the move-based counterpart of a non-owning view: storage
    /// enters the state here and leaves through [`State::into_raw`], so a
    /// caller holding its own buffers (e.g. an integrator's history
    /// columns) can round-trip them through state arithmetic at zero cost.
    ///
    /// # Errors
    /// Returns an error if the buffer length does not match `Π dims[i]`.
    pub fn from_raw(dims: &[usize], amps: Vec<Complex64>) -> Result<Self> {
        let skips = build_skips(dims)?;
        if amps.len() != skips[0] {
            return Err(StateError::BufferLength {
                expected: skips[0],
                actual: amps.len(),
            });
        }
        Ok(Self {
            dims: dims.to_vec(),
            skips,
            amps,
        })
    }

    /// Release the amplitude buffer without copying
    pub fn into_raw(self) -> Vec<Complex64> {
        self.amps
    }

    /// Reshape this state to match `reference`, reusing the buffer when the
    /// total dimension already agrees
    pub fn make_similar(&mut self, reference: &State) {
        self.dims.clone_from(&reference.dims);
        self.skips.clone_from(&reference.skips);
        self.amps.resize(reference.total(), Complex64::new(0.0, 0.0));
    }

    /// Copy the amplitudes of `other` into this state
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn assign(&mut self, other: &State) {
        assert_eq!(self.dims, other.dims, "state shapes differ in assign");
        self.amps.copy_from_slice(&other.amps);
    }

    // Shape accessors

    /// Total dimension of the product space
    #[inline]
    pub fn total(&self) -> usize {
        self.skips[0]
    }

    /// Number of tensor factors
    #[inline]
    pub fn n_freedoms(&self) -> usize {
        self.dims.len()
    }

    /// Dimension of freedom `i`
    #[inline]
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    /// Buffer stride of freedom `i`: one unit step of this freedom's digit
    /// moves this many amplitudes
    #[inline]
    pub fn skip(&self, i: usize) -> usize {
        self.skips[i + 1]
    }

    /// Stride table entry `i`: `stride_before(0)` is the total dimension,
    /// `stride_before(i)` the span of one digit step of freedom `i - 1`
    #[inline]
    pub fn stride_before(&self, i: usize) -> usize {
        self.skips[i]
    }

    /// Dimension list
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Amplitude buffer
    #[inline]
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amps
    }

    /// Mutable amplitude buffer
    #[inline]
    pub fn amplitudes_mut(&mut self) -> &mut [Complex64] {
        &mut self.amps
    }

    // BLAS-1 arithmetic

    /// `self += a · x`
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn axpy(&mut self, a: Complex64, x: &State) -> &mut Self {
        assert_eq!(self.dims, x.dims, "state shapes differ in axpy");
        for (y, &xi) in self.amps.iter_mut().zip(x.amps.iter()) {
            *y += a * xi;
        }
        self
    }

    /// `self = a · x`
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn mul(&mut self, a: Complex64, x: &State) -> &mut Self {
        assert_eq!(self.dims, x.dims, "state shapes differ in mul");
        for (y, &xi) in self.amps.iter_mut().zip(x.amps.iter()) {
            *y = a * xi;
        }
        self
    }

    /// `self = a · x + b · self`
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn axpby(&mut self, a: Complex64, x: &State, b: Complex64) -> &mut Self {
        assert_eq!(self.dims, x.dims, "state shapes differ in axpby");
        for (y, &xi) in self.amps.iter_mut().zip(x.amps.iter()) {
            *y = a * xi + b * *y;
        }
        self
    }

    /// `self *= a`
    pub fn scale(&mut self, a: Complex64) -> &mut Self {
        for y in self.amps.iter_mut() {
            *y *= a;
        }
        self
    }

    /// Fill every amplitude with `a`
    pub fn fill(&mut self, a: Complex64) -> &mut Self {
        self.amps.fill(a);
        self
    }

    /// Inner product `⟨self|other⟩`, conjugate-linear in `self`
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn inner(&self, other: &State) -> Complex64 {
        assert_eq!(self.dims, other.dims, "state shapes differ in inner");
        self.amps
            .iter()
            .zip(other.amps.iter())
            .map(|(a, b)| a.conj() * b)
            .sum()
    }

    /// Euclidean norm of the amplitude vector
    pub fn norm(&self) -> f64 {
        self.amps
            .iter()
            .map(|a| a.norm_sqr())
            .sum::<f64>()
            .sqrt()
    }

    /// Squared Euclidean norm
    pub fn norm_sqr(&self) -> f64 {
        self.amps.iter().map(|a| a.norm_sqr()).sum()
    }

    /// Rescale to unit norm, unless the norm is below a small floor
    ///
    /// Near-zero states are left unchanged rather than divided by an
    /// almost-vanishing norm.
    pub fn normalize(&mut self) {
        let n = self.norm();
        if n > NORMALIZE_FLOOR {
            self.scale(Complex64::new(1.0 / n, 0.0));
        }
    }

    // Measurement

    /// Digit of freedom `free` in basis index `index`
    #[inline]
    fn digit(&self, index: usize, free: usize) -> usize {
        (index / self.skip(free)) % self.dims[free]
    }

    /// Sample one basis index proportionally to `|amplitude|²`, using the
    /// current squared norm as the normalizer. Consumes exactly one
    /// uniform draw.
    fn sample_basis<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let r = rng.gen::<f64>() * self.norm_sqr();
        let mut sum = 0.0;
        for (i, amp) in self.amps.iter().enumerate() {
            sum += amp.norm_sqr();
            if sum > r {
                return i;
            }
        }
        // Floating-point round-off can leave the cumulative sum just below
        // the draw; land on the last basis index.
        self.total() - 1
    }

    /// Measure the requested freedoms in the computational basis
    ///
    /// Samples one outcome with probability proportional to the squared
    /// amplitudes (the state need not be normalized), collapses every
    /// amplitude inconsistent with the sampled digits of the requested
    /// freedoms, renormalizes, and returns the sampled digit for each
    /// requested freedom in request order.
    ///
    /// Consumes exactly one uniform draw from `rng` per call.
    ///
    /// # Errors
    /// Returns an error if a freedom index is out of range.
    pub fn measure<R: Rng + ?Sized>(
        &mut self,
        frees: &[usize],
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        for &f in frees {
            if f >= self.n_freedoms() {
                return Err(StateError::FreedomOutOfRange {
                    index: f,
                    n_freedoms: self.n_freedoms(),
                });
            }
        }

        let meas = self.sample_basis(rng);
        let outcome: Vec<usize> = frees.iter().map(|&f| self.digit(meas, f)).collect();

        for i in 0..self.total() {
            let keep = frees
                .iter()
                .zip(outcome.iter())
                .all(|(&f, &d)| self.digit(i, f) == d);
            if !keep {
                self.amps[i] = Complex64::new(0.0, 0.0);
            }
        }
        self.normalize();

        Ok(outcome)
    }

    /// Measure a set of qubit freedoms given as a bit mask
    ///
    /// Every freedom must be a qubit. The mask addresses the bits of the
    /// basis index directly, so its most significant relevant bit selects
    /// freedom 0. Returns the measured bits packed at their mask
    /// positions. This avoids the per-freedom digit bookkeeping of
    /// [`State::measure`] and is the fast path for qubit registers.
    ///
    /// Consumes exactly one uniform draw from `rng` per call.
    ///
    /// # Errors
    /// Returns an error if any freedom has dimension other than 2.
    pub fn measure_qubits<R: Rng + ?Sized>(&mut self, mask: usize, rng: &mut R) -> Result<usize> {
        for (i, &d) in self.dims.iter().enumerate() {
            if d != 2 {
                return Err(StateError::NotAQubit { index: i, dim: d });
            }
        }

        let meas = self.sample_basis(rng) & mask;

        for i in 0..self.total() {
            if i & mask != meas {
                self.amps[i] = Complex64::new(0.0, 0.0);
            }
        }
        self.normalize();

        Ok(meas)
    }
}

impl std::ops::Index<usize> for State {
    type Output = Complex64;

    #[inline]
    fn index(&self, i: usize) -> &Complex64 {
        &self.amps[i]
    }
}

impl std::ops::IndexMut<usize> for State {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut Complex64 {
        &mut self.amps[i]
    }
}

impl std::ops::AddAssign<&State> for State {
    fn add_assign(&mut self, other: &State) {
        self.axpy(Complex64::new(1.0, 0.0), other);
    }
}

impl std::ops::SubAssign<&State> for State {
    fn sub_assign(&mut self, other: &State) {
        self.axpy(Complex64::new(-1.0, 0.0), other);
    }
}

impl std::ops::MulAssign<Complex64> for State {
    fn mul_assign(&mut self, a: Complex64) {
        self.scale(a);
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("dims", &self.dims)
            .field("total", &self.total())
            .field("norm", &self.norm())
            .finish()
    }
}
