//! Single-qubit gate matrices.

use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A 2×2 unitary `[[a, b], [c, d]]` acting on the pair
/// `(amplitude with target bit 0, amplitude with target bit 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// Row 0, column 0.
    pub a: Complex64,
    /// Row 0, column 1.
    pub b: Complex64,
    /// Row 1, column 0.
    pub c: Complex64,
    /// Row 1, column 1.
    pub d: Complex64,
}

impl Gate {
    /// Build a gate from its four entries in row-major order.
    pub const fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { a, b, c, d }
    }

    /// Build a gate with purely real entries.
    pub const fn real(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self::new(
            Complex64::new(a, 0.0),
            Complex64::new(b, 0.0),
            Complex64::new(c, 0.0),
            Complex64::new(d, 0.0),
        )
    }

    /// Identity.
    pub const fn identity() -> Self {
        Self::new(ONE, ZERO, ZERO, ONE)
    }

    /// Pauli-X (bit flip).
    pub const fn x() -> Self {
        Self::new(ZERO, ONE, ONE, ZERO)
    }

    /// Pauli-Y.
    pub const fn y() -> Self {
        Self::new(ZERO, Complex64::new(0.0, -1.0), Complex64::new(0.0, 1.0), ZERO)
    }

    /// Pauli-Z (phase flip).
    pub const fn z() -> Self {
        Self::real(1.0, 0.0, 0.0, -1.0)
    }

    /// Hadamard.
    pub const fn h() -> Self {
        Self::real(FRAC_1_SQRT_2, FRAC_1_SQRT_2, FRAC_1_SQRT_2, -FRAC_1_SQRT_2)
    }

    /// Phase gate S = diag(1, i).
    pub const fn s() -> Self {
        Self::new(ONE, ZERO, ZERO, Complex64::new(0.0, 1.0))
    }

    /// T = diag(1, e^{iπ/4}).
    pub const fn t() -> Self {
        Self::new(
            ONE,
            ZERO,
            ZERO,
            Complex64::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
        )
    }

    /// Phase shift diag(1, e^{iθ}).
    pub fn phase(theta: f64) -> Self {
        Self::new(ONE, ZERO, ZERO, Complex64::from_polar(1.0, theta))
    }

    /// Both off-diagonal entries are zero.
    pub fn is_diagonal(&self) -> bool {
        self.b == ZERO && self.c == ZERO
    }

    /// Both diagonal entries are zero.
    pub fn is_antidiagonal(&self) -> bool {
        self.a == ZERO && self.d == ZERO
    }

    /// Apply the full matrix to one amplitude pair.
    #[inline]
    pub fn transform(&self, zero: Complex64, one: Complex64) -> (Complex64, Complex64) {
        (
            self.a * zero + self.b * one,
            self.c * zero + self.d * one,
        )
    }

    /// Apply only the off-diagonal entries: swap the pair and scale.
    #[inline]
    pub fn swap_scale(&self, zero: Complex64, one: Complex64) -> (Complex64, Complex64) {
        (self.b * one, self.c * zero)
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[[{:.4}, {:.4}], [{:.4}, {:.4}]]",
            self.a, self.b, self.c, self.d
        )
    }
}
