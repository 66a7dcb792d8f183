//! Algebraic property tracking for sparse operators
//!
//! Every [`crate::SparseOp`] carries a record of derived matrix properties
//! (symmetry, hermiticity, diagonality, triangularity). The record is
//! never re-derived from the matrix contents; instead it is recomputed by
//! the fixed composition rules in this module whenever the matrix changes
//! through the algebra. The diagonal flag drives the fast elementwise
//! apply path.

/// Symmetry classification of a matrix
///
/// `Normal` includes diagonal matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Symmetry {
    #[default]
    Not,
    /// A = Aᵀ
    Normal,
    /// A = -Aᵀ
    Anti,
}

/// Triangularity classification of a matrix
///
/// `Not` includes diagonal matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Triangular {
    #[default]
    Not,
    Lower,
    Upper,
}

/// The tracked property record of a sparse operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpProperty {
    pub symmetry: Symmetry,
    pub hermitian: bool,
    pub diagonal: bool,
    pub triangular: Triangular,
}

impl OpProperty {
    /// The record of a diagonal Hermitian matrix (identity, zero, σz, ...)
    pub const fn diagonal_hermitian() -> Self {
        Self {
            symmetry: Symmetry::Normal,
            hermitian: true,
            diagonal: true,
            triangular: Triangular::Not,
        }
    }

    /// Combine for a sum or difference of operators
    ///
    /// Symmetry and triangularity survive only when the operands agree,
    /// with diagonal operands transparent to both; hermiticity and
    /// diagonality are conjunctions.
    pub fn combine_add(&mut self, p: &OpProperty) {
        if self.diagonal {
            self.symmetry = p.symmetry;
        } else if !p.diagonal && self.symmetry != p.symmetry {
            self.symmetry = Symmetry::Not;
        }
        self.hermitian = self.hermitian && p.hermitian;
        self.diagonal = self.diagonal && p.diagonal;
        self.combine_triangular(p);
    }

    /// Combine for a product of operators
    ///
    /// Symmetry and hermiticity survive only when the factors commute for
    /// certain, which this layer grants only to simultaneously diagonal
    /// factors; two anti-symmetric factors compose to a symmetric product.
    pub fn combine_mul(&mut self, p: &OpProperty) {
        let commute = self.diagonal && p.diagonal;
        if !commute || self.symmetry == Symmetry::Not || p.symmetry == Symmetry::Not {
            self.symmetry = Symmetry::Not;
        } else if self.symmetry == p.symmetry {
            self.symmetry = Symmetry::Normal;
        } else {
            self.symmetry = Symmetry::Anti;
        }
        self.hermitian = commute && self.hermitian && p.hermitian;
        self.diagonal = self.diagonal && p.diagonal;
        self.combine_triangular(p);
    }

    /// Combine for a complex scalar multiple: structurally nothing changes
    pub fn combine_scale(&mut self) {}

    /// Combine for a tensor product
    ///
    /// Symmetry type survives only when both factors share it; the product
    /// of two anti-symmetric factors is symmetric. Diagonality and
    /// triangularity require both factors.
    pub fn combine_tensor(&mut self, p: &OpProperty) {
        if self.symmetry == Symmetry::Not || p.symmetry == Symmetry::Not {
            self.symmetry = Symmetry::Not;
        } else if self.symmetry == p.symmetry {
            self.symmetry = Symmetry::Normal;
        } else {
            self.symmetry = Symmetry::Anti;
        }
        self.hermitian = self.hermitian && p.hermitian;
        self.diagonal = self.diagonal && p.diagonal;
        self.combine_triangular(p);
    }

    /// Shared triangularity rule: evaluated after the diagonal flag has
    /// been combined, so a diagonal result adopts the partner's class and
    /// a diagonal partner is transparent.
    fn combine_triangular(&mut self, p: &OpProperty) {
        if self.diagonal {
            self.triangular = p.triangular;
        } else if !p.diagonal && self.triangular != p.triangular {
            self.triangular = Triangular::Not;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(
        symmetry: Symmetry,
        hermitian: bool,
        diagonal: bool,
        triangular: Triangular,
    ) -> OpProperty {
        OpProperty {
            symmetry,
            hermitian,
            diagonal,
            triangular,
        }
    }

    #[test]
    fn test_add_agreeing_operands() {
        // σx + σx stays symmetric Hermitian
        let mut p = prop(Symmetry::Normal, true, false, Triangular::Not);
        p.combine_add(&p.clone());
        assert_eq!(p, prop(Symmetry::Normal, true, false, Triangular::Not));
    }

    #[test]
    fn test_add_disagreeing_symmetry_degrades() {
        // σx + σy: Normal + Anti -> Not
        let mut p = prop(Symmetry::Normal, true, false, Triangular::Not);
        p.combine_add(&prop(Symmetry::Anti, true, false, Triangular::Not));
        assert_eq!(p.symmetry, Symmetry::Not);
        assert!(p.hermitian);
    }

    #[test]
    fn test_add_diagonal_is_symmetry_transparent() {
        // Diagonal + anti-symmetric keeps the partner's symmetry
        let mut p = OpProperty::diagonal_hermitian();
        p.combine_add(&prop(Symmetry::Anti, true, false, Triangular::Not));
        assert_eq!(p.symmetry, Symmetry::Anti);
        assert!(!p.diagonal);

        // And the other way round
        let mut p = prop(Symmetry::Anti, true, false, Triangular::Not);
        p.combine_add(&OpProperty::diagonal_hermitian());
        assert_eq!(p.symmetry, Symmetry::Anti);
    }

    #[test]
    fn test_add_triangular() {
        let upper = prop(Symmetry::Not, false, false, Triangular::Upper);
        let lower = prop(Symmetry::Not, false, false, Triangular::Lower);

        let mut p = upper;
        p.combine_add(&upper.clone());
        assert_eq!(p.triangular, Triangular::Upper);

        let mut p = upper;
        p.combine_add(&lower);
        assert_eq!(p.triangular, Triangular::Not);

        // Diagonal partner is transparent
        let mut p = upper;
        p.combine_add(&OpProperty::diagonal_hermitian());
        assert_eq!(p.triangular, Triangular::Upper);
    }

    #[test]
    fn test_mul_requires_commuting_factors() {
        // Non-diagonal factors lose symmetry and hermiticity
        let mut p = prop(Symmetry::Normal, true, false, Triangular::Not);
        p.combine_mul(&prop(Symmetry::Normal, true, false, Triangular::Not));
        assert_eq!(p.symmetry, Symmetry::Not);
        assert!(!p.hermitian);
    }

    #[test]
    fn test_mul_diagonal_factors() {
        let mut p = OpProperty::diagonal_hermitian();
        p.combine_mul(&OpProperty::diagonal_hermitian());
        assert_eq!(p, OpProperty::diagonal_hermitian());
    }

    #[test]
    fn test_mul_anti_times_anti_is_normal() {
        let anti_diag = prop(Symmetry::Anti, false, true, Triangular::Not);
        let mut p = anti_diag;
        p.combine_mul(&anti_diag.clone());
        assert_eq!(p.symmetry, Symmetry::Normal);
    }

    #[test]
    fn test_scale_changes_nothing() {
        let mut p = prop(Symmetry::Anti, true, false, Triangular::Upper);
        let before = p;
        p.combine_scale();
        assert_eq!(p, before);
    }

    #[test]
    fn test_tensor_symmetry() {
        // Normal ⊗ Normal = Normal, Anti ⊗ Anti = Normal, mixed = Anti
        let normal = prop(Symmetry::Normal, true, false, Triangular::Not);
        let anti = prop(Symmetry::Anti, true, false, Triangular::Not);

        let mut p = normal;
        p.combine_tensor(&normal.clone());
        assert_eq!(p.symmetry, Symmetry::Normal);

        let mut p = anti;
        p.combine_tensor(&anti.clone());
        assert_eq!(p.symmetry, Symmetry::Normal);

        let mut p = normal;
        p.combine_tensor(&anti);
        assert_eq!(p.symmetry, Symmetry::Anti);
    }

    #[test]
    fn test_tensor_diagonal_and_triangular() {
        let mut p = OpProperty::diagonal_hermitian();
        p.combine_tensor(&OpProperty::diagonal_hermitian());
        assert!(p.diagonal);

        let upper = prop(Symmetry::Not, false, false, Triangular::Upper);
        let mut p = OpProperty::diagonal_hermitian();
        p.combine_tensor(&upper);
        assert!(!p.diagonal);
        assert_eq!(p.triangular, Triangular::Upper);
    }
}
