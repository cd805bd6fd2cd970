//! Log-domain arithmetic shared by the likelihood engine and both decoders.
//!
//! Probabilities are carried as natural logarithms, with `f64::NEG_INFINITY`
//! standing in for probability zero. Every operation here must stay exact for
//! −∞ operands: no `exp(−∞)` and no NaN may ever be produced.

use std::ops::{Add, AddAssign};

/// Stable `log(exp(a) + exp(b))`.
///
/// The finite operand passes through unchanged when the other is −∞, and
/// `log_add(−∞, −∞) == −∞` exactly.
pub fn log_add(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let normalizer = a.max(b);
    normalizer + ((a - normalizer).exp() + (b - normalizer).exp()).ln()
}

/// Partials of `log_add(a, b)` scaled by an upstream gradient.
///
/// Gradient flows to each operand in proportion to its softmax share of the
/// sum: `da = upstream * exp(a - log_add(a, b))` and likewise for `b`.
/// Returns `(0.0, 0.0)` when both operands are −∞.
pub fn log_add_grad(a: f64, b: f64, upstream: f64) -> (f64, f64) {
    if a == f64::NEG_INFINITY && b == f64::NEG_INFINITY {
        return (0.0, 0.0);
    }
    let denom = log_add(a, b);
    (upstream * (a - denom).exp(), upstream * (b - denom).exp())
}

/// A log-probability paired with a directional tangent.
///
/// The tangent rides along every likelihood and gradient computation so that
/// downstream optimizers can extract directional second derivatives from the
/// same code path that produces plain gradients. A zero tangent makes every
/// operation here reduce exactly to its scalar counterpart.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dual {
    pub val: f64,
    pub tan: f64,
}

impl Dual {
    pub const ZERO: Dual = Dual { val: 0.0, tan: 0.0 };
    pub const NEG_INFINITY: Dual = Dual {
        val: f64::NEG_INFINITY,
        tan: 0.0,
    };

    pub fn new(val: f64, tan: f64) -> Self {
        Self { val, tan }
    }

    /// A value with no tangent component.
    pub fn constant(val: f64) -> Self {
        Self { val, tan: 0.0 }
    }
}

impl Add for Dual {
    type Output = Dual;

    fn add(self, rhs: Dual) -> Dual {
        Dual {
            val: self.val + rhs.val,
            tan: self.tan + rhs.tan,
        }
    }
}

impl AddAssign for Dual {
    fn add_assign(&mut self, rhs: Dual) {
        self.val += rhs.val;
        self.tan += rhs.tan;
    }
}

/// `log_add` over dual numbers.
///
/// The value component matches `log_add(a.val, b.val)` bit for bit; the
/// tangent is the softmax-weighted average of the operand tangents. The −∞
/// early returns also pass the surviving operand's tangent through untouched.
pub fn log_add_dual(a: Dual, b: Dual) -> Dual {
    if a.val == f64::NEG_INFINITY {
        return b;
    }
    if b.val == f64::NEG_INFINITY {
        return a;
    }
    let normalizer = a.val.max(b.val);
    let ea = (a.val - normalizer).exp();
    let eb = (b.val - normalizer).exp();
    Dual {
        val: normalizer + (ea + eb).ln(),
        tan: (ea * a.tan + eb * b.tan) / (ea + eb),
    }
}

/// `log_add_grad` over dual numbers.
///
/// The partial for each operand is its softmax share of the sum; its tangent
/// applies the product rule through both the upstream tangent and the
/// tangent of the share itself (which depends on the operand and the sum).
pub fn log_add_grad_dual(a: Dual, b: Dual, upstream: Dual) -> (Dual, Dual) {
    if a.val == f64::NEG_INFINITY && b.val == f64::NEG_INFINITY {
        return (Dual::ZERO, Dual::ZERO);
    }
    let denom = log_add_dual(a, b);
    let ea = (a.val - denom.val).exp();
    let eb = (b.val - denom.val).exp();
    let da = Dual {
        val: upstream.val * ea,
        tan: upstream.tan * ea + upstream.val * ea * (a.tan - denom.tan),
    };
    let db = Dual {
        val: upstream.val * eb,
        tan: upstream.tan * eb + upstream.val * eb * (b.tan - denom.tan),
    };
    (da, db)
}
