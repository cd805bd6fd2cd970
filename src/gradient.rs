//! Reverse-mode differentiation of the forward CTC recursion.
//!
//! The reverse pass walks the retained table backwards, undoing one forward
//! update per frame. Additive terms pass their upstream gradient through
//! unchanged; every `log_add` the forward pass took is mirrored by a
//! `log_add_grad` call distributing the upstream in proportion to each
//! operand's share of the sum. The whole pass runs on dual numbers, so the
//! tangent-carrying mode and the plain mode are the same code: a zero
//! tangent upstream reproduces the plain gradient exactly.

use crate::likelihood::{initial_row, ForwardPass};
use crate::math::{log_add_dual, log_add_grad_dual, Dual};

/// Per-frame gradients of the log-likelihood, one entry per symbol (blank
/// included), plus their tangents when the pass carried one.
#[derive(Debug, Clone)]
pub struct FrameGradients {
    /// T × (K + 1), ∂ log-likelihood / ∂ frame[t][k].
    pub values: Vec<Vec<f64>>,
    /// Directional derivatives of `values` along the pass's tangent; all
    /// zeros for a tangent-free pass.
    pub tangents: Vec<Vec<f64>>,
}

impl ForwardPass {
    /// Gradient of the log-likelihood with respect to every input
    /// log-probability, scaled by `upstream`.
    ///
    /// Re-runnable for any upstream scalar; the retained forward table is
    /// never recomputed.
    pub fn gradient(&self, upstream: f64) -> Vec<Vec<f64>> {
        self.gradient_dual(Dual::constant(upstream)).values
    }

    /// Like [`gradient`](Self::gradient), but the upstream is a dual number
    /// and the result carries tangents for curvature estimation.
    pub fn gradient_dual(&self, upstream: Dual) -> FrameGradients {
        let frames = self.rows.len();
        let mut grads = FrameGradients {
            values: vec![vec![0.0; self.width]; frames],
            tangents: vec![vec![0.0; self.width]; frames],
        };
        if frames == 0 {
            return grads;
        }

        let m = 2 * self.label.len() + 1;
        let blank = self.width - 1;

        // Seed: the output is log_add of the last row's final two positions,
        // or just position 0 for the empty label.
        let mut up = vec![Dual::ZERO; m];
        if self.label.is_empty() {
            up[0] = upstream;
        } else {
            let last = &self.rows[frames - 1];
            let (d_last, d_prev) = log_add_grad_dual(last[m - 1], last[m - 2], upstream);
            up[m - 1] = d_last;
            up[m - 2] = d_prev;
        }

        let init = initial_row(m);
        for t in (0..frames).rev() {
            let prev: &[Dual] = if t == 0 { &init } else { &self.rows[t - 1] };
            let mut prev_up = vec![Dual::ZERO; m];
            let frame_grad = &mut grads.values[t];
            let frame_tan = &mut grads.tangents[t];

            let mut emit = |k: usize, g: Dual| {
                frame_grad[k] += g.val;
                frame_tan[k] += g.tan;
            };

            // Position 0 read only prev[0] and the blank entry.
            emit(blank, up[0]);
            prev_up[0] += up[0];

            for s in (2..m).step_by(2) {
                emit(blank, up[s]);
                let (da, db) = log_add_grad_dual(prev[s - 1], prev[s], up[s]);
                prev_up[s - 1] += da;
                prev_up[s] += db;
            }
            for s in (1..m).step_by(2) {
                let idx = (s - 1) / 2;
                emit(self.label[idx], up[s]);
                if idx > 0 && self.label[idx - 1] != self.label[idx] {
                    // Forward took log_add(prev[s-2], log_add(prev[s-1],
                    // prev[s])); undo the outer sum, then the inner one.
                    let inner = log_add_dual(prev[s - 1], prev[s]);
                    let (d_skip, d_inner) = log_add_grad_dual(prev[s - 2], inner, up[s]);
                    prev_up[s - 2] += d_skip;
                    let (da, db) = log_add_grad_dual(prev[s - 1], prev[s], d_inner);
                    prev_up[s - 1] += da;
                    prev_up[s] += db;
                } else {
                    let (da, db) = log_add_grad_dual(prev[s - 1], prev[s], up[s]);
                    prev_up[s - 1] += da;
                    prev_up[s] += db;
                }
            }

            // Whatever reaches the conceptual pre-frame row is discarded:
            // its entries are constants.
            up = prev_up;
        }

        grads
    }
}
