//! Forward CTC recursion over the blank-augmented label lattice.
//!
//! The recursion marginalizes, in log space, over every frame-to-label
//! alignment that collapses to the target label. Blanks are interleaved
//! before, between, and after the label symbols, giving an extended label of
//! length `2L + 1` whose even positions are blanks. The full per-frame table
//! is retained so the paired reverse pass (`gradient`) never reruns the
//! forward computation.

use crate::error::CtcError;
use crate::math::{log_add_dual, Dual};
use crate::validate::{check_label, frame_width};

/// One completed forward computation: the log-likelihood of `label` given the
/// frames, plus the alignment-probability table the gradient engine consumes.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    pub(crate) label: Vec<usize>,
    /// K + 1: symbol count plus the trailing blank. Zero only when the frame
    /// sequence itself was empty.
    pub(crate) width: usize,
    /// T rows of 2L + 1 extended-label positions.
    pub(crate) rows: Vec<Vec<Dual>>,
    pub(crate) log_prob: Dual,
}

impl ForwardPass {
    /// Runs the forward recursion with no tangent component.
    pub fn run(log_probs: &[Vec<f64>], label: &[usize]) -> Result<Self, CtcError> {
        Self::run_inner(log_probs, None, label)
    }

    /// Runs the forward recursion carrying a directional tangent: `tangents`
    /// holds the perturbation of every input log-probability, and the
    /// resulting pass exposes the directional derivative of the output via
    /// [`log_likelihood_tangent`](Self::log_likelihood_tangent).
    pub fn run_with_tangent(
        log_probs: &[Vec<f64>],
        tangents: &[Vec<f64>],
        label: &[usize],
    ) -> Result<Self, CtcError> {
        if tangents.len() != log_probs.len()
            || tangents
                .iter()
                .zip(log_probs)
                .any(|(tg, f)| tg.len() != f.len())
        {
            return Err(CtcError::invalid_input(
                "tangent dimensions must match frame dimensions",
            ));
        }
        Self::run_inner(log_probs, Some(tangents), label)
    }

    fn run_inner(
        log_probs: &[Vec<f64>],
        tangents: Option<&[Vec<f64>]>,
        label: &[usize],
    ) -> Result<Self, CtcError> {
        let Some(width) = frame_width(log_probs)? else {
            // No frames at all: only the empty label is readable.
            let log_prob = if label.is_empty() {
                Dual::ZERO
            } else {
                Dual::NEG_INFINITY
            };
            return Ok(Self {
                label: label.to_vec(),
                width: 0,
                rows: Vec::new(),
                log_prob,
            });
        };
        check_label(label, width)?;

        let m = 2 * label.len() + 1;
        let blank = width - 1;
        let mut rows = Vec::with_capacity(log_probs.len());
        let mut prev = initial_row(m);

        for (t, frame) in log_probs.iter().enumerate() {
            let input = |k: usize| Dual::new(frame[k], tangents.map_or(0.0, |tg| tg[t][k]));
            let mut row = vec![Dual::NEG_INFINITY; m];
            // Leading blank only extends itself.
            row[0] = prev[0] + input(blank);
            for s in (2..m).step_by(2) {
                row[s] = log_add_dual(prev[s - 1], prev[s]) + input(blank);
            }
            for s in (1..m).step_by(2) {
                let idx = (s - 1) / 2;
                let mut sum = log_add_dual(prev[s - 1], prev[s]);
                if idx > 0 && label[idx - 1] != label[idx] {
                    // The two-back skip over the intervening blank. Disallowed
                    // for adjacent repeats: a repeat must consume a
                    // blank-emitting frame, or the alignment would collapse
                    // onto a single emission.
                    sum = log_add_dual(prev[s - 2], sum);
                }
                row[s] = input(label[idx]) + sum;
            }
            prev = row.clone();
            rows.push(row);
        }

        // Mass may finish on the trailing blank or the last label symbol.
        let last = &prev;
        let log_prob = if label.is_empty() {
            last[0]
        } else {
            log_add_dual(last[m - 1], last[m - 2])
        };

        Ok(Self {
            label: label.to_vec(),
            width,
            rows,
            log_prob,
        })
    }

    /// Natural-log probability that the frames read as the label.
    pub fn log_likelihood(&self) -> f64 {
        self.log_prob.val
    }

    /// Directional derivative of the log-likelihood along the tangent the
    /// pass was run with; zero when run without one.
    pub fn log_likelihood_tangent(&self) -> f64 {
        self.log_prob.tan
    }

    pub fn frame_count(&self) -> usize {
        self.rows.len()
    }
}

/// The conceptual pre-frame state: all mass at the leading blank.
pub(crate) fn initial_row(m: usize) -> Vec<Dual> {
    let mut row = vec![Dual::NEG_INFINITY; m];
    row[0] = Dual::ZERO;
    row
}

/// Convenience wrapper when the table is not needed afterwards.
pub fn log_likelihood(log_probs: &[Vec<f64>], label: &[usize]) -> Result<f64, CtcError> {
    Ok(ForwardPass::run(log_probs, label)?.log_likelihood())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEG_INF: f64 = f64::NEG_INFINITY;

    fn uniform_frames(t: usize, width: usize) -> Vec<Vec<f64>> {
        vec![vec![(1.0 / width as f64).ln(); width]; t]
    }

    #[test]
    fn empty_frames_empty_label_is_certain() {
        assert_eq!(log_likelihood(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn empty_frames_nonempty_label_is_impossible() {
        assert_eq!(log_likelihood(&[], &[0]).unwrap(), NEG_INF);
    }

    #[test]
    fn label_longer_than_frames_is_impossible() {
        let frames = uniform_frames(1, 3);
        assert_eq!(log_likelihood(&frames, &[0, 1]).unwrap(), NEG_INF);
    }

    #[test]
    fn single_frame_single_symbol() {
        // One frame, alphabet {0} + blank, p(0) = 0.7, p(blank) = 0.3.
        let frames = vec![vec![0.7f64.ln(), 0.3f64.ln()]];
        let ll = log_likelihood(&frames, &[0]).unwrap();
        assert!((ll - 0.7f64.ln()).abs() < 1e-12);
        let ll_empty = log_likelihood(&frames, &[]).unwrap();
        assert!((ll_empty - 0.3f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn repeat_label_requires_blank_frame() {
        // Two frames both heavily favoring symbol 0. [0] should soak up
        // nearly all the mass; [0, 0] needs a blank frame in between and
        // must come out tiny.
        let frames = vec![
            vec![0.98f64.ln(), 0.01f64.ln(), 0.01f64.ln()],
            vec![0.98f64.ln(), 0.01f64.ln(), 0.01f64.ln()],
        ];
        let single = log_likelihood(&frames, &[0]).unwrap();
        let double = log_likelihood(&frames, &[0, 0]).unwrap();
        assert_eq!(double, NEG_INF);
        assert!(single > 0.9f64.ln());

        // With three frames the repeat becomes possible but stays far less
        // likely than the single emission.
        let frames3 = vec![frames[0].clone(), frames[0].clone(), frames[0].clone()];
        let single3 = log_likelihood(&frames3, &[0]).unwrap();
        let double3 = log_likelihood(&frames3, &[0, 0]).unwrap();
        assert!(double3 > NEG_INF);
        assert!(single3 - double3 > 3.0);
    }

    #[test]
    fn distinct_adjacent_symbols_allow_the_skip() {
        // [0, 1] over two frames is feasible without any blank frame.
        let frames = vec![
            vec![0.9f64.ln(), 0.05f64.ln(), 0.05f64.ln()],
            vec![0.05f64.ln(), 0.9f64.ln(), 0.05f64.ln()],
        ];
        let ll = log_likelihood(&frames, &[0, 1]).unwrap();
        assert!((ll - (0.9f64 * 0.9).ln()).abs() < 1e-12);
    }

    #[test]
    fn mismatched_widths_are_rejected() {
        let frames = vec![vec![-0.1, -2.3], vec![-0.1, -2.3, -4.0]];
        assert!(matches!(
            log_likelihood(&frames, &[]),
            Err(CtcError::InvalidInput { .. })
        ));
    }

    #[test]
    fn out_of_range_label_is_rejected() {
        let frames = uniform_frames(2, 3);
        assert!(log_likelihood(&frames, &[2]).is_err());
    }

    #[test]
    fn tangent_dimensions_must_match() {
        let frames = uniform_frames(2, 3);
        let tangents = vec![vec![0.0; 3]];
        assert!(ForwardPass::run_with_tangent(&frames, &tangents, &[0]).is_err());
    }

    #[test]
    fn zero_tangent_run_matches_plain_run() {
        let frames = vec![
            vec![0.5f64.ln(), 0.2f64.ln(), 0.3f64.ln()],
            vec![0.1f64.ln(), 0.6f64.ln(), 0.3f64.ln()],
        ];
        let tangents = vec![vec![0.0; 3]; 2];
        let plain = ForwardPass::run(&frames, &[0, 1]).unwrap();
        let dual = ForwardPass::run_with_tangent(&frames, &tangents, &[0, 1]).unwrap();
        assert_eq!(plain.log_likelihood(), dual.log_likelihood());
        assert_eq!(dual.log_likelihood_tangent(), 0.0);
    }
}
