use crate::error::CtcError;
use crate::validate::frame_width;

/// Greedy best-path decoding: take the most likely symbol of every frame,
/// drop blanks, and collapse runs of repeats not separated by a blank.
pub fn best_path(log_probs: &[Vec<f64>]) -> Result<Vec<usize>, CtcError> {
    let Some(width) = frame_width(log_probs)? else {
        return Ok(Vec::new());
    };
    let blank = width - 1;

    let mut decoded = Vec::new();
    let mut last: Option<usize> = None;
    for frame in log_probs {
        let idx = max_index(frame);
        if idx == blank {
            last = None;
        } else if last != Some(idx) {
            last = Some(idx);
            decoded.push(idx);
        }
    }
    Ok(decoded)
}

/// Index of the maximum entry. Ties keep the earliest index: only a strictly
/// greater value may displace the current max.
fn max_index(frame: &[f64]) -> usize {
    let mut max_val = f64::NEG_INFINITY;
    let mut max_idx = 0;
    for (i, &x) in frame.iter().enumerate() {
        if i == 0 || x > max_val {
            max_val = x;
            max_idx = i;
        }
    }
    max_idx
}
