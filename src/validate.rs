use crate::error::CtcError;

/// Checks that every frame has the same non-zero width and returns it.
///
/// Returns `None` for an empty sequence; the callers all have a dedicated
/// base case for that.
pub(crate) fn frame_width(log_probs: &[Vec<f64>]) -> Result<Option<usize>, CtcError> {
    let Some(first) = log_probs.first() else {
        return Ok(None);
    };
    let width = first.len();
    if width == 0 {
        return Err(CtcError::invalid_input(
            "frames must have at least the blank entry",
        ));
    }
    for (t, frame) in log_probs.iter().enumerate() {
        if frame.len() != width {
            return Err(CtcError::invalid_input(format!(
                "frame {} has width {}, expected {}",
                t,
                frame.len(),
                width
            )));
        }
    }
    Ok(Some(width))
}

/// Checks that every label index addresses a real (non-blank) symbol.
pub(crate) fn check_label(label: &[usize], width: usize) -> Result<(), CtcError> {
    // The blank occupies the last slot, so real symbols live in [0, width-1).
    let symbols = width - 1;
    for (i, &idx) in label.iter().enumerate() {
        if idx >= symbols {
            return Err(CtcError::invalid_input(format!(
                "label entry {} is {}, but the alphabet has {} symbols",
                i, idx, symbols
            )));
        }
    }
    Ok(())
}
