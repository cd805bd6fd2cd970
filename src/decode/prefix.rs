//! Exact prefix-search decoding.
//!
//! The frame sequence is first segmented at high-confidence blanks: a frame
//! whose blank log-probability exceeds the threshold cannot sit inside any
//! optimal prefix, so it is dropped and acts as a hard separator. Each run is
//! then decoded by exhaustively enumerating output prefixes, tracking for
//! every prefix the probability of the alignments that end in a blank and of
//! those that do not, and merging duplicates in log space. No pruning happens
//! unless a beam cap is explicitly configured.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::PrefixSearchConfig;
use crate::error::CtcError;
use crate::math::log_add;
use crate::validate::frame_width;

/// Prefix state identity: the candidate prefix plus whether its most recent
/// frame was a blank. Ordered by flag, then length, then symbols, so decoding
/// is deterministic regardless of accumulation order.
#[derive(Clone, Debug, PartialEq, Eq)]
struct StateKey {
    ends_blank: bool,
    prefix: Vec<usize>,
}

impl Ord for StateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ends_blank
            .cmp(&other.ends_blank)
            .then_with(|| self.prefix.len().cmp(&other.prefix.len()))
            .then_with(|| self.prefix.cmp(&other.prefix))
    }
}

impl PartialOrd for StateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Prefix-search decoding with the given blank separator threshold and no
/// beam cap.
pub fn prefix_search(log_probs: &[Vec<f64>], blank_threshold: f64) -> Result<Vec<usize>, CtcError> {
    prefix_search_with(
        log_probs,
        &PrefixSearchConfig {
            blank_threshold,
            beam_width: None,
        },
    )
}

/// Prefix-search decoding with explicit options.
pub fn prefix_search_with(
    log_probs: &[Vec<f64>],
    config: &PrefixSearchConfig,
) -> Result<Vec<usize>, CtcError> {
    let Some(width) = frame_width(log_probs)? else {
        return Ok(Vec::new());
    };
    let blank = width - 1;

    let mut decoded = Vec::new();
    let mut run: Vec<&[f64]> = Vec::new();
    let mut run_count = 0usize;
    for frame in log_probs {
        if frame[blank] > config.blank_threshold {
            if !run.is_empty() {
                run_count += 1;
                decoded.extend(decode_run(&run, blank, config.beam_width));
                run.clear();
            }
        } else {
            run.push(frame);
        }
    }
    if !run.is_empty() {
        run_count += 1;
        decoded.extend(decode_run(&run, blank, config.beam_width));
    }

    tracing::debug!(
        frames = log_probs.len(),
        runs = run_count,
        decoded_len = decoded.len(),
        "prefix search: decoded segmented runs"
    );
    Ok(decoded)
}

/// Decodes one separator-free run and returns its most likely prefix.
fn decode_run(run: &[&[f64]], blank: usize, beam_width: Option<usize>) -> Vec<usize> {
    let mut states: BTreeMap<StateKey, f64> = BTreeMap::new();
    states.insert(
        StateKey {
            ends_blank: true,
            prefix: Vec::new(),
        },
        0.0,
    );

    let mut truncated = 0usize;
    for frame in run {
        let mut next: BTreeMap<StateKey, f64> = BTreeMap::new();

        for (key, &prob) in &states {
            let last = key.prefix.last().copied();

            // Emit a blank: the prefix is unchanged and now ends in a blank.
            bump(
                &mut next,
                StateKey {
                    ends_blank: true,
                    prefix: key.prefix.clone(),
                },
                prob + frame[blank],
            );

            // Repeat the last symbol without an intervening blank: still the
            // same prefix, still not blank-terminated.
            if !key.ends_blank {
                if let Some(last) = last {
                    bump(
                        &mut next,
                        StateKey {
                            ends_blank: false,
                            prefix: key.prefix.clone(),
                        },
                        prob + frame[last],
                    );
                }
            }

            // Extend the prefix by each real symbol. Extending with the
            // prefix's own last symbol is only a new emission when a blank
            // intervened; from the non-blank state it would be the repeat
            // handled above.
            for k in 0..blank {
                if !key.ends_blank && last == Some(k) {
                    continue;
                }
                let mut prefix = key.prefix.clone();
                prefix.push(k);
                bump(
                    &mut next,
                    StateKey {
                        ends_blank: false,
                        prefix,
                    },
                    prob + frame[k],
                );
            }
        }

        if let Some(cap) = beam_width {
            if next.len() > cap {
                truncated += next.len() - cap;
                next = keep_best(next, cap);
            }
        }
        states = next;
    }
    if truncated > 0 {
        tracing::warn!(
            dropped_states = truncated,
            "prefix search: beam cap truncated the state set, result is approximate"
        );
    }

    // Fold the ends-with-blank twins together and take the argmax. Iteration
    // is in key order, and only a strictly greater probability displaces the
    // incumbent, so ties resolve to the smaller key.
    let mut totals: BTreeMap<Vec<usize>, f64> = BTreeMap::new();
    for (key, prob) in states {
        totals
            .entry(key.prefix)
            .and_modify(|p| *p = log_add(*p, prob))
            .or_insert(prob);
    }
    let mut best: Vec<usize> = Vec::new();
    let mut best_prob = f64::NEG_INFINITY;
    for (prefix, prob) in totals {
        if best_prob == f64::NEG_INFINITY || prob > best_prob {
            best_prob = prob;
            best = prefix;
        }
    }
    best
}

fn bump(map: &mut BTreeMap<StateKey, f64>, key: StateKey, log_prob: f64) {
    map.entry(key)
        .and_modify(|p| *p = log_add(*p, log_prob))
        .or_insert(log_prob);
}

/// Keeps the `cap` most probable states, resolving probability ties toward
/// the smaller key.
fn keep_best(states: BTreeMap<StateKey, f64>, cap: usize) -> BTreeMap<StateKey, f64> {
    let mut ranked: Vec<(StateKey, f64)> = states.into_iter().collect();
    ranked.sort_by(|(ka, pa), (kb, pb)| {
        pb.partial_cmp(pa).unwrap_or(Ordering::Equal).then_with(|| ka.cmp(kb))
    });
    ranked.truncate(cap);
    ranked.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two-symbol alphabet helper: p(sym0), p(blank).
    fn frame2(p0: f64, pb: f64) -> Vec<f64> {
        vec![p0.ln(), pb.ln()]
    }

    #[test]
    fn empty_sequence_decodes_empty() {
        assert!(prefix_search(&[], -1e-3).unwrap().is_empty());
    }

    #[test]
    fn blank_separated_occurrences_both_decode() {
        // Symbol 0 dominates two frames split by confident blanks; the
        // blanks separate them into two emissions.
        let frames = vec![
            frame2(1e-4, 0.9999),
            frame2(0.9, 0.1),
            frame2(1e-4, 0.9999),
            frame2(0.9, 0.1),
            frame2(1e-4, 0.9999),
            frame2(1e-4, 0.9999),
        ];
        assert_eq!(prefix_search(&frames, -1e-2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn repeat_within_a_run_needs_probability_support() {
        // A single run strongly favoring symbol 0 in both frames reads as
        // one emission, not two.
        let frames = vec![frame2(0.95, 0.05), frame2(0.95, 0.05)];
        assert_eq!(prefix_search(&frames, -1e-6).unwrap(), vec![0]);
    }

    #[test]
    fn all_separator_frames_decode_empty() {
        let frames = vec![frame2(1e-4, 0.9999), frame2(1e-4, 0.9999)];
        assert!(prefix_search(&frames, -1e-2).unwrap().is_empty());
    }

    #[test]
    fn more_separators_never_lengthen_output() {
        // Monotonically rising blank confidence across the sequence. A lower
        // threshold classifies more frames as separators; that can only
        // shorten (or preserve) the decoded label.
        let frames: Vec<Vec<f64>> = (1..=8)
            .map(|i| {
                let pb = i as f64 / 9.0;
                frame2(1.0 - pb, pb)
            })
            .collect();
        let mut last_len = 0usize;
        for thresh in [-2.0, -1.0, -0.5, -0.2, -0.05] {
            let len = prefix_search(&frames, thresh).unwrap().len();
            assert!(len >= last_len, "thresh {thresh} shortened the output");
            last_len = len;
        }
    }

    #[test]
    fn beam_cap_keeps_the_dominant_prefix() {
        let frames = vec![
            vec![0.8f64.ln(), 0.1f64.ln(), 0.1f64.ln()],
            vec![0.1f64.ln(), 0.8f64.ln(), 0.1f64.ln()],
        ];
        let exact = prefix_search(&frames, -1e-6).unwrap();
        let capped = prefix_search_with(
            &frames,
            &PrefixSearchConfig {
                blank_threshold: -1e-6,
                beam_width: Some(4),
            },
        )
        .unwrap();
        assert_eq!(exact, vec![0, 1]);
        assert_eq!(capped, exact);
    }

    #[test]
    fn state_key_order_is_flag_then_length_then_symbols() {
        let a = StateKey { ends_blank: false, prefix: vec![1, 1] };
        let b = StateKey { ends_blank: false, prefix: vec![0, 0, 0] };
        let c = StateKey { ends_blank: true, prefix: vec![] };
        assert!(a < b);
        assert!(b < c);
        assert!(
            StateKey { ends_blank: false, prefix: vec![0, 1] }
                < StateKey { ends_blank: false, prefix: vec![1, 0] }
        );
    }
}
