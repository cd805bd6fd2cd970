//! Connectionist Temporal Classification over log-probability frames:
//! label log-likelihood, analytic gradients (with an optional forward-mode
//! tangent for curvature estimation), and two label-free decoders.
//!
//! Frames are vectors of K + 1 natural-log probabilities with the blank
//! symbol stored last. Labels are symbol indices in `[0, K)`.

pub mod config;
pub mod decode;
pub mod error;
pub mod gradient;
pub mod likelihood;
pub mod math;
mod validate;

pub use config::PrefixSearchConfig;
pub use decode::{
    best_path, prefix_search, prefix_search_with, BestPathDecoder, PrefixSearchDecoder,
    SequenceDecoder,
};
pub use error::CtcError;
pub use gradient::FrameGradients;
pub use likelihood::{log_likelihood, ForwardPass};
pub use math::{log_add, log_add_grad, Dual};
