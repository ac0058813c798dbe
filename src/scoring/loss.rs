//! Numerically stable loss primitives.

use candle_core::{D, Result, Tensor};

/// Summed binary cross-entropy on raw logits.
///
/// Uses `max(x, 0) - x*y + ln(1 + e^{-|x|})`, which stays finite for any
/// finite logit. `weights` (same shape as `logits`) scales each term; a zero
/// weight drops the term.
pub fn binary_cross_entropy_with_logits_sum(
    logits: &Tensor,
    targets: &Tensor,
    weights: Option<&Tensor>,
) -> Result<Tensor> {
    let log_tail = (logits.abs()?.neg()?.exp()? + 1.0)?.log()?;
    let per_element = ((logits.relu()? - (logits * targets)?)? + log_tail)?;
    let per_element = match weights {
        Some(weights) => (per_element * weights)?,
        None => per_element,
    };
    per_element.sum_all()
}

/// `ln Σ e^x` along `dim`, shifted by the maximum to avoid overflow.
pub fn log_sum_exp(xs: &Tensor, dim: D) -> Result<Tensor> {
    let max = xs.max_keepdim(dim)?;
    let shifted_sum = xs.broadcast_sub(&max)?.exp()?.sum_keepdim(dim)?;
    shifted_sum.log()?.add(&max)?.squeeze(dim)
}
