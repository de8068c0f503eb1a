/// Largest phred value produced by the conversions in this module.
pub const MAX_QPHRED: i32 = 999;

/// Convert a phred base quality into an error probability.
pub fn qphred_to_error_prob(qscore: u8) -> f64 {
    10f64.powf(-(qscore as f64) / 10.0)
}

/// Convert an error probability into a rounded phred score in `[0, MAX_QPHRED]`.
pub fn error_prob_to_qphred(error_prob: f64) -> i32 {
    if error_prob.is_nan() || error_prob >= 1.0 {
        return 0;
    }
    let prob = error_prob.max(f64::MIN_POSITIVE);
    let qphred = (-10.0 * prob.log10() + 0.5).floor();
    (qphred as i32).clamp(0, MAX_QPHRED)
}

/// Unrounded phred value of an error probability, floored at zero.
pub fn error_prob_to_phred(error_prob: f64) -> f64 {
    if error_prob.is_nan() || error_prob >= 1.0 {
        return 0.0;
    }
    (-10.0 * error_prob.max(f64::MIN_POSITIVE).log10()).min(MAX_QPHRED as f64)
}

/// Normalise log-likelihoods into probabilities that sum to one.
pub fn normalize_ln_probs(ln_probs: &[f64]) -> Vec<f64> {
    let max = ln_probs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        let n = ln_probs.len().max(1) as f64;
        return vec![1.0 / n; ln_probs.len()];
    }
    let weights: Vec<f64> = ln_probs.iter().map(|lp| (lp - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// `ln(exp(a) + exp(b))` without overflow.
pub fn ln_sum(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max == f64::NEG_INFINITY {
        return max;
    }
    max + ((a - max).exp() + (b - max).exp()).ln()
}
