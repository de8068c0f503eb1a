use statrs::distribution::{Discrete, Hypergeometric};

use crate::stats::error_prob_to_phred;

/// Tail of a Fisher exact test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternative {
    /// Probability of tables at most as likely as the observed one.
    TwoSided,
    /// Probability of a top-left count at most the observed one.
    Less,
    /// Probability of a top-left count at least the observed one.
    Greater,
}

/// Relative tolerance used when comparing table probabilities for the
/// two-sided test (matches R's `fisher.test`).
const RELATIVE_TOLERANCE: f64 = 1.0 + 1e-7;

/// Fisher exact test on the 2x2 table `[[a, b], [c, d]]`.
///
/// Any empty margin admits a single table, so the probability is 1.0 for every
/// alternative. The result is always within `[0, 1]`.
pub fn fisher_exact_test(a: u64, b: u64, c: u64, d: u64, alternative: Alternative) -> f64 {
    let row1 = a + b;
    let row2 = c + d;
    let col1 = a + c;
    let col2 = b + d;
    if row1 == 0 || row2 == 0 || col1 == 0 || col2 == 0 {
        return 1.0;
    }

    let total = row1 + row2;
    // top-left count given fixed margins is hypergeometric
    let Ok(dist) = Hypergeometric::new(total, col1, row1) else {
        return 1.0;
    };
    let min_a = (row1 + col1).saturating_sub(total);
    let max_a = row1.min(col1);

    let p: f64 = match alternative {
        Alternative::Less => (min_a..=a).map(|x| dist.ln_pmf(x).exp()).sum(),
        Alternative::Greater => (a..=max_a).map(|x| dist.ln_pmf(x).exp()).sum(),
        Alternative::TwoSided => {
            let observed = dist.ln_pmf(a);
            let ln_cutoff = observed + RELATIVE_TOLERANCE.ln();
            (min_a..=max_a)
                .map(|x| dist.ln_pmf(x))
                .filter(|&lp| lp <= ln_cutoff)
                .map(f64::exp)
                .sum::<f64>()
        }
    };
    p.clamp(0.0, 1.0)
}

/// Phred-scaled strand-bias score of an allele pair.
///
/// The table is reference vs. alternate allele by forward vs. reverse strand;
/// the score is `-10 log10(p)` of the two-sided Fisher test, so 0 means no
/// evidence of bias.
pub fn strand_bias_score(ref_fwd: u32, ref_rev: u32, alt_fwd: u32, alt_rev: u32) -> f64 {
    let p = fisher_exact_test(
        ref_fwd as u64,
        ref_rev as u64,
        alt_fwd as u64,
        alt_rev as u64,
        Alternative::TwoSided,
    );
    error_prob_to_phred(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: f64, actual: f64) {
        let tolerance = expected.abs() * 1e-6;
        assert!(
            (expected - actual).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn matches_textbook_example() {
        assert_close(
            6.73038093956118699e-05,
            fisher_exact_test(0, 10, 12, 2, Alternative::TwoSided),
        );
    }

    #[test]
    fn zero_margins_yield_one() {
        for alternative in [Alternative::TwoSided, Alternative::Less, Alternative::Greater] {
            assert_eq!(fisher_exact_test(0, 0, 4, 122, alternative), 1.0);
            assert_eq!(fisher_exact_test(1, 0, 0, 0, alternative), 1.0);
            assert_eq!(fisher_exact_test(0, 8, 0, 2, alternative), 1.0);
            assert_eq!(fisher_exact_test(16, 0, 8, 0, alternative), 1.0);
        }
    }

    #[test]
    fn one_sided_tails() {
        assert_close(0.8, fisher_exact_test(7, 1, 2, 0, Alternative::Less));
        assert_close(1.0, fisher_exact_test(7, 1, 2, 0, Alternative::Greater));
        assert_close(0.2222222, fisher_exact_test(0, 126, 1, 35, Alternative::TwoSided));
    }

    #[test]
    fn balanced_strands_have_low_bias_score() {
        assert!(strand_bias_score(10, 10, 10, 10) < 1.0);
        assert!(strand_bias_score(20, 20, 20, 0) > 20.0);
    }
}
