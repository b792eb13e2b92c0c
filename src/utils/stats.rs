use log::*;
use statrs::distribution::{
    DiscreteCDF,
    Hypergeometric,
};

/// Upper tail `P(X >= k)` of the hypergeometric distribution.
///
/// `population` is the number of genes in the background, `successes` the
/// size of the gene set within it and `draws` the size of the query list.
pub fn hypergeometric_sf(
    k: u64,
    population: u64,
    successes: u64,
    draws: u64,
) -> f64 {
    if k == 0 {
        return 1.0;
    }
    match Hypergeometric::new(population, successes, draws) {
        Ok(dist) => dist.sf(k - 1).clamp(0.0, 1.0),
        Err(e) => {
            warn!(
                "Invalid hypergeometric parameters N={}, K={}, n={}: {}",
                population, successes, draws, e
            );
            1.0
        },
    }
}

/// Benjamini-Hochberg adjusted p-values, in input order.
pub fn bh_adjust(pvalues: &[f64]) -> Vec<f64> {
    if pvalues.is_empty() {
        return Vec::new();
    }
    adjustp::adjust(pvalues, adjustp::Procedure::BenjaminiHochberg)
}

/// Odds ratio of a 2x2 contingency table with the Haldane-Anscombe
/// correction (0.5 added to every cell).
///
/// ```text
///             in set    not in set
/// in list       a           b
/// not in list   c           d
/// ```
pub fn odds_ratio(
    a: u64,
    b: u64,
    c: u64,
    d: u64,
) -> f64 {
    let (a, b, c, d) = (
        a as f64 + 0.5,
        b as f64 + 0.5,
        c as f64 + 0.5,
        d as f64 + 0.5,
    );
    (a * d) / (b * c)
}

/// Enrichr combined score, `-ln(p) * odds ratio`.
pub fn combined_score(
    pvalue: f64,
    odds_ratio: f64,
) -> f64 {
    -pvalue.max(f64::MIN_POSITIVE).ln() * odds_ratio
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    }
    else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median of unsorted values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
    else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn hypergeometric_tail() {
        // Drawing both special items out of 4 with 2 draws: 1 / C(4, 2)
        assert_approx_eq!(hypergeometric_sf(2, 4, 2, 2), 1.0 / 6.0, 1e-9);
        assert_approx_eq!(hypergeometric_sf(0, 10, 3, 4), 1.0);
        assert_approx_eq!(hypergeometric_sf(1, 4, 2, 2), 5.0 / 6.0, 1e-9);
    }

    #[test]
    fn bh_is_monotone_and_bounded() {
        let adjusted = bh_adjust(&[0.01, 0.04, 0.03, 0.5]);
        assert_approx_eq!(adjusted[0], 0.04, 1e-12);
        assert_approx_eq!(adjusted[1], 0.04 * 4.0 / 3.0, 1e-12);
        assert_approx_eq!(adjusted[2], 0.04 * 4.0 / 3.0, 1e-12);
        assert_approx_eq!(adjusted[3], 0.5, 1e-12);
        assert!(bh_adjust(&[]).is_empty());
    }

    #[test]
    fn odds_ratio_is_corrected() {
        assert_approx_eq!(odds_ratio(0, 0, 0, 0), 1.0);
        assert_approx_eq!(odds_ratio(3, 1, 1, 3), (3.5 * 3.5) / (1.5 * 1.5));
    }

    #[test]
    fn central_tendency() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(mean(&[1.0, 2.0]), Some(1.5));
        assert_eq!(median(&[]), None);
    }
}
