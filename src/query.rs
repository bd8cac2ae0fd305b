//! Quantile, rank and trimmed-mean estimation over a sorted centroid sequence.
//!
//! Each centroid is placed at the midpoint of the cumulative weight span it covers, and the
//! distribution is read as the piecewise linear curve through those midpoints. Targets before
//! the first midpoint (or after the last) resolve to the first (or last) centroid mean.

use crate::centroid::Centroid;

/// Estimates the value at cumulative probability `q`.
///
/// `centroids` must be non-empty and sorted by mean; `q` is clamped to `[0, 1]`.
pub(crate) fn quantile(centroids: &[Centroid], total_weight: f64, q: f64) -> f64 {
    debug_assert!(!centroids.is_empty());

    let q = q.clamp(0.0, 1.0);
    let first = &centroids[0];
    let last = &centroids[centroids.len() - 1];
    if centroids.len() == 1 || q == 0.0 {
        return first.mean;
    }
    if q == 1.0 {
        return last.mean;
    }

    let target = q * total_weight;
    let mut cumulative = 0.0;
    let mut prev: Option<(f64, f64)> = None;

    for centroid in centroids {
        let mid = cumulative + centroid.weight / 2.0;
        if target < mid {
            return match prev {
                None => centroid.mean,
                Some((prev_mid, prev_mean)) => {
                    let fraction = (target - prev_mid) / (mid - prev_mid);
                    prev_mean * (1.0 - fraction) + centroid.mean * fraction
                }
            };
        }
        cumulative += centroid.weight;
        prev = Some((mid, centroid.mean));
    }

    last.mean
}

/// Estimates the fraction of the distribution at or below `x`, on the same curve as [`quantile`].
///
/// A value equal to one or more centroid means resolves to the midpoint of their combined span.
pub(crate) fn rank(centroids: &[Centroid], total_weight: f64, x: f64) -> f64 {
    debug_assert!(!centroids.is_empty());

    let first = &centroids[0];
    let last = &centroids[centroids.len() - 1];
    if x < first.mean {
        return 0.0;
    }
    if x > last.mean {
        return 1.0;
    }

    let mut cumulative = 0.0;
    let mut prev: Option<(f64, f64)> = None;
    let mut index = 0;

    while index < centroids.len() {
        let centroid = &centroids[index];
        if x == centroid.mean {
            let tied = centroids[index..]
                .iter()
                .take_while(|c| c.mean == x)
                .map(|c| c.weight)
                .sum::<f64>();
            return (cumulative + tied / 2.0) / total_weight;
        }

        let mid = cumulative + centroid.weight / 2.0;
        if x < centroid.mean {
            // x > first.mean here, so there is always a left neighbour
            let (prev_mid, prev_mean) = prev.unwrap_or((mid, centroid.mean));
            let fraction = span_fraction(prev_mean, x, centroid.mean);
            return (prev_mid + fraction * (mid - prev_mid)) / total_weight;
        }

        cumulative += centroid.weight;
        prev = Some((mid, centroid.mean));
        index += 1;
    }

    1.0
}

/// Position of `x` within `[lo, hi]` as a fraction, without overflowing on extreme spans.
fn span_fraction(lo: f64, x: f64, hi: f64) -> f64 {
    let span = hi - lo;
    let fraction = if span.is_finite() {
        (x - lo) / span
    } else {
        (x * 0.5 - lo * 0.5) / (hi * 0.5 - lo * 0.5)
    };
    fraction.clamp(0.0, 1.0)
}

/// Weighted mean of the mass between cumulative probabilities `lo` and `hi`.
///
/// Centroids straddling either cut contribute the fraction of their weight that lies inside.
pub(crate) fn trimmed_mean(centroids: &[Centroid], total_weight: f64, lo: f64, hi: f64) -> f64 {
    debug_assert!(!centroids.is_empty());

    let lo_weight = lo.clamp(0.0, 1.0) * total_weight;
    let hi_weight = hi.clamp(0.0, 1.0) * total_weight;
    let mut cumulative = 0.0;
    let mut weight = 0.0;
    let mut sum = 0.0;

    for centroid in centroids {
        let start = cumulative;
        let end = cumulative + centroid.weight;
        cumulative = end;

        let inside = end.min(hi_weight) - start.max(lo_weight);
        if inside > 0.0 {
            weight += inside;
            sum += inside * centroid.mean;
        }
        if end >= hi_weight {
            break;
        }
    }

    if weight > 0.0 {
        sum / weight
    } else {
        // empty band: fall back to the value at its position
        quantile(centroids, total_weight, lo)
    }
}
