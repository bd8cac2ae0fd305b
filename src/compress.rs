//! The compression engine: folds buffered values and existing centroids into a new,
//! weight-respecting centroid sequence.

use tracing::trace;

use crate::centroid::Centroid;
use crate::scale::ScaleFunction;

/// Merges `centroids` and `buffered` raw values into a sorted, compressed centroid sequence.
///
/// Every buffered value enters as a centroid of weight one. The combined sequence is sorted by
/// mean (stable, so equal means keep their insertion order) and swept once from left to right.
/// A cluster starting at cumulative quantile `q0` keeps absorbing its right neighbour while the
/// cumulative weight stays within [`ScaleFunction::q_limit`] of `q0`.
///
/// Total weight and the weighted mean of the input are preserved up to rounding.
///
/// # Examples
///
/// ```rust
/// use quantile_digest::compress::compress_centroids;
/// use quantile_digest::ScaleFamily;
///
/// let values = (0..10_000).map(|i| i as f64).collect::<Vec<_>>();
/// let centroids = compress_centroids(Vec::new(), &values, 100.0, &ScaleFamily::ArcSine);
///
/// assert!(centroids.len() <= 100);
/// assert_eq!(centroids.iter().map(|c| c.weight).sum::<f64>(), 10_000.0);
/// ```
pub fn compress_centroids<S>(
    mut centroids: Vec<Centroid>,
    buffered: &[f64],
    compression: f64,
    scale: &S,
) -> Vec<Centroid>
where
    S: ScaleFunction + ?Sized,
{
    let centroids_in = centroids.len();
    centroids.extend(buffered.iter().copied().map(Centroid::unit));
    if centroids.is_empty() {
        return centroids;
    }

    centroids.sort_by(|a, b| a.mean.total_cmp(&b.mean));

    let total_weight: f64 = centroids.iter().map(|c| c.weight).sum();
    let mut merged = Vec::with_capacity((compression.ceil() as usize).min(centroids.len()));
    let mut sorted = centroids.into_iter();
    let mut current = match sorted.next() {
        Some(first) => first,
        None => return merged,
    };

    // weight of every cluster already emitted
    let mut weight_so_far = 0.0;
    let mut weight_limit = total_weight * scale.q_limit(0.0, compression);

    for centroid in sorted {
        let proposed_weight = weight_so_far + current.weight + centroid.weight;
        if proposed_weight <= weight_limit {
            current.add(&centroid);
        } else {
            weight_so_far += current.weight;
            merged.push(current);
            current = centroid;
            weight_limit = total_weight * scale.q_limit(weight_so_far / total_weight, compression);
        }
    }
    merged.push(current);

    trace!(
        centroids_in,
        buffered = buffered.len(),
        centroids_out = merged.len(),
        total_weight,
        "compressed digest"
    );

    merged
}
