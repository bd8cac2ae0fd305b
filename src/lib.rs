//! # Quantile Digest
//!
//! A bounded-memory, mergeable [t-digest](https://github.com/tdunning/t-digest) for estimating
//! percentiles over data streams that cannot be kept in memory.
//!
//! ## Features
//!
//! - Buffered ingestion with a caller-controlled buffer capacity.
//! - Pluggable scale functions that spend accuracy where it matters: at the tails.
//! - Quantile, rank and trimmed-mean estimation.
//! - Merging of digests built on different nodes, plus a versioned binary wire form to ship them.
//!
//! ## Example
//!
//! ```rust
//! use quantile_digest::TDigest;
//!
//! // Create a digest with compression 100 and room for 500 buffered values
//! let mut digest = TDigest::new(100.0, 500).unwrap();
//! for i in 1..=10_000 {
//!     digest.add(i as f64).unwrap();
//! }
//!
//! // Estimate quantiles
//! let p99 = digest.quantile(0.99).unwrap();
//! assert!((p99 - 9900.0).abs() < 10.0);
//!
//! // Compute the relative rank of a value
//! let rank = digest.rank(2500.0).unwrap();
//! assert!((rank - 0.25).abs() < 0.01);
//! ```
//!
//! ## Distributed use
//!
//! Build one digest per shard, ship them with [`TDigest::serialize`], and combine them with
//! [`TDigest::merge`] or [`TDigest::merge_all`]. Unlike hash-based sketches, no shared seed is
//! needed across nodes; only the scale family has to match.
//!
//! ```rust
//! use quantile_digest::TDigest;
//!
//! let left = TDigest::from_values((1..=5).map(f64::from), 20.0).unwrap();
//! let right = TDigest::from_values((6..=10).map(f64::from), 20.0).unwrap();
//!
//! let received = TDigest::deserialize(&right.serialize()).unwrap();
//! let merged = left.merge(&received).unwrap();
//! assert_eq!(merged.median().unwrap(), 5.5);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

mod centroid;
pub mod compress;
mod digest;
mod error;
mod query;
mod scale;
mod wire;

pub use centroid::Centroid;
pub use digest::Builder;
pub use digest::Config;
pub use digest::TDigest;
pub use digest::DEFAULT_COMPRESSION;
pub use error::Error;
pub use error::Result;
pub use error::WireError;
pub use scale::ScaleFamily;
pub use scale::ScaleFunction;

/// Computes the empirical quantile from data.
#[doc(hidden)]
pub fn naive_quantile(data: &[f64], q: f64) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let pos = (n as f64 - 1.0) * q.clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = pos - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Computes the empirical rank from data.
#[doc(hidden)]
pub fn naive_rank(data: &[f64], x: f64) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = sorted.iter().filter(|&&v| v <= x).count();
    if pos == 0 {
        return 0.0;
    }
    if pos == sorted.len() {
        return 1.0;
    }
    let lower = pos - 1;
    let upper = pos;
    let fraction = (x - sorted[lower]) / (sorted[upper] - sorted[lower]);
    let lower_q = lower as f64 / (sorted.len() - 1) as f64;
    let upper_q = upper as f64 / (sorted.len() - 1) as f64;
    lower_q + fraction * (upper_q - lower_q)
}
