use std::borrow::Cow;

use tracing::debug;

use crate::centroid::Centroid;
use crate::compress::compress_centroids;
use crate::error::Error;
use crate::error::Result;
use crate::query;
use crate::scale::ScaleFamily;

/// Compression used when none is configured.
pub const DEFAULT_COMPRESSION: f64 = 100.0;

/// Buffer capacity as a multiple of compression, when none is configured.
const BUFFER_FACTOR: f64 = 5.0;

/// Compression of the folds a full buffer triggers, as a multiple of the configured one.
///
/// Sweeping the same tail clusters at the configured compression fold after fold drags their
/// means toward the median. Folding at a finer working resolution and coarsening once, when
/// the digest settles, keeps the tails accurate.
const WORKING_FACTOR: f64 = 4.0;

fn default_buffer_capacity(compression: f64) -> usize {
    (compression * BUFFER_FACTOR).ceil().max(1.0) as usize
}

/// Digest configuration. Fixed for the lifetime of a digest.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Accuracy/memory trade-off, δ. Larger means more centroids.
    pub compression: f64,
    /// Number of raw values buffered before compression runs.
    pub buffer_capacity: usize,
    /// Scale function shaping cluster sizes along the distribution.
    pub scale: ScaleFamily,
}

impl Config {
    fn validate(&self) -> Result<()> {
        if !self.compression.is_finite() || self.compression <= 0.0 {
            return Err(Error::InvalidConfig {
                what: "compression must be finite and positive",
            });
        }
        if self.buffer_capacity == 0 {
            return Err(Error::InvalidConfig {
                what: "buffer capacity must be positive",
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION,
            buffer_capacity: default_buffer_capacity(DEFAULT_COMPRESSION),
            scale: ScaleFamily::default(),
        }
    }
}

/// Builder for [`TDigest`].
///
/// # Examples
///
/// ```rust
/// use quantile_digest::{ScaleFamily, TDigest};
///
/// let digest = TDigest::builder()
///     .compression(200.0)
///     .scale(ScaleFamily::Quadratic)
///     .build()
///     .unwrap();
///
/// assert_eq!(digest.compression(), 200.0);
/// assert_eq!(digest.buffer_capacity(), 1000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    compression: Option<f64>,
    buffer_capacity: Option<usize>,
    scale: ScaleFamily,
}

impl Builder {
    /// Sets the compression parameter. Defaults to 100.
    pub fn compression(mut self, compression: f64) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Sets the buffer capacity. Defaults to five times the compression.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    /// Sets the scale function. Defaults to [`ScaleFamily::ArcSine`].
    pub fn scale(mut self, scale: ScaleFamily) -> Self {
        self.scale = scale;
        self
    }

    /// Validates the configuration and creates an empty digest.
    pub fn build(self) -> Result<TDigest> {
        let compression = self.compression.unwrap_or(DEFAULT_COMPRESSION);
        let config = Config {
            compression,
            buffer_capacity: self
                .buffer_capacity
                .unwrap_or_else(|| default_buffer_capacity(compression)),
            scale: self.scale,
        };
        TDigest::from_config(config)
    }
}

/// A mergeable t-digest with a bounded ingestion buffer.
///
/// Values are appended to an unsorted buffer; when it fills up, the buffer and the existing
/// centroids are folded into a new sorted centroid sequence at a finer working resolution.
/// Queries always observe every added value at the configured compression.
///
/// A digest has no interior mutability: writers need `&mut`, and concurrent readers of a
/// compressed digest are safe.
///
/// # Examples
///
/// ```rust
/// use quantile_digest::TDigest;
///
/// let mut digest = TDigest::new(100.0, 500).unwrap();
/// for i in 1..=1000 {
///     digest.add(i as f64).unwrap();
/// }
///
/// let median = digest.quantile(0.5).unwrap();
/// assert!((median - 500.5).abs() < 5.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TDigest {
    config: Config,
    centroids: Vec<Centroid>,
    /// Sum of centroid weights, excluding the buffer.
    centroid_weight: f64,
    buffer: Vec<f64>,
    /// Whether the centroids are compressed at the configured compression rather than the
    /// working one.
    settled: bool,
    min: f64,
    max: f64,
}

impl Default for TDigest {
    fn default() -> Self {
        Self::empty(Config::default())
    }
}

impl TDigest {
    /// Creates an empty digest.
    ///
    /// Fails with [`Error::InvalidConfig`] if `compression` is not finite and positive, or if
    /// `buffer_capacity` is zero.
    pub fn new(compression: f64, buffer_capacity: usize) -> Result<Self> {
        Self::builder()
            .compression(compression)
            .buffer_capacity(buffer_capacity)
            .build()
    }

    /// Creates an empty digest with the default buffer capacity.
    pub fn with_compression(compression: f64) -> Result<Self> {
        Self::builder().compression(compression).build()
    }

    /// Returns a builder with default settings.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Creates an empty digest from a full configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::empty(config))
    }

    fn empty(config: Config) -> Self {
        Self {
            config,
            centroids: Vec::new(),
            centroid_weight: 0.0,
            buffer: Vec::new(),
            settled: true,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Creates a compressed digest from a list of values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quantile_digest::TDigest;
    ///
    /// let digest = TDigest::from_values(vec![3.0, 1.0, 2.0], 100.0).unwrap();
    /// assert_eq!(digest.quantile(0.5).unwrap(), 2.0);
    /// ```
    pub fn from_values<I>(values: I, compression: f64) -> Result<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut digest = Self::with_compression(compression)?;
        digest.add_all(values)?;
        digest.compress();
        Ok(digest)
    }

    /// Rebuilds a digest from centroids, e.g. ones received from another node.
    ///
    /// Centroids may arrive in any order. Fails with [`Error::IncompatibleDigest`] if a centroid
    /// has a non-finite mean or a weight below one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quantile_digest::{Centroid, TDigest};
    ///
    /// let centroids = vec![
    ///     Centroid::new(30.0, 1.0),
    ///     Centroid::new(10.0, 1.0),
    ///     Centroid::new(20.0, 2.0),
    /// ];
    /// let digest = TDigest::from_centroids(centroids, 100.0).unwrap();
    /// assert_eq!(digest.total_weight(), 4.0);
    /// assert_eq!(digest.quantile(0.0).unwrap(), 10.0);
    /// ```
    pub fn from_centroids(centroids: Vec<Centroid>, compression: f64) -> Result<Self> {
        let mut digest = Self::with_compression(compression)?;
        check_centroids(&centroids)?;
        digest.install(centroids, None);
        Ok(digest)
    }

    /// Replaces the centroid store with the compression of `centroids`.
    ///
    /// `bounds` carries the exact min and max; without it they are taken from the centroids.
    pub(crate) fn install(&mut self, centroids: Vec<Centroid>, bounds: Option<(f64, f64)>) {
        self.centroids = compress_centroids(
            centroids,
            &[],
            self.config.compression,
            &self.config.scale,
        );
        self.centroid_weight = self.centroids.iter().map(|c| c.weight).sum();
        self.settled = true;
        let (min, max) = bounds.unwrap_or_else(|| {
            match (self.centroids.first(), self.centroids.last()) {
                (Some(first), Some(last)) => (first.mean, last.mean),
                _ => (f64::INFINITY, f64::NEG_INFINITY),
            }
        });
        self.min = min;
        self.max = max;
    }

    /// Adds a value.
    ///
    /// Fails with [`Error::InvalidValue`] for NaN or infinite values; the digest is left
    /// unchanged. When the buffer reaches its capacity it is folded into the centroids at the
    /// working resolution.
    pub fn add(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::InvalidValue {
                context: "added value",
            });
        }
        self.buffer.push(value);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if self.buffer.len() >= self.config.buffer_capacity {
            self.fold(self.config.compression * WORKING_FACTOR);
            self.settled = false;
        }
        Ok(())
    }

    /// Adds every value in order, stopping at the first invalid one.
    ///
    /// Values before the invalid one stay added.
    pub fn add_all<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
    {
        values.into_iter().try_for_each(|value| self.add(value))
    }

    /// Folds the buffer into the centroid store at the configured compression.
    ///
    /// Afterwards the store holds at most `compression + 2` centroids. Calling it again without
    /// adding values does nothing.
    pub fn compress(&mut self) {
        if self.buffer.is_empty() && self.settled {
            return;
        }
        self.fold(self.config.compression);
        self.settled = true;
    }

    fn fold(&mut self, compression: f64) {
        let centroids = std::mem::take(&mut self.centroids);
        self.centroids =
            compress_centroids(centroids, &self.buffer, compression, &self.config.scale);
        self.centroid_weight += self.buffer.len() as f64;
        self.buffer.clear();
    }

    /// Centroids covering every added value at the configured compression, compressing a
    /// temporary copy unless the digest is settled.
    fn view(&self) -> Cow<'_, [Centroid]> {
        if self.buffer.is_empty() && self.settled {
            Cow::Borrowed(&self.centroids)
        } else {
            Cow::Owned(compress_centroids(
                self.centroids.clone(),
                &self.buffer,
                self.config.compression,
                &self.config.scale,
            ))
        }
    }

    fn non_empty_view(&self) -> Result<Cow<'_, [Centroid]>> {
        if self.is_empty() {
            return Err(Error::EmptyDigest);
        }
        Ok(self.view())
    }

    /// Estimates the value at cumulative probability `q`.
    ///
    /// `q` is clamped to `[0, 1]`; `q = 0` and `q = 1` return the first and last centroid
    /// means. Fails with [`Error::EmptyDigest`] if nothing was added, and with
    /// [`Error::InvalidValue`] if `q` is NaN.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quantile_digest::TDigest;
    ///
    /// let digest = TDigest::from_values((1..=10).map(f64::from), 20.0).unwrap();
    /// assert_eq!(digest.quantile(0.0).unwrap(), 1.0);
    /// assert_eq!(digest.quantile(0.5).unwrap(), 5.5);
    /// assert_eq!(digest.quantile(1.0).unwrap(), 10.0);
    /// ```
    pub fn quantile(&self, q: f64) -> Result<f64> {
        if q.is_nan() {
            return Err(Error::InvalidValue {
                context: "quantile",
            });
        }
        let centroids = self.non_empty_view()?;
        Ok(query::quantile(&centroids, self.total_weight(), q))
    }

    /// Estimates several quantiles, compressing at most once.
    pub fn quantiles(&self, qs: &[f64]) -> Result<Vec<f64>> {
        if qs.iter().any(|q| q.is_nan()) {
            return Err(Error::InvalidValue {
                context: "quantile",
            });
        }
        let centroids = self.non_empty_view()?;
        let total_weight = self.total_weight();
        Ok(qs
            .iter()
            .map(|&q| query::quantile(&centroids, total_weight, q))
            .collect())
    }

    /// Estimates the median.
    pub fn median(&self) -> Result<f64> {
        self.quantile(0.5)
    }

    /// Estimates the fraction of values at or below `x`, in `[0, 1]`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quantile_digest::TDigest;
    ///
    /// let digest = TDigest::from_values((0..=100).map(f64::from), 100.0).unwrap();
    /// assert!((digest.rank(50.0).unwrap() - 0.5).abs() < 0.01);
    /// assert_eq!(digest.rank(-1.0).unwrap(), 0.0);
    /// assert_eq!(digest.rank(101.0).unwrap(), 1.0);
    /// ```
    pub fn rank(&self, x: f64) -> Result<f64> {
        if x.is_nan() {
            return Err(Error::InvalidValue { context: "rank" });
        }
        let centroids = self.non_empty_view()?;
        Ok(query::rank(&centroids, self.total_weight(), x))
    }

    /// Estimates the mean of the values between cumulative probabilities `lo` and `hi`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quantile_digest::TDigest;
    ///
    /// let mut values = (1..=99).map(f64::from).collect::<Vec<_>>();
    /// values.push(1_000_000.0);
    /// let digest = TDigest::from_values(values, 100.0).unwrap();
    ///
    /// let trimmed = digest.trimmed_mean(0.0, 0.99).unwrap();
    /// assert!((trimmed - 50.0).abs() < 1.0);
    /// ```
    pub fn trimmed_mean(&self, lo: f64, hi: f64) -> Result<f64> {
        if lo.is_nan() || hi.is_nan() {
            return Err(Error::InvalidValue {
                context: "trimmed mean bound",
            });
        }
        let centroids = self.non_empty_view()?;
        Ok(query::trimmed_mean(
            &centroids,
            self.total_weight(),
            lo.min(hi),
            lo.max(hi),
        ))
    }

    /// Combines two digests into a new one covering the union of their values.
    ///
    /// Neither operand is modified. The result uses the larger compression and buffer capacity
    /// of the two. Fails with [`Error::IncompatibleDigest`] if the scale families differ.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quantile_digest::TDigest;
    ///
    /// let low = TDigest::from_values((1..=5).map(f64::from), 20.0).unwrap();
    /// let high = TDigest::from_values((6..=10).map(f64::from), 20.0).unwrap();
    ///
    /// let merged = low.merge(&high).unwrap();
    /// assert_eq!(merged.total_weight(), 10.0);
    /// assert_eq!(merged.quantile(0.5).unwrap(), 5.5);
    /// ```
    pub fn merge(&self, other: &TDigest) -> Result<TDigest> {
        if self.config.scale != other.config.scale {
            return Err(Error::IncompatibleDigest {
                reason: format!(
                    "scale family {:?} cannot merge with {:?}",
                    self.config.scale, other.config.scale
                ),
            });
        }

        let config = Config {
            compression: self.config.compression.max(other.config.compression),
            buffer_capacity: self.config.buffer_capacity.max(other.config.buffer_capacity),
            scale: self.config.scale,
        };
        debug!(
            compression = config.compression,
            left_weight = self.total_weight(),
            right_weight = other.total_weight(),
            "merging digests"
        );

        let mut centroids = Vec::with_capacity(
            self.centroids.len() + self.buffer.len() + other.centroids.len() + other.buffer.len(),
        );
        centroids.extend_from_slice(&self.centroids);
        centroids.extend_from_slice(&other.centroids);
        centroids.extend(
            self.buffer
                .iter()
                .chain(other.buffer.iter())
                .copied()
                .map(Centroid::unit),
        );

        let mut merged = Self::empty(config);
        merged.install(
            centroids,
            Some((self.min.min(other.min), self.max.max(other.max))),
        );
        Ok(merged)
    }

    /// Merges `other` into this digest. On error this digest is left unchanged.
    pub fn merge_from(&mut self, other: &TDigest) -> Result<()> {
        *self = self.merge(other)?;
        Ok(())
    }

    /// Merges many digests by pairwise tree reduction.
    ///
    /// Returns `Ok(None)` when `digests` is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quantile_digest::TDigest;
    ///
    /// let shards = (0..8)
    ///     .map(|shard| {
    ///         let values = (0..1000).map(move |i| (shard * 1000 + i) as f64);
    ///         TDigest::from_values(values, 100.0).unwrap()
    ///     })
    ///     .collect::<Vec<_>>();
    ///
    /// let merged = TDigest::merge_all(shards).unwrap().unwrap();
    /// assert_eq!(merged.total_weight(), 8000.0);
    /// ```
    pub fn merge_all<I>(digests: I) -> Result<Option<TDigest>>
    where
        I: IntoIterator<Item = TDigest>,
    {
        let mut level = digests.into_iter().collect::<Vec<_>>();
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut pairs = level.into_iter();
            while let Some(left) = pairs.next() {
                match pairs.next() {
                    Some(right) => next.push(left.merge(&right)?),
                    None => next.push(left),
                }
            }
            level = next;
        }
        Ok(level.pop())
    }

    /// Removes every value, keeping the configuration.
    pub fn clear(&mut self) {
        self.centroids.clear();
        self.buffer.clear();
        self.settled = true;
        self.centroid_weight = 0.0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    /// The centroid store, sorted by mean.
    ///
    /// Values still in the buffer are not included, and folds triggered by a full buffer keep
    /// the store at a finer working resolution. Call [`TDigest::compress`] first to see every
    /// value at the configured compression.
    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    /// Number of values waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Sum of centroid weights plus the number of buffered values.
    pub fn total_weight(&self) -> f64 {
        self.centroid_weight + self.buffer.len() as f64
    }

    /// Number of values observed.
    pub fn count(&self) -> u64 {
        self.total_weight() as u64
    }

    /// Whether no value has been observed.
    pub fn is_empty(&self) -> bool {
        self.total_weight() == 0.0
    }

    /// Smallest value observed.
    pub fn min(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.min)
    }

    /// Largest value observed.
    pub fn max(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.max)
    }

    /// Sum of the values observed.
    pub fn sum(&self) -> f64 {
        self.centroids.iter().map(Centroid::sum).sum::<f64>() + self.buffer.iter().sum::<f64>()
    }

    /// Mean of the values observed.
    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.sum() / self.total_weight())
    }

    /// The compression parameter.
    pub fn compression(&self) -> f64 {
        self.config.compression
    }

    /// The buffer capacity.
    pub fn buffer_capacity(&self) -> usize {
        self.config.buffer_capacity
    }

    /// The scale function.
    pub fn scale(&self) -> ScaleFamily {
        self.config.scale
    }

    /// The full configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Centroids covering every value, for encoding.
    pub(crate) fn snapshot(&self) -> Cow<'_, [Centroid]> {
        self.view()
    }

    /// Raw min/max, infinite when empty.
    pub(crate) fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Checks the invariants every received centroid must hold.
pub(crate) fn check_centroids(centroids: &[Centroid]) -> Result<()> {
    for (index, centroid) in centroids.iter().enumerate() {
        if let Some(what) = centroid.check() {
            return Err(Error::IncompatibleDigest {
                reason: format!("{what} (centroid {index})"),
            });
        }
    }
    Ok(())
}

/// Checks received min/max against the centroids they travel with.
///
/// Returns `None` when there are no centroids, since the bounds of an empty digest are
/// meaningless.
pub(crate) fn check_bounds(
    centroids: &[Centroid],
    min: f64,
    max: f64,
) -> Result<Option<(f64, f64)>> {
    if centroids.is_empty() {
        return Ok(None);
    }
    let lowest = centroids.iter().map(|c| c.mean).fold(f64::INFINITY, f64::min);
    let highest = centroids.iter().map(|c| c.mean).fold(f64::NEG_INFINITY, f64::max);
    if !(min.is_finite() && max.is_finite() && min <= lowest && max >= highest) {
        return Err(Error::IncompatibleDigest {
            reason: format!("min {min} and max {max} do not bracket the centroids"),
        });
    }
    Ok(Some((min, max)))
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::Deserialize;
    use serde::Serialize;

    use super::*;

    /// Serialized form: configuration, exact bounds and the compressed centroids.
    #[derive(Serialize, Deserialize)]
    struct DigestRepr {
        config: Config,
        min: f64,
        max: f64,
        centroids: Vec<Centroid>,
    }

    impl DigestRepr {
        fn of(digest: &TDigest) -> Self {
            let (min, max) = digest.bounds();
            Self {
                config: digest.config,
                min,
                max,
                centroids: digest.snapshot().into_owned(),
            }
        }

        fn into_digest(self) -> Result<TDigest> {
            let mut digest = TDigest::from_config(self.config)?;
            check_centroids(&self.centroids)?;
            let bounds = check_bounds(&self.centroids, self.min, self.max)?;
            digest.install(self.centroids, bounds);
            Ok(digest)
        }
    }

    impl Serialize for TDigest {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            DigestRepr::of(self).serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for TDigest {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let repr = DigestRepr::deserialize(deserializer)?;
            repr.into_digest().map_err(serde::de::Error::custom)
        }
    }
}
