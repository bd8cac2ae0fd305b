/// Represents a cluster of absorbed values by its mean and weight.
///
/// # Examples
///
/// ```rust
/// use quantile_digest::Centroid;
///
/// let centroid = Centroid::new(10.0, 5.0);
/// assert_eq!(centroid.mean, 10.0);
/// assert_eq!(centroid.weight, 5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Centroid {
    /// The weighted average of the absorbed values.
    pub mean: f64,
    /// The number of absorbed values. Never below one in a valid digest.
    pub weight: f64,
}

impl Centroid {
    /// Creates a new centroid with the given mean and weight.
    pub fn new(mean: f64, weight: f64) -> Self {
        Self { mean, weight }
    }

    /// Creates a centroid standing for one raw value.
    pub fn unit(value: f64) -> Self {
        Self::new(value, 1.0)
    }

    /// Absorbs another centroid, updating the mean and weight.
    ///
    /// The resulting mean always lies between the two input means, so absorbing the next
    /// centroid of a sorted sequence keeps the sequence sorted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quantile_digest::Centroid;
    ///
    /// let mut c1 = Centroid::new(10.0, 2.0);
    /// let c2 = Centroid::new(20.0, 3.0);
    /// c1.add(&c2);
    /// assert_eq!(c1.mean, 16.0);
    /// assert_eq!(c1.weight, 5.0);
    /// ```
    pub fn add(&mut self, other: &Centroid) {
        debug_assert!(other.weight > 0.0);
        if self.weight == 0.0 {
            *self = *other;
            return;
        }
        let total_weight = self.weight + other.weight;
        let (lo, hi) = if self.mean <= other.mean {
            (self.mean, other.mean)
        } else {
            (other.mean, self.mean)
        };
        self.mean += other.weight * (other.mean - self.mean) / total_weight;
        // rounding (or overflow of the difference) must not push the mean out of range
        self.mean = self.mean.clamp(lo, hi);
        self.weight = total_weight;
    }

    /// Sum of the absorbed values.
    pub(crate) fn sum(&self) -> f64 {
        self.mean * self.weight
    }

    /// Returns a description of the first broken invariant, if any.
    pub(crate) fn check(&self) -> Option<&'static str> {
        if !self.mean.is_finite() {
            Some("centroid mean is not finite")
        } else if !self.weight.is_finite() || self.weight < 1.0 {
            Some("centroid weight is below one or not finite")
        } else {
            None
        }
    }
}
