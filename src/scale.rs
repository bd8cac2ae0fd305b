use std::f64::consts::PI;

/// Lower and upper clamp for families whose `k` diverges at the edges.
const EPS: f64 = 1e-15;

/// Maps a cumulative quantile to a position on the `k` scale, and back.
///
/// A cluster may grow while it spans at most one unit of `k`. Steep `k` near `q = 0` and
/// `q = 1` forces small clusters at the tails; a shallow `k` around the median allows large
/// ones.
pub trait ScaleFunction {
    /// Maps `q` in `[0, 1]` to `k` for the given compression.
    fn k(&self, q: f64, compression: f64) -> f64;

    /// Inverse of [`ScaleFunction::k`]. Out-of-range `k` saturates to `0` or `1`.
    fn q(&self, k: f64, compression: f64) -> f64;

    /// Largest cumulative quantile a cluster starting at `q0` may reach.
    fn q_limit(&self, q0: f64, compression: f64) -> f64 {
        let limit = self.q(self.k(q0, compression) + 1.0, compression);
        limit.clamp(q0, 1.0)
    }
}

/// The built-in scale functions.
///
/// # Examples
///
/// ```rust
/// use quantile_digest::{ScaleFamily, ScaleFunction};
///
/// let scale = ScaleFamily::ArcSine;
/// // clusters may be much heavier at the median than at the tails
/// let tail = scale.q_limit(0.0, 100.0);
/// let bulk = scale.q_limit(0.5, 100.0) - 0.5;
/// assert!(bulk > 10.0 * tail);
/// ```
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScaleFamily {
    /// `k = δ·q/2`. Same resolution everywhere.
    Linear,
    /// `k = δ/(2π)·asin(2q − 1)`.
    #[default]
    ArcSine,
    /// Piecewise quadratic: `q = 2r²` below the median, `1 − 2(1 − r)²` above, with `k = δ·r/2`.
    Quadratic,
    /// `k = δ/Z·ln(q/(1 − q))` with `Z = 4·ln(δ) + 24`.
    Logit,
}

impl ScaleFamily {
    /// Code used by the binary wire format.
    pub(crate) fn code(self) -> u8 {
        match self {
            ScaleFamily::Linear => 0,
            ScaleFamily::ArcSine => 1,
            ScaleFamily::Quadratic => 2,
            ScaleFamily::Logit => 3,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ScaleFamily::Linear),
            1 => Some(ScaleFamily::ArcSine),
            2 => Some(ScaleFamily::Quadratic),
            3 => Some(ScaleFamily::Logit),
            _ => None,
        }
    }
}

fn logit_norm(compression: f64) -> f64 {
    4.0 * compression.max(1.0).ln() + 24.0
}

impl ScaleFunction for ScaleFamily {
    fn k(&self, q: f64, compression: f64) -> f64 {
        let q = q.clamp(0.0, 1.0);
        match self {
            ScaleFamily::Linear => compression * q / 2.0,
            ScaleFamily::ArcSine => compression / (2.0 * PI) * (2.0 * q - 1.0).asin(),
            ScaleFamily::Quadratic => {
                let r = if q < 0.5 {
                    (q / 2.0).sqrt()
                } else {
                    1.0 - ((1.0 - q) / 2.0).sqrt()
                };
                compression * r / 2.0
            }
            ScaleFamily::Logit => {
                let q = q.clamp(EPS, 1.0 - EPS);
                compression / logit_norm(compression) * (q / (1.0 - q)).ln()
            }
        }
    }

    fn q(&self, k: f64, compression: f64) -> f64 {
        let q = match self {
            ScaleFamily::Linear => 2.0 * k / compression,
            ScaleFamily::ArcSine => {
                let angle = (2.0 * PI * k / compression).clamp(-PI / 2.0, PI / 2.0);
                (angle.sin() + 1.0) / 2.0
            }
            ScaleFamily::Quadratic => {
                let r = (2.0 * k / compression).clamp(0.0, 1.0);
                if r >= 0.5 {
                    let base = 1.0 - r;
                    1.0 - 2.0 * base * base
                } else {
                    2.0 * r * r
                }
            }
            ScaleFamily::Logit => {
                let x = k * logit_norm(compression) / compression;
                1.0 / (1.0 + (-x).exp())
            }
        };
        q.clamp(0.0, 1.0)
    }
}
