// Versioned binary form of a digest, used to ship digests between nodes.
//
// Layout (little-endian):
//
//   header (48 bytes):
//     0..4   : magic = b"QDIG"
//     4      : version
//     5      : scale code
//     6..8   : reserved, zero
//     8..16  : compression     (f64)
//    16..24  : buffer capacity (u64)
//    24..32  : min             (f64, +inf when empty)
//    32..40  : max             (f64, -inf when empty)
//    40..48  : centroid count  (u64)
//
//   payload:
//     centroid count × (mean f64, weight f64), sorted by mean

use tracing::debug;

use crate::centroid::Centroid;
use crate::digest::Config;
use crate::digest::TDigest;
use crate::error::Error;
use crate::error::Result;
use crate::error::WireError;
use crate::scale::ScaleFamily;

const MAGIC: &[u8; 4] = b"QDIG";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 48;
const CENTROID_LEN: usize = 16;

impl TDigest {
    /// Encodes the digest, including buffered values, into the binary wire form.
    ///
    /// The digest itself is not modified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quantile_digest::TDigest;
    ///
    /// let digest = TDigest::from_values((1..=100).map(f64::from), 50.0).unwrap();
    /// let bytes = digest.serialize();
    /// let decoded = TDigest::deserialize(&bytes).unwrap();
    ///
    /// assert_eq!(decoded.quantile(0.9).unwrap(), digest.quantile(0.9).unwrap());
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let centroids = self.snapshot();
        let config = self.config();
        let (min, max) = self.bounds();

        let mut buf = Vec::with_capacity(HEADER_LEN + CENTROID_LEN * centroids.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.push(config.scale.code());
        buf.extend_from_slice(&[0, 0]);
        write_f64(&mut buf, config.compression);
        write_u64(&mut buf, config.buffer_capacity as u64);
        write_f64(&mut buf, min);
        write_f64(&mut buf, max);
        write_u64(&mut buf, centroids.len() as u64);
        debug_assert_eq!(buf.len(), HEADER_LEN);

        for c in centroids.iter() {
            write_f64(&mut buf, c.mean);
            write_f64(&mut buf, c.weight);
        }

        buf
    }

    /// Decodes a digest from its binary wire form.
    ///
    /// Fails with [`Error::Wire`] if the bytes are not a framed digest of a known version, and
    /// with [`Error::IncompatibleDigest`] if the centroids break the digest invariants.
    pub fn deserialize(bytes: &[u8]) -> Result<TDigest> {
        if bytes.len() < HEADER_LEN {
            return Err(WireError::Truncated.into());
        }
        if &bytes[0..4] != MAGIC {
            return Err(WireError::InvalidMagic.into());
        }
        let version = bytes[4];
        if version != VERSION {
            return Err(WireError::UnsupportedVersion(version).into());
        }
        let scale = ScaleFamily::from_code(bytes[5]).ok_or(WireError::InvalidScale(bytes[5]))?;

        let mut offset = 8;
        let compression = read_f64(bytes, &mut offset);
        let buffer_capacity = read_u64(bytes, &mut offset);
        let min = read_f64(bytes, &mut offset);
        let max = read_f64(bytes, &mut offset);
        let count = read_u64(bytes, &mut offset);

        let found = bytes.len() - HEADER_LEN;
        let expected = usize::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(CENTROID_LEN))
            .ok_or(WireError::LengthMismatch {
                expected: usize::MAX,
                found,
            })?;
        if expected != found {
            return Err(WireError::LengthMismatch { expected, found }.into());
        }

        let config = Config {
            compression,
            buffer_capacity: usize::try_from(buffer_capacity).unwrap_or(usize::MAX),
            scale,
        };
        let mut digest = TDigest::from_config(config).map_err(|_| Error::IncompatibleDigest {
            reason: format!(
                "invalid configuration (compression {compression}, buffer capacity {buffer_capacity})"
            ),
        })?;

        let mut centroids = Vec::with_capacity(found / CENTROID_LEN);
        while offset < bytes.len() {
            let mean = read_f64(bytes, &mut offset);
            let weight = read_f64(bytes, &mut offset);
            centroids.push(Centroid::new(mean, weight));
        }
        crate::digest::check_centroids(&centroids)?;
        if centroids.windows(2).any(|w| w[0].mean > w[1].mean) {
            return Err(Error::IncompatibleDigest {
                reason: "centroids are not sorted by mean".to_string(),
            });
        }
        let bounds = crate::digest::check_bounds(&centroids, min, max)?;

        debug!(
            centroids = centroids.len(),
            compression, "decoded digest"
        );
        digest.install(centroids, bounds);
        Ok(digest)
    }
}

#[inline]
fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

#[inline]
fn write_f64(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

// Callers have already checked the length, so the slice is always eight bytes.
#[inline]
fn read_array(bytes: &[u8], offset: &mut usize) -> [u8; 8] {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&bytes[*offset..*offset + 8]);
    *offset += 8;
    arr
}

#[inline]
fn read_u64(bytes: &[u8], offset: &mut usize) -> u64 {
    u64::from_le_bytes(read_array(bytes, offset))
}

#[inline]
fn read_f64(bytes: &[u8], offset: &mut usize) -> f64 {
    f64::from_le_bytes(read_array(bytes, offset))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> TDigest {
        let mut digest = TDigest::builder()
            .compression(50.0)
            .buffer_capacity(300)
            .scale(ScaleFamily::Quadratic)
            .build()
            .unwrap();
        digest
            .add_all((0..2000).map(|i| ((i * 7919) % 2000) as f64))
            .unwrap();
        digest
    }

    #[test]
    fn test_roundtrip() {
        let mut digest = sample();
        let bytes = digest.serialize();
        let decoded = TDigest::deserialize(&bytes).unwrap();

        digest.compress();
        assert_eq!(decoded, digest);
        assert_eq!(decoded.scale(), ScaleFamily::Quadratic);
        assert_eq!(decoded.buffer_capacity(), 300);
        assert_eq!(decoded.min(), Some(0.0));
        assert_eq!(decoded.max(), Some(1999.0));
    }

    #[test]
    fn test_serialize_includes_buffer() {
        let mut digest = TDigest::new(100.0, 1000).unwrap();
        digest.add_all([3.0, 1.0, 2.0]).unwrap();
        let bytes = digest.serialize();

        assert_eq!(digest.buffered(), 3);
        assert_eq!(bytes.len(), HEADER_LEN + 3 * CENTROID_LEN);
        let decoded = TDigest::deserialize(&bytes).unwrap();
        assert_eq!(decoded.total_weight(), 3.0);
        assert_eq!(decoded.median().unwrap(), 2.0);
    }

    #[test]
    fn test_empty_roundtrip() {
        let digest = TDigest::new(10.0, 10).unwrap();
        let bytes = digest.serialize();
        assert_eq!(bytes.len(), HEADER_LEN);
        let decoded = TDigest::deserialize(&bytes).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded, digest);
    }

    #[test]
    fn test_framing_errors() {
        let bytes = sample().serialize();

        assert_eq!(
            TDigest::deserialize(&bytes[..10]),
            Err(Error::Wire(WireError::Truncated))
        );

        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert_eq!(
            TDigest::deserialize(&bad),
            Err(Error::Wire(WireError::InvalidMagic))
        );

        let mut bad = bytes.clone();
        bad[4] = 2;
        assert_eq!(
            TDigest::deserialize(&bad),
            Err(Error::Wire(WireError::UnsupportedVersion(2)))
        );

        let mut bad = bytes.clone();
        bad[5] = 9;
        assert_eq!(
            TDigest::deserialize(&bad),
            Err(Error::Wire(WireError::InvalidScale(9)))
        );

        let bad = &bytes[..bytes.len() - 1];
        assert!(matches!(
            TDigest::deserialize(bad),
            Err(Error::Wire(WireError::LengthMismatch { .. }))
        ));
    }

    fn with_centroids(centroids: &[(f64, f64)]) -> Vec<u8> {
        let mut bytes = TDigest::new(10.0, 10).unwrap().serialize();
        bytes[24..32].copy_from_slice(&(-1e9f64).to_le_bytes());
        bytes[32..40].copy_from_slice(&1e9f64.to_le_bytes());
        bytes[40..48].copy_from_slice(&(centroids.len() as u64).to_le_bytes());
        for &(mean, weight) in centroids {
            bytes.extend_from_slice(&mean.to_le_bytes());
            bytes.extend_from_slice(&weight.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_invariant_errors() {
        let ok = with_centroids(&[(1.0, 1.0), (2.0, 3.0)]);
        assert_eq!(TDigest::deserialize(&ok).unwrap().total_weight(), 4.0);

        for centroids in [
            vec![(1.0, 1.0), (f64::NAN, 1.0)],
            vec![(1.0, 0.0)],
            vec![(1.0, -2.0)],
            vec![(2.0, 1.0), (1.0, 1.0)],
        ] {
            let bytes = with_centroids(&centroids);
            assert!(
                matches!(
                    TDigest::deserialize(&bytes),
                    Err(Error::IncompatibleDigest { .. })
                ),
                "centroids={:?}",
                centroids
            );
        }

        let mut bytes = with_centroids(&[(1.0, 1.0)]);
        bytes[8..16].copy_from_slice(&(-5.0f64).to_le_bytes());
        assert!(matches!(
            TDigest::deserialize(&bytes),
            Err(Error::IncompatibleDigest { .. })
        ));

        let mut bytes = with_centroids(&[(1.0, 1.0)]);
        bytes[24..32].copy_from_slice(&5.0f64.to_le_bytes());
        assert!(matches!(
            TDigest::deserialize(&bytes),
            Err(Error::IncompatibleDigest { .. })
        ));
    }

    #[test]
    fn test_bounds_must_be_finite() {
        for (range, bound) in [
            (24..32, f64::NEG_INFINITY),
            (32..40, f64::INFINITY),
            (24..32, f64::NAN),
        ] {
            let mut bytes = with_centroids(&[(1.0, 1.0), (2.0, 3.0)]);
            bytes[range.clone()].copy_from_slice(&bound.to_le_bytes());
            assert!(
                matches!(
                    TDigest::deserialize(&bytes),
                    Err(Error::IncompatibleDigest { .. })
                ),
                "range={:?} bound={}",
                range,
                bound
            );
        }
    }
}
