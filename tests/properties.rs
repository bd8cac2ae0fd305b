use pretty_assertions::assert_eq;
use quickcheck::QuickCheck;
use quickcheck::TestResult;
use quantile_digest::naive_quantile;
use quantile_digest::Error;
use quantile_digest::ScaleFamily;
use quantile_digest::TDigest;
use rand::distributions::Distribution;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn uniform_values(seed: u64, n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let uniform = Uniform::new(0.0, 1000.0);
    (0..n).map(|_| uniform.sample(&mut rng)).collect()
}

fn digest_of(values: &[f64], compression: f64) -> TDigest {
    let mut digest = TDigest::with_compression(compression).unwrap();
    digest.add_all(values.iter().copied()).unwrap();
    digest
}

#[test]
fn test_one_to_ten() {
    let values = (1..=10).map(f64::from).collect::<Vec<_>>();
    let digest = digest_of(&values, 20.0);

    assert_eq!(digest.quantile(0.0).unwrap(), 1.0);
    assert_eq!(digest.quantile(1.0).unwrap(), 10.0);
    assert!((digest.quantile(0.5).unwrap() - 5.5).abs() < 1e-9);

    let low = digest_of(&values[..5], 20.0);
    let high = digest_of(&values[5..], 20.0);
    let merged = low.merge(&high).unwrap();
    assert!((merged.quantile(0.5).unwrap() - 5.5).abs() < 1e-9);
    assert_eq!(merged.quantile(0.0).unwrap(), 1.0);
    assert_eq!(merged.quantile(1.0).unwrap(), 10.0);
}

#[test]
fn test_empty_state_is_an_error() {
    let digest = TDigest::with_compression(100.0).unwrap();
    assert_eq!(digest.quantile(0.5), Err(Error::EmptyDigest));
    assert_eq!(digest.quantile(0.0), Err(Error::EmptyDigest));
    assert_eq!(digest.rank(0.0), Err(Error::EmptyDigest));
}

#[test]
fn test_mass_conservation() {
    for &capacity in &[1, 7, 100, 10_000] {
        let values = uniform_values(capacity as u64, 5000);
        let mut digest = TDigest::new(50.0, capacity).unwrap();
        digest.add_all(values.iter().copied()).unwrap();
        digest.compress();

        assert_eq!(digest.buffered(), 0);
        assert_eq!(digest.total_weight(), 5000.0);
        let centroid_weight: f64 = digest.centroids().iter().map(|c| c.weight).sum();
        assert_eq!(centroid_weight, 5000.0);
    }
}

#[test]
fn test_order_preservation() {
    let mut digest = TDigest::new(30.0, 64).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let uniform = Uniform::new(-1e6, 1e6);
    for _ in 0..20 {
        for _ in 0..64 {
            digest.add(uniform.sample(&mut rng)).unwrap();
        }
        // the buffer just filled up, so compression ran
        assert_eq!(digest.buffered(), 0);
        assert!(digest
            .centroids()
            .windows(2)
            .all(|w| w[0].mean <= w[1].mean));
    }
}

#[test]
fn test_centroid_count_stays_bounded() {
    let values = uniform_values(5, 200_000);
    for &compression in &[20.0, 100.0, 500.0] {
        let mut digest = digest_of(&values, compression);
        digest.compress();
        assert!(
            digest.centroids().len() as f64 <= compression + 2.0,
            "compression={}, centroids={}",
            compression,
            digest.centroids().len()
        );
    }
}

#[test]
fn test_rank_inverts_quantile() {
    let values = uniform_values(21, 50_000);
    let qs = (1..100).map(|i| i as f64 / 100.0).collect::<Vec<_>>();

    let max_error = |compression: f64| {
        let digest = digest_of(&values, compression);
        qs.iter()
            .map(|&q| (digest.rank(digest.quantile(q).unwrap()).unwrap() - q).abs())
            .fold(0.0, f64::max)
    };

    let coarse = max_error(20.0);
    let fine = max_error(200.0);
    assert!(coarse < 0.02, "coarse={}", coarse);
    assert!(fine < 0.005, "fine={}", fine);
    assert!(fine <= coarse, "fine={}, coarse={}", fine, coarse);
}

#[test]
fn test_merge_associativity() {
    // values span [0, 1000), so one percent of the range is 10
    let a = digest_of(&uniform_values(1, 20_000), 100.0);
    let b = digest_of(&uniform_values(2, 30_000), 100.0);
    let c = digest_of(&uniform_values(3, 10_000), 100.0);

    let left = a.merge(&b).unwrap().merge(&c).unwrap();
    let right = a.merge(&b.merge(&c).unwrap()).unwrap();
    assert_eq!(left.total_weight(), right.total_weight());

    for q in [0.001, 0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.99, 0.999] {
        let l = left.quantile(q).unwrap();
        let r = right.quantile(q).unwrap();
        assert!((l - r).abs() <= 10.0, "q={}, left={}, right={}", q, l, r);
    }
    for x in [1.0, 10.0, 100.0, 500.0, 900.0, 990.0, 999.0] {
        let l = left.rank(x).unwrap();
        let r = right.rank(x).unwrap();
        assert!((l - r).abs() <= 0.01, "x={}, left={}, right={}", x, l, r);
    }
}

#[test]
fn test_merge_matches_single_digest() {
    let values = uniform_values(8, 40_000);
    let shards = values
        .chunks(5000)
        .map(|chunk| digest_of(chunk, 100.0))
        .collect::<Vec<_>>();
    let merged = TDigest::merge_all(shards).unwrap().unwrap();
    let single = digest_of(&values, 100.0);

    for q in [0.01, 0.1, 0.5, 0.9, 0.99] {
        let expected = naive_quantile(&values, q);
        for (name, digest) in [("merged", &merged), ("single", &single)] {
            let estimated = digest.quantile(q).unwrap();
            assert!(
                (estimated - expected).abs() <= 10.0,
                "{}: q={}, estimated={}, expected={}",
                name,
                q,
                estimated,
                expected
            );
        }
    }
}

#[test]
fn test_tails_are_more_accurate_than_the_median() {
    // relative error at p01 divides by the p01 value itself, so the data sits away from zero
    let mut rng = StdRng::seed_from_u64(4);
    let uniform = Uniform::new(1000.0, 2000.0);
    let values = (0..100_000)
        .map(|_| uniform.sample(&mut rng))
        .collect::<Vec<_>>();
    let digest = digest_of(&values, 100.0);

    let [low, median, high] = [0.01, 0.5, 0.99].map(|q| {
        let expected = naive_quantile(&values, q);
        (digest.quantile(q).unwrap() - expected).abs() / expected
    });

    assert!(low < median, "p01={}, p50={}", low, median);
    assert!(high < median, "p99={}, p50={}", high, median);
}

#[test]
fn test_every_scale_family_estimates() {
    let values = uniform_values(77, 20_000);
    for scale in [
        ScaleFamily::Linear,
        ScaleFamily::ArcSine,
        ScaleFamily::Quadratic,
        ScaleFamily::Logit,
    ] {
        let mut digest = TDigest::builder()
            .compression(100.0)
            .scale(scale)
            .build()
            .unwrap();
        digest.add_all(values.iter().copied()).unwrap();
        for q in [0.05, 0.5, 0.95] {
            let expected = naive_quantile(&values, q);
            let estimated = digest.quantile(q).unwrap();
            assert!(
                (estimated - expected).abs() <= 10.0,
                "scale={:?}, q={}, estimated={}, expected={}",
                scale,
                q,
                estimated,
                expected
            );
        }
    }
}

#[test]
fn test_wire_roundtrip_then_merge() {
    let a = digest_of(&uniform_values(31, 5000), 100.0);
    let mut b = digest_of(&uniform_values(32, 5000), 100.0);
    b.compress();

    let received = TDigest::deserialize(&b.serialize()).unwrap();
    assert_eq!(received, b);

    let local = a.merge(&b).unwrap();
    let remote = a.merge(&received).unwrap();
    for q in [0.01, 0.5, 0.99] {
        assert_eq!(local.quantile(q).unwrap(), remote.quantile(q).unwrap());
    }
}

#[test]
fn test_merge_conserves_mass() {
    fn inner(left: Vec<f64>, right: Vec<f64>) -> TestResult {
        let left = left.into_iter().filter(|v| v.is_finite()).collect::<Vec<_>>();
        let right = right.into_iter().filter(|v| v.is_finite()).collect::<Vec<_>>();

        let mut a = TDigest::new(10.0, 8).unwrap();
        let mut b = TDigest::new(25.0, 32).unwrap();
        a.add_all(left.iter().copied()).unwrap();
        b.add_all(right.iter().copied()).unwrap();

        let merged = a.merge(&b).unwrap();
        let sorted = merged.centroids().windows(2).all(|w| w[0].mean <= w[1].mean);
        TestResult::from_bool(
            merged.total_weight() == (left.len() + right.len()) as f64
                && merged.compression() == 25.0
                && sorted,
        )
    }
    QuickCheck::new().quickcheck(inner as fn(Vec<f64>, Vec<f64>) -> TestResult);
}
