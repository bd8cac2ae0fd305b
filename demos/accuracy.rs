use quantile_digest::naive_quantile;
use quantile_digest::ScaleFamily;
use quantile_digest::TDigest;
use rand::distributions::Distribution;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() {
    // Simulate data points (e.g., latencies, measurements)
    let mut rng = StdRng::seed_from_u64(42);
    let uniform = Uniform::new(0.0, 100.0);
    let values: Vec<f64> = (0..100000).map(|_| uniform.sample(&mut rng)).collect();

    for scale in [
        ScaleFamily::Linear,
        ScaleFamily::ArcSine,
        ScaleFamily::Quadratic,
        ScaleFamily::Logit,
    ] {
        let mut digest = TDigest::builder()
            .compression(50.0)
            .scale(scale)
            .build()
            .unwrap();
        digest.add_all(values.iter().copied()).unwrap();
        digest.compress();

        let mut tail_error = 0.0f64;
        let mut body_error = 0.0f64;
        for p in (0..=1000).map(|i| i as f64 / 1000.0) {
            let error = (digest.quantile(p).unwrap() - naive_quantile(&values, p)).abs();
            if !(0.01..=0.99).contains(&p) {
                tail_error = tail_error.max(error);
            } else {
                body_error = body_error.max(error);
            }
        }

        println!(
            "{:?}: centroids: {}, max tail error: {:.4}, max body error: {:.4}",
            scale,
            digest.centroids().len(),
            tail_error,
            body_error
        );
    }
}
