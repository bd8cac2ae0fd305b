use quantile_digest::naive_quantile;
use quantile_digest::naive_rank;
use quantile_digest::TDigest;

fn main() {
    // Simulate data points (e.g., latencies, measurements)
    let values = (0..=10000).map(|i| i as f64 / 100.0).collect::<Vec<f64>>();

    // Create a coarse t-digest so the effect of clustering is visible
    let mut digest = TDigest::with_compression(20.0).unwrap();
    digest.add_all(values.iter().copied()).unwrap();

    // Estimate quantiles
    let p50 = digest.median().unwrap();
    let p75 = digest.quantile(0.75).unwrap();
    let p90 = digest.quantile(0.9).unwrap();
    let p99 = digest.quantile(0.99).unwrap();
    let rank = digest.rank(50.0).unwrap();

    println!("estimated 50th percentile (median): {:.3}", p50);
    println!("estimated 75th percentile: {:.3}", p75);
    println!("estimated 90th percentile: {:.3}", p90);
    println!("estimated 99th percentile: {:.3}", p99);
    println!("estimated rank of 50.0: {:.3}", rank);
    println!(
        "estimated mean of the middle 80%: {:.3}",
        digest.trimmed_mean(0.1, 0.9).unwrap()
    );

    // Compare with naive quantile estimation
    let naive_p50 = naive_quantile(&values, 0.5);
    let naive_p75 = naive_quantile(&values, 0.75);
    let naive_p90 = naive_quantile(&values, 0.9);
    let naive_p99 = naive_quantile(&values, 0.99);
    let naive_rank = naive_rank(&values, 50.0);

    println!("naive 50th percentile (median): {:.3}", naive_p50);
    println!("naive 75th percentile: {:.3}", naive_p75);
    println!("naive 90th percentile: {:.3}", naive_p90);
    println!("naive 99th percentile: {:.3}", naive_p99);
    println!("naive rank of 50.0: {:.3}", naive_rank);

    digest.compress();
    println!("number of centroids: {}", digest.centroids().len());
}
