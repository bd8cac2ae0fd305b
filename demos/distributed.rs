use quantile_digest::naive_quantile;
use quantile_digest::TDigest;
use rand::distributions::Distribution;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

fn main() {
    // Each shard observes its own slice of the traffic
    let shards = (0..16u64)
        .map(|seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let uniform = Uniform::new(0.0, 250.0);
            (0..50_000)
                .map(|_| uniform.sample(&mut rng))
                .collect::<Vec<f64>>()
        })
        .collect::<Vec<_>>();

    // Summarize every shard in parallel and ship the encoded digests
    let encoded = shards
        .par_iter()
        .map(|values| {
            let mut digest = TDigest::with_compression(100.0).unwrap();
            digest.add_all(values.iter().copied()).unwrap();
            digest.serialize()
        })
        .collect::<Vec<_>>();
    let bytes = encoded.iter().map(Vec::len).sum::<usize>();
    println!("encoded {} digests in {} bytes", encoded.len(), bytes);

    // Decode on the aggregator and combine
    let digests = encoded
        .iter()
        .map(|bytes| TDigest::deserialize(bytes))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let merged = TDigest::merge_all(digests).unwrap().unwrap();

    let all = shards.concat();
    for q in [0.5, 0.9, 0.99, 0.999] {
        println!(
            "p{}: estimated: {:.3}, expected: {:.3}",
            q * 100.0,
            merged.quantile(q).unwrap(),
            naive_quantile(&all, q)
        );
    }
    println!("observations: {}", merged.count());
}
