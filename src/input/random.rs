use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal, Uniform};

use super::{Candle, CandleSource, CandleSourceBuilder, SourceError};

/// Generates a geometric random walk of candles for every symbol, starting at a price of 100.
///
/// Used for tests and benchmarks. The same seed always produces the same source.
pub fn random_walk(
    symbols: &[&str],
    length: usize,
    start: i64,
    step_secs: i64,
    volatility: f64,
    seed: u64,
) -> Result<CandleSource, SourceError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let range_dist = Uniform::new(0.0, volatility.abs().max(f64::EPSILON));
    let volume_dist = Uniform::new(1.0, 1000.0);

    let mut builder = CandleSourceBuilder::new();
    for symbol in symbols {
        let mut last_close = 100.0_f64;
        let mut series = Vec::with_capacity(length);
        for i in 0..length {
            let shock: f64 = rng.sample(StandardNormal);
            let open = last_close;
            let close = open * (shock * volatility).exp();
            let high = open.max(close) * (1.0 + range_dist.sample(&mut rng));
            let low = open.min(close) * (1.0 - range_dist.sample(&mut rng)).max(0.0);
            series.push(Candle::new(
                start + (i as i64) * step_secs,
                open,
                high,
                low,
                close,
                volume_dist.sample(&mut rng),
            ));
            last_close = close;
        }
        builder.add_series(*symbol, series);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::random_walk;

    #[test]
    fn test_that_random_walk_is_reproducible_from_seed() {
        let first = random_walk(&["ABC", "BCD"], 50, 100, 60, 0.02, 7).unwrap();
        let second = random_walk(&["ABC", "BCD"], 50, 100, 60, 0.02, 7).unwrap();

        assert_eq!(first.series_len("ABC"), 50);
        assert_eq!(first.get_series("BCD"), second.get_series("BCD"));
        assert_eq!(first.clock().len(), 50);
    }
}
