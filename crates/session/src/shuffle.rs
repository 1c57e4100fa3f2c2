use rand::Rng;

/// Returns a uniformly random permutation of `items` (Fisher–Yates),
/// leaving the input untouched.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = rng.gen_range(0..=i);
        shuffled.swap(i, j);
    }
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn output_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let input: Vec<u32> = (0..50).collect();
        let mut output = shuffle(&input, &mut rng);
        assert_eq!(input, (0..50).collect::<Vec<_>>());
        output.sort_unstable();
        assert_eq!(output, input);
    }

    #[test]
    fn empty_and_singleton_are_unchanged() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(shuffle::<u8, _>(&[], &mut rng).is_empty());
        assert_eq!(shuffle(&["only"], &mut rng), vec!["only"]);
    }

    #[test]
    fn positions_are_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let input = [0usize, 1, 2, 3];
        let trials = 40_000;
        let mut counts = [[0u32; 4]; 4];
        for _ in 0..trials {
            for (position, value) in shuffle(&input, &mut rng).into_iter().enumerate() {
                counts[value][position] += 1;
            }
        }
        let expected = trials as f64 / 4.0;
        for row in counts {
            for count in row {
                let deviation = (count as f64 - expected).abs() / expected;
                assert!(deviation < 0.05, "count {count} too far from {expected}");
            }
        }
    }
}
