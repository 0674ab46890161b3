use rand::Rng;

/// Uniform pick over `candidates`. `None` only for an empty slice.
pub fn pick<'a, T, R: Rng>(rng: &mut R, candidates: &'a [T]) -> Option<&'a T> {
    if candidates.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..candidates.len());
    candidates.get(idx)
}

/// True when every candidate equals the first one (including a single candidate).
pub fn is_single_choice<T: PartialEq>(candidates: &[T]) -> bool {
    match candidates.split_first() {
        Some((first, rest)) => rest.iter().all(|c| c == first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };

    #[test]
    fn pick__returns_none_for_empty_candidates() {
        let mut rng = StdRng::seed_from_u64(1);
        let empty: [u8; 0] = [];

        assert_eq!(pick(&mut rng, &empty), None);
    }

    #[test]
    fn pick__is_roughly_uniform() {
        // given
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = ["a", "b", "c", "d"];
        let mut counts = [0usize; 4];

        // when
        for _ in 0..10_000 {
            let chosen = pick(&mut rng, &candidates).unwrap();
            let idx = candidates.iter().position(|c| c == chosen).unwrap();
            counts[idx] += 1;
        }

        // then
        for count in counts {
            assert!((2_200..=2_800).contains(&count), "skewed counts: {counts:?}");
        }
    }

    #[test]
    fn pick__same_seed_gives_same_sequence() {
        let candidates: Vec<u32> = (0..50).collect();
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);

        let left: Vec<_> = (0..20).map(|_| *pick(&mut a, &candidates).unwrap()).collect();
        let right: Vec<_> = (0..20).map(|_| *pick(&mut b, &candidates).unwrap()).collect();

        assert_eq!(left, right);
    }

    #[test]
    fn is_single_choice__detects_one_distinct_item() {
        assert!(is_single_choice(&["x"]));
        assert!(is_single_choice(&["x", "x", "x"]));
        assert!(!is_single_choice(&["x", "y"]));
        assert!(!is_single_choice::<&str>(&[]));
    }
}
