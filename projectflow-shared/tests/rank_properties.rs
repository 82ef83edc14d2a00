/// Property tests for rank keys
///
/// Builds lanes by random sequences of inserts (append, prepend, insert
/// between neighbors) and checks that every generated key lands strictly
/// where it was asked to.

use projectflow_shared::rank::{between, key_between, middle, next, prev, validate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random lane of `len` keys, kept sorted
fn random_lane(rng: &mut StdRng, len: usize) -> Vec<String> {
    let mut lane = vec![middle()];

    while lane.len() < len {
        let slot = rng.gen_range(0..=lane.len());
        let low = slot.checked_sub(1).map(|i| lane[i].as_str());
        let high = lane.get(slot).map(String::as_str);

        let key = key_between(low, high).unwrap();
        if let Some(low) = low {
            assert!(low < key.as_str(), "{} !< {}", low, key);
        }
        if let Some(high) = high {
            assert!(key.as_str() < high, "{} !< {}", key, high);
        }

        lane.insert(slot, key);
    }

    lane
}

#[test]
fn test_between_random_pairs() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..20 {
        let lane = random_lane(&mut rng, 60);

        for _ in 0..200 {
            let i = rng.gen_range(0..lane.len() - 1);
            let j = rng.gen_range(i + 1..lane.len());
            let (a, b) = (&lane[i], &lane[j]);

            let k = between(a, b).unwrap();
            assert!(a < &k && &k < b, "between({}, {}) = {}", a, b, k);
            validate(&k).unwrap();
        }
    }
}

#[test]
fn test_generated_lanes_are_valid_and_unique() {
    let mut rng = StdRng::seed_from_u64(42);
    let lane = random_lane(&mut rng, 500);

    for key in &lane {
        validate(key).unwrap();
    }
    assert!(lane.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_repeated_insert_at_same_gap() {
    // Always inserting right after the first key narrows one gap forever
    let mut low = middle();
    let high = next(&low).unwrap();

    for _ in 0..1000 {
        let key = between(&low, &high).unwrap();
        assert!(low < key && key < high);
        low = key;
    }
}

#[test]
fn test_repeated_next_and_prev_are_monotonic() {
    let mut up = middle();
    let mut down = middle();

    for _ in 0..2000 {
        let higher = next(&up).unwrap();
        assert!(higher > up);
        up = higher;

        let lower = prev(&down).unwrap();
        assert!(lower < down);
        down = lower;
    }
}

#[test]
fn test_empty_lane_bootstrap_is_stable() {
    assert_eq!(key_between(None, None).unwrap(), middle());
    assert_eq!(middle(), middle());
    assert!(next(&middle()).unwrap() > middle());
    assert!(prev(&middle()).unwrap() < middle());
}
