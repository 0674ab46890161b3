#![allow(non_snake_case)]
use prize_wheel::profile::{
    SpinKind,
    progress_fraction,
    total_cards_to_pass,
};
use proptest::prelude::*;

const KINDS: [SpinKind; 2] = [SpinKind::Prize, SpinKind::Player];

proptest! {
    #[test]
    fn progress_fraction__never_moves_backwards(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        for kind in KINDS {
            prop_assert!(progress_fraction(kind, lo) <= progress_fraction(kind, hi) + 1e-12);
        }
    }

    #[test]
    fn progress_fraction__stays_in_unit_interval(t in -2.0f64..3.0) {
        for kind in KINDS {
            let f = progress_fraction(kind, t);
            prop_assert!((0.0..=1.0).contains(&f));
        }
    }
}

#[test]
fn progress_fraction__pins_both_ends() {
    for kind in KINDS {
        assert_eq!(progress_fraction(kind, 0.0), 0.0);
        assert_eq!(progress_fraction(kind, 1.0), 1.0);
    }
}

#[test]
fn total_cards_to_pass__prize_spin_travels_further() {
    let prize = total_cards_to_pass(SpinKind::Prize, SpinKind::Prize.duration());
    let player = total_cards_to_pass(SpinKind::Player, SpinKind::Player.duration());

    assert!((prize - 90.0).abs() < 1e-6);
    assert!((player - 40.0).abs() < 1e-6);
    assert!(prize > player);
}
