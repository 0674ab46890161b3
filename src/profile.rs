//! Speed profile of a spin and its numeric integration.
//!
//! A spin cruises at [`FAST_CARDS_PER_SEC`] and, once the deceleration window
//! opens, glides down to [`SLOW_CARDS_PER_SEC`] along a smoothstep curve. The
//! integrals of that curve size the tape and map elapsed time to distance.

use std::{
    fmt,
    time::Duration,
};

pub const FAST_CARDS_PER_SEC: f64 = 5.0;
pub const SLOW_CARDS_PER_SEC: f64 = 1.0;

pub const PRIZE_SPIN_DURATION: Duration = Duration::from_millis(20_000);
pub const PLAYER_SPIN_DURATION: Duration = Duration::from_millis(10_000);

/// Sub-intervals used when sizing the tape.
pub const TOTAL_STEPS: usize = 400;
/// Sub-intervals for the per-frame numerator and denominator of F(t).
pub const FRAME_NUMERATOR_STEPS: usize = 60;
pub const FRAME_DENOMINATOR_STEPS: usize = 160;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SpinKind {
    Prize,
    Player,
}

impl SpinKind {
    pub fn duration(self) -> Duration {
        match self {
            SpinKind::Prize => PRIZE_SPIN_DURATION,
            SpinKind::Player => PLAYER_SPIN_DURATION,
        }
    }

    /// Fraction of the spin after which deceleration begins.
    pub fn slow_down_start(self) -> f64 {
        match self {
            SpinKind::Prize => 15.0 / 20.0,
            SpinKind::Player => 5.0 / 10.0,
        }
    }
}

impl fmt::Display for SpinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinKind::Prize => f.write_str("prize"),
            SpinKind::Player => f.write_str("player"),
        }
    }
}

pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Exact at both ends: `lerp(a, b, 0) == a` and `lerp(a, b, 1) == b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

pub fn smoothstep(t: f64) -> f64 {
    let t = clamp01(t);
    t * t * (3.0 - 2.0 * t)
}

/// Instantaneous speed in cards per second at `t01` of the spin.
pub fn speed(kind: SpinKind, t01: f64) -> f64 {
    let slow_start = kind.slow_down_start();
    if t01 <= slow_start {
        return FAST_CARDS_PER_SEC;
    }
    let u = (t01 - slow_start) / (1.0 - slow_start);
    lerp(FAST_CARDS_PER_SEC, SLOW_CARDS_PER_SEC, smoothstep(u))
}

/// Trapezoidal integral of [`speed`] over normalized time `[0, upto]`.
fn integrate(kind: SpinKind, upto: f64, steps: usize) -> f64 {
    let steps = steps.max(1);
    let h = upto / steps as f64;
    (0..steps)
        .map(|i| {
            let a = i as f64 * h;
            let b = (i + 1) as f64 * h;
            (speed(kind, a) + speed(kind, b)) / 2.0 * h
        })
        .sum()
}

/// Cards traversed over a whole spin of `duration`.
pub fn total_cards_to_pass(kind: SpinKind, duration: Duration) -> f64 {
    integrate(kind, 1.0, TOTAL_STEPS) * duration.as_secs_f64()
}

/// Normalized distance covered at `t01`: 0 at the start, 1 at the end.
///
/// Both integrals are recomputed on every call at frame resolution.
pub fn progress_fraction(kind: SpinKind, t01: f64) -> f64 {
    let t01 = clamp01(t01);
    if t01 >= 1.0 {
        return 1.0;
    }
    let total = integrate(kind, 1.0, FRAME_DENOMINATOR_STEPS);
    if total <= 0.0 {
        return t01;
    }
    clamp01(integrate(kind, t01, FRAME_NUMERATOR_STEPS) / total)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn speed__cruises_fast_until_slow_down_window() {
        assert_eq!(speed(SpinKind::Prize, 0.0), FAST_CARDS_PER_SEC);
        assert_eq!(speed(SpinKind::Prize, 0.75), FAST_CARDS_PER_SEC);
        assert_eq!(speed(SpinKind::Player, 0.5), FAST_CARDS_PER_SEC);
        assert!(speed(SpinKind::Player, 0.6) < FAST_CARDS_PER_SEC);
        assert_eq!(speed(SpinKind::Prize, 0.6), FAST_CARDS_PER_SEC);
    }

    #[test]
    fn speed__ends_at_slow_speed() {
        assert!((speed(SpinKind::Prize, 1.0) - SLOW_CARDS_PER_SEC).abs() < EPS);
        assert!((speed(SpinKind::Player, 1.0) - SLOW_CARDS_PER_SEC).abs() < EPS);
    }

    #[test]
    fn speed__midpoint_of_window_is_halfway() {
        // smoothstep(0.5) == 0.5
        let v = speed(SpinKind::Player, 0.75);

        assert!((v - 3.0).abs() < EPS);
    }

    #[test]
    fn smoothstep__clamps_input() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(2.0), 1.0);
        assert_eq!(smoothstep(0.5), 0.5);
    }

    #[test]
    fn total_cards_to_pass__matches_closed_form() {
        // prize: 0.75 * 5 + 0.25 * 3 = 4.5 cards per normalized second
        let prize = total_cards_to_pass(SpinKind::Prize, PRIZE_SPIN_DURATION);
        // player: 0.5 * 5 + 0.5 * 3 = 4.0
        let player = total_cards_to_pass(SpinKind::Player, PLAYER_SPIN_DURATION);

        assert!((prize - 90.0).abs() < 1e-6, "prize {prize}");
        assert!((player - 40.0).abs() < 1e-6, "player {player}");
    }

    #[test]
    fn total_cards_to_pass__prize_spin_travels_further_than_player_spin() {
        let prize = total_cards_to_pass(SpinKind::Prize, SpinKind::Prize.duration());
        let player = total_cards_to_pass(SpinKind::Player, SpinKind::Player.duration());

        assert!(prize > player);
    }

    #[test]
    fn total_cards_to_pass__is_zero_for_zero_duration() {
        assert_eq!(total_cards_to_pass(SpinKind::Prize, Duration::ZERO), 0.0);
    }

    #[test]
    fn progress_fraction__pins_endpoints() {
        for kind in [SpinKind::Prize, SpinKind::Player] {
            assert_eq!(progress_fraction(kind, 0.0), 0.0);
            assert_eq!(progress_fraction(kind, 1.0), 1.0);
            assert_eq!(progress_fraction(kind, 1.5), 1.0);
            assert_eq!(progress_fraction(kind, -0.5), 0.0);
        }
    }

    #[test]
    fn progress_fraction__is_linear_during_cruise() {
        // F(t) = 5t / 4.5 while cruising
        let f = progress_fraction(SpinKind::Prize, 0.45);

        assert!((f - 0.5).abs() < 1e-6, "F = {f}");
    }
}
