//! Runs one spin from candidate set to settled tape.
//!
//! A spin is split in two: [`SpinEngine::prepare`] guards, draws the final
//! item and builds the tape (nothing is shown yet, so callers may still mutate
//! their state or bail out through [`SpinEngine::abandon`]), and [`SpinEngine::run`] animates and settles.
//! The [`SpinLease`] taken by `prepare` travels inside the [`PreparedSpin`]
//! and is released whenever it is dropped.

use crate::{
    audio::Audio,
    error::{
        Notice,
        Result,
        SpinError,
    },
    model::{
        Prize,
        Rarity,
    },
    motion::{
        SpinAnimation,
        TapeMetrics,
    },
    profile::{
        self,
        SpinKind,
    },
    selector,
    tape::{
        self,
        Tape,
        TapeConfig,
    },
};
use rand::rngs::StdRng;
use std::{
    cell::Cell,
    fmt,
    io,
    rc::Rc,
    time::Duration,
};
use tokio::time::{
    self,
    Instant,
    Interval,
    MissedTickBehavior,
};
use tracing::{
    debug,
    error,
    info,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Accent {
    Rarity(Rarity),
    Neutral,
}

/// What a tape cell shows.
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub accent: Accent,
}

pub trait Candidate: Clone + PartialEq {
    fn card(&self, rarity: Rarity) -> Card;
}

impl Candidate for Prize {
    fn card(&self, rarity: Rarity) -> Card {
        Card {
            title: self.display_name().to_owned(),
            subtitle: self.description.clone(),
            image_url: self.image_url.clone(),
            accent: Accent::Rarity(rarity),
        }
    }
}

impl Candidate for String {
    fn card(&self, _rarity: Rarity) -> Card {
        Card {
            title: self.clone(),
            subtitle: String::from("Player"),
            image_url: String::new(),
            accent: Accent::Neutral,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpinHint {
    Spinning(SpinKind),
    Selected(SpinKind),
}

impl fmt::Display for SpinHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinHint::Spinning(SpinKind::Prize) => f.write_str("Spinning prize..."),
            SpinHint::Spinning(SpinKind::Player) => f.write_str("Spinning player..."),
            SpinHint::Selected(SpinKind::Prize) => f.write_str("Prize selected"),
            SpinHint::Selected(SpinKind::Player) => f.write_str("Player selected"),
        }
    }
}

/// The strip a section's tape scrolls through.
pub trait TapeView {
    /// `None` when the section has nowhere to show a tape.
    fn measure(&self, rarity: Rarity) -> Option<TapeMetrics>;
    fn show_hint(&mut self, rarity: Rarity, hint: SpinHint) -> io::Result<()>;
    fn load_tape(&mut self, rarity: Rarity, tape: Tape<Card>);
    fn scroll_to(&mut self, rarity: Rarity, offset: f64) -> io::Result<()>;
}

/// Enables or disables spin and add actions as one group.
pub trait InteractionLock {
    fn set_locked(&mut self, locked: bool);
}

/// Paces the animation loop.
#[allow(async_fn_in_trait)]
pub trait FrameClock {
    fn restart(&mut self);
    /// Wait for the next frame and return time elapsed since `restart`.
    async fn next_frame(&mut self) -> Duration;
}

/// Shared flag readable by whoever draws the action buttons.
#[derive(Clone, Debug, Default)]
pub struct LockFlag(Rc<Cell<bool>>);

impl LockFlag {
    pub fn is_locked(&self) -> bool {
        self.0.get()
    }
}

impl InteractionLock for LockFlag {
    fn set_locked(&mut self, locked: bool) {
        self.0.set(locked);
    }
}

/// Ticks at a fixed frame rate. The interval is created on `restart`.
pub struct TokioFrameClock {
    frame: Duration,
    started: Instant,
    interval: Option<Interval>,
}

impl TokioFrameClock {
    pub fn new(frame: Duration) -> Self {
        TokioFrameClock {
            frame,
            started: Instant::now(),
            interval: None,
        }
    }

    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }
}

impl FrameClock for TokioFrameClock {
    fn restart(&mut self) {
        let mut interval = time::interval(self.frame);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
        self.started = Instant::now();
    }

    async fn next_frame(&mut self) -> Duration {
        if self.interval.is_none() {
            self.restart();
        }
        if let Some(interval) = self.interval.as_mut() {
            interval.tick().await;
        }
        self.started.elapsed()
    }
}

/// Single spin-in-progress flag for the whole application.
#[derive(Clone, Debug, Default)]
pub struct SpinGate {
    busy: Rc<Cell<bool>>,
}

impl SpinGate {
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub fn try_acquire(&self) -> Option<SpinLease> {
        if self.busy.replace(true) {
            return None;
        }
        Some(SpinLease {
            busy: self.busy.clone(),
        })
    }
}

#[derive(Debug)]
pub struct SpinLease {
    busy: Rc<Cell<bool>>,
}

impl Drop for SpinLease {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SpinPhase {
    #[default]
    Idle,
    Building,
    Animating,
    Settling,
}

#[derive(Debug)]
pub struct PreparedSpin<T> {
    rarity: Rarity,
    kind: SpinKind,
    final_item: T,
    tape: Tape<Card>,
    animation: SpinAnimation,
    single_choice: bool,
    lease: SpinLease,
}

impl<T> PreparedSpin<T> {
    pub fn rarity(&self) -> Rarity {
        self.rarity
    }

    pub fn final_item(&self) -> &T {
        &self.final_item
    }

    pub fn tape(&self) -> &Tape<Card> {
        &self.tape
    }

    pub fn animation(&self) -> &SpinAnimation {
        &self.animation
    }

    pub fn is_single_choice(&self) -> bool {
        self.single_choice
    }
}

pub struct SpinEngine<V, A, L, C> {
    view: V,
    audio: A,
    lock: L,
    clock: C,
    rng: StdRng,
    gate: SpinGate,
    phase: SpinPhase,
    tape_config: TapeConfig,
}

impl<V, A, L, C> SpinEngine<V, A, L, C> {
    pub fn new(view: V, audio: A, lock: L, clock: C, rng: StdRng) -> Self {
        SpinEngine {
            view,
            audio,
            lock,
            clock,
            rng,
            gate: SpinGate::default(),
            phase: SpinPhase::Idle,
            tape_config: TapeConfig::default(),
        }
    }

    pub fn with_tape_config(mut self, tape_config: TapeConfig) -> Self {
        self.tape_config = tape_config;
        self
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn lock(&self) -> &L {
        &self.lock
    }

    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    pub fn is_spinning(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn gate(&self) -> &SpinGate {
        &self.gate
    }

    fn set_phase(&mut self, phase: SpinPhase) {
        debug!(from = ?self.phase, to = ?phase, "spin phase");
        self.phase = phase;
    }
}

impl<V, A, L, C> SpinEngine<V, A, L, C>
where
    V: TapeView,
    A: Audio,
    L: InteractionLock,
    C: FrameClock,
{
    /// Guard, draw and build. Shows nothing, but a successful spin holds the
    /// lease and the interaction lock until it is passed to [`Self::run`] or
    /// [`Self::abandon`].
    pub fn prepare<T: Candidate>(
        &mut self,
        rarity: Rarity,
        kind: SpinKind,
        candidates: Vec<T>,
    ) -> Result<PreparedSpin<T>> {
        if candidates.is_empty() {
            return Err(Notice::NothingToSpin.into());
        }
        let lease = self
            .gate
            .try_acquire()
            .ok_or(SpinError::Rejected(Notice::SpinInProgress))?;
        self.set_phase(SpinPhase::Building);
        let built = self.build(rarity, kind, candidates, lease);
        match &built {
            Ok(_) => self.lock.set_locked(true),
            Err(_) => self.set_phase(SpinPhase::Idle),
        }
        built
    }

    /// Give up a prepared spin before it is shown.
    pub fn abandon<T>(&mut self, spin: PreparedSpin<T>) {
        let rarity = spin.rarity;
        drop(spin);
        self.lock.set_locked(false);
        self.set_phase(SpinPhase::Idle);
        info!(%rarity, "spin abandoned");
    }

    fn build<T: Candidate>(
        &mut self,
        rarity: Rarity,
        kind: SpinKind,
        candidates: Vec<T>,
        lease: SpinLease,
    ) -> Result<PreparedSpin<T>> {
        let metrics = self.view.measure(rarity).ok_or(SpinError::MissingAnchor {
            rarity,
            anchor: "tape viewport",
        })?;

        if selector::is_single_choice(&candidates) {
            let Some(final_item) = candidates.into_iter().next() else {
                return Err(Notice::NothingToSpin.into());
            };
            let tape = tape::single_item_tape(&final_item.card(rarity), &self.tape_config);
            let animation = SpinAnimation::settled(kind, &metrics, tape.final_index);
            return Ok(PreparedSpin {
                rarity,
                kind,
                final_item,
                tape,
                animation,
                single_choice: true,
                lease,
            });
        }

        let final_item = selector::pick(&mut self.rng, &candidates)
            .cloned()
            .ok_or(SpinError::Rejected(Notice::NothingToSpin))?;
        let duration = kind.duration();
        let cards_to_pass = profile::total_cards_to_pass(kind, duration);
        let tape = tape::build_tape(
            &mut self.rng,
            &candidates,
            &final_item,
            cards_to_pass,
            &self.tape_config,
        )
        .map(|item| item.card(rarity));
        let animation =
            SpinAnimation::new(kind, duration, &metrics, tape.final_index, cards_to_pass);
        debug!(%rarity, %kind, cards_to_pass, final_index = tape.final_index, "tape built");
        Ok(PreparedSpin {
            rarity,
            kind,
            final_item,
            tape,
            animation,
            single_choice: false,
            lease,
        })
    }

    /// Animate, settle and hand back the drawn item. Always releases the
    /// interaction lock, the music and the lease, whatever the outcome.
    pub async fn run<T>(&mut self, spin: PreparedSpin<T>) -> Result<T> {
        let PreparedSpin {
            rarity,
            kind,
            final_item,
            tape,
            animation,
            single_choice,
            lease,
        } = spin;

        self.set_phase(SpinPhase::Animating);
        info!(%rarity, %kind, cards = tape.len(), single_choice, "spin started");

        let mut music_started = false;
        let animated = self
            .animate(rarity, kind, tape, &animation, single_choice, &mut music_started)
            .await;

        self.set_phase(SpinPhase::Settling);
        let settled = animated.and_then(|()| {
            self.view
                .scroll_to(rarity, animation.final_offset)
                .map_err(SpinError::from)
        });
        if music_started {
            self.audio.stop().await;
        }
        self.lock.set_locked(false);
        let settled = settled.and_then(|()| {
            self.view
                .show_hint(rarity, SpinHint::Selected(kind))
                .map_err(SpinError::from)
        });
        self.set_phase(SpinPhase::Idle);
        drop(lease);

        match settled {
            Ok(()) => {
                info!(%rarity, %kind, "spin finished");
                Ok(final_item)
            }
            Err(err) => {
                error!(%rarity, %kind, error = %err, "spin aborted");
                Err(err)
            }
        }
    }

    async fn animate(
        &mut self,
        rarity: Rarity,
        kind: SpinKind,
        tape: Tape<Card>,
        animation: &SpinAnimation,
        single_choice: bool,
        music_started: &mut bool,
    ) -> Result<()> {
        self.view.show_hint(rarity, SpinHint::Spinning(kind))?;
        self.view.load_tape(rarity, tape);
        if single_choice {
            return Ok(());
        }
        self.view.scroll_to(rarity, animation.start_offset)?;

        self.audio.start().await;
        *music_started = true;

        self.clock.restart();
        let mut frames = 0usize;
        loop {
            let elapsed = self.clock.next_frame().await;
            frames += 1;
            self.view.scroll_to(rarity, animation.offset_at(elapsed))?;
            if animation.is_finished(elapsed) {
                break;
            }
        }
        debug!(%rarity, frames, "animation complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn try_acquire__refuses_second_lease_until_first_dropped() {
        let gate = SpinGate::default();

        let lease = gate.try_acquire();
        assert!(lease.is_some());
        assert!(gate.is_busy());
        assert!(gate.try_acquire().is_none());

        drop(lease);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn lock_flag__clones_share_state() {
        let flag = LockFlag::default();
        let mut handle = flag.clone();

        handle.set_locked(true);

        assert!(flag.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn next_frame__reports_elapsed_since_restart() {
        // given
        let mut clock = TokioFrameClock::from_fps(20);
        clock.restart();

        // when
        let first = clock.next_frame().await;
        let second = clock.next_frame().await;

        // then
        assert_eq!(first, Duration::ZERO);
        assert_eq!(second, Duration::from_millis(50));
    }

    #[test]
    fn from_fps__treats_zero_as_one() {
        assert_eq!(TokioFrameClock::from_fps(0).frame(), Duration::from_secs(1));
    }

    #[test]
    fn card__player_card_is_neutral() {
        let card = String::from("bob").card(Rarity::Exclusive);

        assert_eq!(card.title, "bob");
        assert_eq!(card.subtitle, "Player");
        assert_eq!(card.accent, Accent::Neutral);
    }

    #[test]
    fn spin_hint__describes_phase() {
        assert_eq!(SpinHint::Spinning(SpinKind::Prize).to_string(), "Spinning prize...");
        assert_eq!(SpinHint::Selected(SpinKind::Player).to_string(), "Player selected");
    }
}
