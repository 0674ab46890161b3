use crate::{
    audio::Audio,
    model::{
        AppState,
        NewPrize,
        Rarity,
    },
    motion::TapeMetrics,
    orchestrator::{
        Card,
        FrameClock,
        InteractionLock,
        SpinEngine,
        SpinHint,
        TapeView,
    },
    raffle::Render,
    tape::Tape,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::{
    io,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

pub type TestEngine = SpinEngine<FakeStage, RecordingAudio, RecordingLock, StepClock>;

#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    Hint(Rarity, SpinHint),
    LoadTape(Rarity, Tape<Card>),
    Scroll(Rarity, f64),
    Render(AppState),
    AudioStart,
    AudioStop,
    Locked(bool),
}

/// Ordered record shared by every fake collaborator of one engine.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl Journal {
    pub fn push(&self, entry: Entry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn offsets(&self) -> Vec<f64> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Scroll(_, offset) => Some(offset),
                _ => None,
            })
            .collect()
    }

    pub fn hints(&self) -> Vec<SpinHint> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Hint(_, hint) => Some(hint),
                _ => None,
            })
            .collect()
    }

    pub fn tapes(&self) -> Vec<Tape<Card>> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                Entry::LoadTape(_, tape) => Some(tape),
                _ => None,
            })
            .collect()
    }

    pub fn renders(&self) -> Vec<AppState> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Render(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, entry: &Entry) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    pub fn position(&self, entry: &Entry) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

pub fn default_metrics() -> TapeMetrics {
    TapeMetrics {
        card_width: 14.0,
        gap: 2.0,
        viewport_width: 80.0,
    }
}

pub struct FakeStage {
    journal: Journal,
    metrics: Option<TapeMetrics>,
    fail_scroll_at: Option<usize>,
    fail_render: bool,
    scrolls: usize,
}

impl FakeStage {
    pub fn new(journal: Journal) -> Self {
        FakeStage {
            journal,
            metrics: Some(default_metrics()),
            fail_scroll_at: None,
            fail_render: false,
            scrolls: 0,
        }
    }

    pub fn without_anchors(journal: Journal) -> Self {
        FakeStage {
            metrics: None,
            ..Self::new(journal)
        }
    }

    /// The `n`th scroll (counting from 1) fails with an I/O error.
    pub fn failing_scroll_at(journal: Journal, n: usize) -> Self {
        FakeStage {
            fail_scroll_at: Some(n),
            ..Self::new(journal)
        }
    }

    /// Every render fails with an I/O error.
    pub fn failing_render(journal: Journal) -> Self {
        FakeStage {
            fail_render: true,
            ..Self::new(journal)
        }
    }

    pub fn set_fail_render(&mut self, fail: bool) {
        self.fail_render = fail;
    }

    pub fn set_metrics(&mut self, metrics: Option<TapeMetrics>) {
        self.metrics = metrics;
    }
}

impl TapeView for FakeStage {
    fn measure(&self, _rarity: Rarity) -> Option<TapeMetrics> {
        self.metrics
    }

    fn show_hint(&mut self, rarity: Rarity, hint: SpinHint) -> io::Result<()> {
        self.journal.push(Entry::Hint(rarity, hint));
        Ok(())
    }

    fn load_tape(&mut self, rarity: Rarity, tape: Tape<Card>) {
        self.journal.push(Entry::LoadTape(rarity, tape));
    }

    fn scroll_to(&mut self, rarity: Rarity, offset: f64) -> io::Result<()> {
        self.scrolls += 1;
        if self.fail_scroll_at == Some(self.scrolls) {
            return Err(io::Error::other("terminal gone"));
        }
        self.journal.push(Entry::Scroll(rarity, offset));
        Ok(())
    }
}

impl Render for FakeStage {
    fn render(&mut self, state: &AppState) -> io::Result<()> {
        if self.fail_render {
            return Err(io::Error::other("terminal gone"));
        }
        self.journal.push(Entry::Render(state.clone()));
        Ok(())
    }
}

pub struct RecordingAudio {
    journal: Journal,
}

impl RecordingAudio {
    pub fn new(journal: Journal) -> Self {
        RecordingAudio { journal }
    }
}

impl Audio for RecordingAudio {
    async fn start(&mut self) {
        self.journal.push(Entry::AudioStart);
    }

    async fn stop(&mut self) {
        self.journal.push(Entry::AudioStop);
    }
}

pub struct RecordingLock {
    journal: Journal,
    locked: bool,
}

impl RecordingLock {
    pub fn new(journal: Journal) -> Self {
        RecordingLock {
            journal,
            locked: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl InteractionLock for RecordingLock {
    fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        self.journal.push(Entry::Locked(locked));
    }
}

/// Advances a fixed step per frame without waiting.
pub struct StepClock {
    step: Duration,
    elapsed: Duration,
    frames: usize,
}

impl StepClock {
    pub fn new(step: Duration) -> Self {
        StepClock {
            step,
            elapsed: Duration::ZERO,
            frames: 0,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl FrameClock for StepClock {
    fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
        self.frames = 0;
    }

    async fn next_frame(&mut self) -> Duration {
        let now = self.elapsed;
        self.elapsed += self.step;
        self.frames += 1;
        now
    }
}

pub fn test_engine(journal: &Journal, seed: u64) -> TestEngine {
    test_engine_with_stage(FakeStage::new(journal.clone()), journal, seed)
}

pub fn test_engine_with_stage(stage: FakeStage, journal: &Journal, seed: u64) -> TestEngine {
    SpinEngine::new(
        stage,
        RecordingAudio::new(journal.clone()),
        RecordingLock::new(journal.clone()),
        StepClock::new(Duration::from_millis(250)),
        StdRng::seed_from_u64(seed),
    )
}

pub fn new_prize(name: &str) -> NewPrize {
    NewPrize {
        name: name.to_owned(),
        description: format!("{name} description"),
        image_url: String::new(),
    }
}
