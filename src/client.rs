use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use crossterm::event::EventStream;
use prize_wheel::{
    SpinError,
    audio::{
        Music,
        NullOutput,
        Output,
    },
    catalogue,
    model::{
        AppState,
        NewPrize,
        PrizeId,
        Rarity,
    },
    orchestrator::{
        LockFlag,
        SpinEngine,
        TokioFrameClock,
    },
    raffle::{
        self,
        Render,
    },
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::{
    debug,
    error,
    info,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_LOG_DIR: &str = ".prize-wheel/logs";
const LOG_FILE_PREFIX: &str = "prize-wheel.log";
const MAX_ERRORS: usize = 50;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub music: Option<String>,
    pub import: Option<PathBuf>,
    pub seed: Option<u64>,
    pub fps: u32,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            music: None,
            import: None,
            seed: None,
            fps: DEFAULT_FPS,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

type Engine<O> = SpinEngine<ui::TerminalStage, Music<O>, LockFlag, TokioFrameClock>;

pub struct AppController<O> {
    state: AppState,
    engine: Engine<O>,
    pub status: String,
    errors: Vec<String>,
}

impl<O: Output> AppController<O> {
    pub fn new(config: &AppConfig, output: O) -> Result<Self> {
        let mut state = AppState::default();
        let mut status = String::from("Ready");
        if let Some(path) = &config.import {
            let summary = catalogue::load(path)?.apply(&mut state);
            status = summary.to_string();
        }
        if let Some(music) = &config.music {
            state.set_music_url(music);
        }

        let rng = match config.seed {
            Some(seed) => {
                info!(seed, "using seeded rng");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_os_rng(),
        };
        let mut music = Music::new(output);
        music.set_source(&state.music_url);
        let lock = LockFlag::default();
        let engine = SpinEngine::new(
            ui::TerminalStage::new(lock.clone()),
            music,
            lock,
            TokioFrameClock::from_fps(config.fps),
            rng,
        );
        Ok(Self {
            state,
            engine,
            status,
            errors: Vec::new(),
        })
    }

    pub fn stage_mut(&mut self) -> &mut ui::TerminalStage {
        self.engine.view_mut()
    }

    pub fn draw(&mut self) -> Result<()> {
        let stage = self.engine.view_mut();
        stage.set_status(&self.status, &self.errors);
        stage.render(&self.state)?;
        Ok(())
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.engine.view_mut().set_status(&self.status, &self.errors);
    }

    pub async fn spin_prize(&mut self, rarity: Rarity) {
        self.set_status(format!("Spinning {rarity} prizes..."));
        match raffle::spin_for_prize(&mut self.state, &mut self.engine, rarity).await {
            Ok(id) => {
                let name = self.prize_name(rarity, id);
                self.set_status(format!("{rarity}: picked {name}"));
            }
            Err(err) => self.report(err),
        }
    }

    pub async fn spin_player(&mut self, rarity: Rarity) {
        self.set_status(format!("Spinning {rarity} players..."));
        match raffle::spin_for_player(&mut self.state, &mut self.engine, rarity).await {
            Ok(winner) => self.set_status(format!("{rarity}: {winner} wins!")),
            Err(err) => self.report(err),
        }
    }

    pub fn add_prize(&mut self, rarity: Rarity, prize: NewPrize) {
        match raffle::add_prize(&mut self.state, self.engine.gate(), rarity, prize) {
            Ok(id) => {
                let name = self.prize_name(rarity, id);
                self.set_status(format!("Added {name} to {rarity}"));
            }
            Err(notice) => self.report(notice.into()),
        }
    }

    pub fn add_players(&mut self, rarity: Rarity, text: &str) {
        match raffle::add_players(&mut self.state, self.engine.gate(), rarity, text) {
            Ok(added) => self.set_status(format!("Added {added} players to {rarity}")),
            Err(notice) => self.report(notice.into()),
        }
    }

    pub fn delete_prize(&mut self, rarity: Rarity, id: PrizeId) {
        if let Some(prize) = self.state.remove_prize(rarity, id) {
            self.set_status(format!("Deleted {}", prize.display_name()));
        }
    }

    pub fn remove_player(&mut self, rarity: Rarity, index: usize) {
        if let Some(nick) = self.state.remove_player(rarity, index) {
            self.set_status(format!("Removed {nick} from {rarity}"));
        }
    }

    pub fn set_music(&mut self, source: &str) {
        self.state.set_music_url(source);
        self.engine.audio_mut().set_source(&self.state.music_url);
        if self.state.music_url.is_empty() {
            self.set_status("Music disabled");
        } else {
            let status = format!("Music set to {}", self.state.music_url);
            self.set_status(status);
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.engine.audio_mut().set_source("");
        self.engine.view_mut().clear_tapes();
        self.set_status("Everything was reset");
    }

    pub fn halt_music(&mut self) {
        self.engine.audio_mut().halt();
    }

    fn prize_name(&self, rarity: Rarity, id: PrizeId) -> String {
        self.state
            .section(rarity)
            .prize(id)
            .map(|p| p.display_name().to_owned())
            .unwrap_or_default()
    }

    fn report(&mut self, err: SpinError) {
        match err.notice() {
            Some(notice) => {
                self.set_status(notice.to_string());
                self.engine.view_mut().show_notice(notice.to_string());
            }
            None => {
                self.push_errors(vec![err.to_string()]);
                self.set_status("Spin failed");
                self.engine
                    .view_mut()
                    .show_notice("Something went wrong. Details are in the log.");
            }
        }
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}

/// Logs go to a daily rolling file since the terminal belongs to the UI.
pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {e}"))?;
    Ok(guard)
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    run_with_default_output(config).await
}

#[cfg(feature = "rodio")]
async fn run_with_default_output(config: AppConfig) -> Result<()> {
    match prize_wheel::audio::RodioOutput::new() {
        Ok(output) => run_with_output(config, output).await,
        Err(err) => {
            tracing::warn!(?err, "no audio output device; music is disabled");
            run_with_output(config, NullOutput).await
        }
    }
}

#[cfg(not(feature = "rodio"))]
async fn run_with_default_output(config: AppConfig) -> Result<()> {
    run_with_output(config, NullOutput).await
}

async fn run_with_output<O: Output>(config: AppConfig, output: O) -> Result<()> {
    let mut controller = AppController::new(&config, output)?;
    let mut input_events = ui::input_event_stream();

    info!("starting UI");
    ui::terminal_enter(controller.stage_mut())?;
    let res = run_loop(&mut controller, &mut input_events).await;
    controller.halt_music();
    ui::terminal_exit()?;
    info!("UI closed");
    res
}

async fn run_loop<O: Output>(
    controller: &mut AppController<O>,
    input_events: &mut EventStream,
) -> Result<()> {
    controller.draw().wrap_err("initial draw failed")?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(controller.stage_mut().ui_mut(), event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::SpinPrize(rarity) => {
                        controller.spin_prize(rarity).await;
                        let dropped = ui::drain_pending(input_events);
                        debug!(dropped, "discarded input queued during spin");
                    }
                    ui::UserEvent::SpinPlayer(rarity) => {
                        controller.spin_player(rarity).await;
                        let dropped = ui::drain_pending(input_events);
                        debug!(dropped, "discarded input queued during spin");
                    }
                    ui::UserEvent::AddPrize(rarity, prize) => controller.add_prize(rarity, prize),
                    ui::UserEvent::AddPlayers(rarity, text) => controller.add_players(rarity, &text),
                    ui::UserEvent::DeletePrize(rarity, id) => controller.delete_prize(rarity, id),
                    ui::UserEvent::RemovePlayer(rarity, index) => controller.remove_player(rarity, index),
                    ui::UserEvent::SetMusic(source) => controller.set_music(&source),
                    ui::UserEvent::Reset => controller.reset(),
                }
                controller.draw().wrap_err("draw after input failed")?;
            }
        }
    }
    Ok(())
}
