use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        DisableBracketedPaste,
        EnableBracketedPaste,
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        EnterAlternateScreen,
        LeaveAlternateScreen,
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::{
    FutureExt,
    StreamExt,
};
use prize_wheel::{
    model::{
        AppState,
        NewPrize,
        PrizeId,
        Rarity,
    },
    motion::TapeMetrics,
    orchestrator::{
        Accent,
        Card,
        LockFlag,
        SpinHint,
        TapeView,
    },
    raffle::Render,
    tape::Tape,
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::{
    self,
    Stdout,
    stdout,
};
use unicode_width::{
    UnicodeWidthChar,
    UnicodeWidthStr,
};

const CARD_WIDTH: u16 = 16;
const CARD_GAP: u16 = 1;
const CARD_HEIGHT: u16 = 4;
/// Cards plus the centre markers above and below.
const TAPE_HEIGHT: u16 = CARD_HEIGHT + 2;

#[derive(Clone, Debug, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    SpinPrize(Rarity),
    SpinPlayer(Rarity),
    AddPrize(Rarity, NewPrize),
    AddPlayers(Rarity, String),
    DeletePrize(Rarity, PrizeId),
    RemovePlayer(Rarity, usize),
    SetMusic(String),
    Reset,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum ListFocus {
    #[default]
    Prizes,
    Players,
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    focus: Rarity,
    list: ListFocus,
    prize_cursor: [usize; 3],
    player_cursor: [usize; 3],
    prizes: [Vec<(PrizeId, String)>; 3],
    player_counts: [usize; 3],
    music_url: String,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            focus: Rarity::Rare,
            list: ListFocus::Prizes,
            prize_cursor: [0; 3],
            player_cursor: [0; 3],
            prizes: Default::default(),
            player_counts: [0; 3],
            music_url: String::new(),
        }
    }
}

impl UiState {
    /// Cache what key handling needs and keep cursors in range.
    fn sync(&mut self, state: &AppState) {
        for (rarity, section) in state.sections() {
            let i = rarity.index();
            self.prizes[i] = section
                .prizes
                .iter()
                .map(|p| (p.id, p.display_name().to_owned()))
                .collect();
            self.player_counts[i] = section.players.len();
            self.prize_cursor[i] = self.prize_cursor[i].min(self.prizes[i].len().saturating_sub(1));
            self.player_cursor[i] = self.player_cursor[i].min(self.player_counts[i].saturating_sub(1));
        }
        self.music_url = state.music_url.clone();
    }

    fn list_len(&self) -> usize {
        match self.list {
            ListFocus::Prizes => self.prizes[self.focus.index()].len(),
            ListFocus::Players => self.player_counts[self.focus.index()],
        }
    }

    fn cursor_mut(&mut self) -> &mut usize {
        let i = self.focus.index();
        match self.list {
            ListFocus::Prizes => &mut self.prize_cursor[i],
            ListFocus::Players => &mut self.player_cursor[i],
        }
    }

    fn paste(&mut self, text: &str) -> bool {
        match &mut self.mode {
            Mode::AddPrize(form) => {
                form.fields[form.field].push_str(&text.replace(['\r', '\n'], " "));
                true
            }
            Mode::AddPlayers(buffer) => {
                buffer.push_str(&text.replace("\r\n", "\n"));
                true
            }
            Mode::Music(buffer) => {
                buffer.push_str(text.lines().next().unwrap_or_default());
                true
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    AddPrize(PrizeForm),
    AddPlayers(String),
    Music(String),
    ConfirmDelete {
        rarity: Rarity,
        id: PrizeId,
        name: String,
    },
    ConfirmReset,
    QuitModal,
    Notice(String),
}

const PRIZE_FIELDS: [&str; 3] = ["Name", "Description", "Image URL"];

#[derive(Clone, Debug, Default)]
struct PrizeForm {
    fields: [String; 3],
    field: usize,
}

impl PrizeForm {
    fn take(&mut self) -> NewPrize {
        let [name, description, image_url] = std::mem::take(&mut self.fields);
        NewPrize {
            name,
            description,
            image_url,
        }
    }
}

#[derive(Debug, Default)]
struct TapeStrip {
    tape: Option<Tape<Card>>,
    offset: f64,
    hint: Option<SpinHint>,
}

/// Terminal surface for the three sections: renders state and scrolls tapes.
pub struct TerminalStage {
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
    ui: UiState,
    lock: LockFlag,
    strips: [TapeStrip; 3],
    tape_areas: [Rect; 3],
    state: AppState,
    status: String,
    errors: Vec<String>,
}

impl TerminalStage {
    pub fn new(lock: LockFlag) -> Self {
        TerminalStage {
            terminal: None,
            ui: UiState::default(),
            lock,
            strips: Default::default(),
            tape_areas: [Rect::default(); 3],
            state: AppState::default(),
            status: String::new(),
            errors: Vec::new(),
        }
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    pub fn set_status(&mut self, status: &str, errors: &[String]) {
        self.status = status.to_owned();
        self.errors = errors.iter().rev().take(3).cloned().collect();
    }

    pub fn show_notice(&mut self, text: impl Into<String>) {
        self.ui.mode = Mode::Notice(text.into());
    }

    pub fn clear_tapes(&mut self) {
        self.strips = Default::default();
    }

    pub fn redraw(&mut self) -> io::Result<()> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(());
        };
        let view = View {
            ui: &self.ui,
            strips: &self.strips,
            state: &self.state,
            status: &self.status,
            errors: &self.errors,
            locked: self.lock.is_locked(),
        };
        let mut tape_areas = self.tape_areas;
        terminal.draw(|f| tape_areas = draw_frame(f, &view))?;
        self.tape_areas = tape_areas;
        Ok(())
    }
}

impl Render for TerminalStage {
    fn render(&mut self, state: &AppState) -> io::Result<()> {
        self.state = state.clone();
        self.ui.sync(state);
        self.redraw()
    }
}

impl TapeView for TerminalStage {
    fn measure(&self, rarity: Rarity) -> Option<TapeMetrics> {
        let area = self.tape_areas[rarity.index()];
        if area.width == 0 || area.height < TAPE_HEIGHT {
            return None;
        }
        Some(TapeMetrics {
            card_width: f64::from(CARD_WIDTH),
            gap: f64::from(CARD_GAP),
            viewport_width: f64::from(area.width),
        })
    }

    fn show_hint(&mut self, rarity: Rarity, hint: SpinHint) -> io::Result<()> {
        self.strips[rarity.index()].hint = Some(hint);
        self.redraw()
    }

    fn load_tape(&mut self, rarity: Rarity, tape: Tape<Card>) {
        self.strips[rarity.index()].tape = Some(tape);
    }

    fn scroll_to(&mut self, rarity: Rarity, offset: f64) -> io::Result<()> {
        self.strips[rarity.index()].offset = offset;
        self.redraw()
    }
}

pub fn terminal_enter(stage: &mut TerminalStage) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout());
    stage.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(stdout(), DisableBracketedPaste, LeaveAlternateScreen)?;
    Ok(())
}

pub fn input_event_stream() -> EventStream {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut EventStream) -> Result<Event> {
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

/// Throw away input that queued up while actions were disabled.
pub fn drain_pending(events: &mut EventStream) -> usize {
    let mut drained = 0;
    while let Some(Some(_)) = events.next().now_or_never() {
        drained += 1;
    }
    drained
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Resize(..) => Some(UserEvent::Redraw),
        Event::Paste(text) => state.paste(&text).then_some(UserEvent::Redraw),
        Event::Key(key) if key.kind == KeyEventKind::Press => interpret_key(state, key),
        _ => None,
    }
}

fn interpret_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    let rarity = state.focus;
    match &mut state.mode {
        Mode::Notice(_) => {
            state.mode = Mode::Normal;
            return Some(UserEvent::Redraw);
        }
        Mode::QuitModal => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::ConfirmReset => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Reset)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::ConfirmDelete { rarity, id, .. } => {
            let (rarity, id) = (*rarity, *id);
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::DeletePrize(rarity, id))
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::AddPrize(form) => {
            return match key.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Tab | KeyCode::Down => {
                    form.field = (form.field + 1) % PRIZE_FIELDS.len();
                    Some(UserEvent::Redraw)
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.field = (form.field + PRIZE_FIELDS.len() - 1) % PRIZE_FIELDS.len();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let prize = form.take();
                    state.mode = Mode::Normal;
                    Some(UserEvent::AddPrize(rarity, prize))
                }
                KeyCode::Backspace => {
                    form.fields[form.field].pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) => {
                    form.fields[form.field].push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::AddPlayers(buffer) => {
            return match key.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char('s') if ctrl => {
                    let text = std::mem::take(buffer);
                    state.mode = Mode::Normal;
                    Some(UserEvent::AddPlayers(rarity, text))
                }
                KeyCode::Enter => {
                    buffer.push('\n');
                    Some(UserEvent::Redraw)
                }
                KeyCode::Backspace => {
                    buffer.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Music(buffer) => {
            return match key.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let url = std::mem::take(buffer);
                    state.mode = Mode::Normal;
                    Some(UserEvent::SetMusic(url))
                }
                KeyCode::Backspace => {
                    buffer.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }

    let ev = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            UserEvent::Redraw
        }
        KeyCode::Left => {
            state.focus = rarity.prev();
            UserEvent::Redraw
        }
        KeyCode::Right => {
            state.focus = rarity.next();
            UserEvent::Redraw
        }
        KeyCode::Char(c @ '1'..='3') => {
            let idx = c as usize - '1' as usize;
            state.focus = Rarity::ALL[idx];
            UserEvent::Redraw
        }
        KeyCode::Tab => {
            state.list = match state.list {
                ListFocus::Prizes => ListFocus::Players,
                ListFocus::Players => ListFocus::Prizes,
            };
            UserEvent::Redraw
        }
        KeyCode::Up => {
            let cursor = state.cursor_mut();
            *cursor = cursor.saturating_sub(1);
            UserEvent::Redraw
        }
        KeyCode::Down => {
            let max = state.list_len().saturating_sub(1);
            let cursor = state.cursor_mut();
            *cursor = (*cursor + 1).min(max);
            UserEvent::Redraw
        }
        KeyCode::Char('p') => UserEvent::SpinPrize(rarity),
        KeyCode::Char('w') => UserEvent::SpinPlayer(rarity),
        KeyCode::Char('a') => {
            state.mode = Mode::AddPrize(PrizeForm::default());
            UserEvent::Redraw
        }
        KeyCode::Char('n') => {
            state.mode = Mode::AddPlayers(String::new());
            UserEvent::Redraw
        }
        KeyCode::Char('m') => {
            state.mode = Mode::Music(state.music_url.clone());
            UserEvent::Redraw
        }
        KeyCode::Char('R') => {
            state.mode = Mode::ConfirmReset;
            UserEvent::Redraw
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            let i = rarity.index();
            match state.list {
                ListFocus::Prizes => {
                    let (id, name) = state.prizes[i].get(state.prize_cursor[i]).cloned()?;
                    state.mode = Mode::ConfirmDelete { rarity, id, name };
                    UserEvent::Redraw
                }
                ListFocus::Players => {
                    if state.player_cursor[i] >= state.player_counts[i] {
                        return None;
                    }
                    UserEvent::RemovePlayer(rarity, state.player_cursor[i])
                }
            }
        }
        _ => return None,
    };
    Some(ev)
}

struct View<'a> {
    ui: &'a UiState,
    strips: &'a [TapeStrip; 3],
    state: &'a AppState,
    status: &'a str,
    errors: &'a [String],
    locked: bool,
}

fn draw_frame(f: &mut Frame, view: &View<'_>) -> [Rect; 3] {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // status
            Constraint::Min(18),   // sections
            Constraint::Length(8), // gallery
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_top(f, chunks[0], view);
    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(chunks[1]);
    let mut tape_areas = [Rect::default(); 3];
    for rarity in Rarity::ALL {
        tape_areas[rarity.index()] = draw_section(f, panels[rarity.index()], view, rarity);
    }
    draw_gallery(f, chunks[2], view);
    draw_help(f, chunks[3], view);
    draw_modals(f, view);
    tape_areas
}

fn draw_top(f: &mut Frame, area: Rect, view: &View<'_>) {
    let music = if view.state.music_url.is_empty() {
        String::from("none")
    } else {
        view.state.music_url.clone()
    };
    let mut lines = vec![Line::from(format!("{} | Music: {}", view.status, music))];
    match view.errors.first() {
        Some(err) => lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red))),
        None => lines.push(Line::styled("No errors", Style::default().fg(Color::DarkGray))),
    }
    let top = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Prize Wheel"));
    f.render_widget(top, area);
}

fn draw_section(f: &mut Frame, area: Rect, view: &View<'_>, rarity: Rarity) -> Rect {
    let section = view.state.section(rarity);
    let accent = rarity_color(rarity);
    let focused = view.ui.focus == rarity;
    let title = format!(
        " {} | {} available | {} played ",
        rarity.label(),
        section.available_count(),
        section.played_count()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if focused { BorderType::Thick } else { BorderType::Plain })
        .border_style(if focused {
            Style::default().fg(accent)
        } else {
            Style::default().fg(Color::DarkGray)
        })
        .title(Span::styled(title, Style::default().fg(accent).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(TAPE_HEIGHT),
            Constraint::Length(1), // hint
            Constraint::Length(2), // picked prize
            Constraint::Length(1), // winner
            Constraint::Min(3),    // prizes
            Constraint::Length(4), // players
        ])
        .split(inner);
    let width = inner.width as usize;
    let dim = Style::default().fg(Color::DarkGray);

    let strip = &view.strips[rarity.index()];
    f.render_widget(
        TapeWidget {
            tape: strip.tape.as_ref(),
            offset: strip.offset,
        },
        rows[0],
    );

    let hint = strip.hint.map(|h| h.to_string()).unwrap_or_else(|| String::from("Ready"));
    f.render_widget(
        Paragraph::new(truncate(&hint, width))
            .style(dim.add_modifier(Modifier::ITALIC))
            .alignment(Alignment::Center),
        rows[1],
    );

    let picked = match section.picked_prize() {
        Some(prize) => vec![
            Line::from(vec![
                Span::styled("Prize: ", dim),
                Span::styled(
                    truncate(prize.display_name(), width.saturating_sub(7)),
                    Style::default().fg(accent).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(truncate(&prize.description, width)),
        ],
        None => vec![Line::styled("No prize picked", dim)],
    };
    f.render_widget(Paragraph::new(picked), rows[2]);

    let winner = if section.winner.is_empty() {
        Line::styled("Winner: -", dim)
    } else {
        Line::from(vec![
            Span::styled("Winner: ", dim),
            Span::styled(
                truncate(&section.winner, width.saturating_sub(8)),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ])
    };
    f.render_widget(Paragraph::new(winner), rows[3]);

    let items: Vec<ListItem> = section
        .prizes
        .iter()
        .map(|prize| {
            if prize.played {
                ListItem::new(truncate(
                    &format!("x {} -> {}", prize.display_name(), prize.winner),
                    width,
                ))
                .style(dim.add_modifier(Modifier::CROSSED_OUT))
            } else {
                ListItem::new(truncate(&format!("* {}", prize.display_name()), width))
            }
        })
        .collect();
    let prizes_active = focused && view.ui.list == ListFocus::Prizes;
    let mut list_state = ListState::default();
    if prizes_active && !items.is_empty() {
        list_state.select(Some(view.ui.prize_cursor[rarity.index()]));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .title(format!("Prizes ({})", section.prizes.len())),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, rows[4], &mut list_state);

    let players_active = focused && view.ui.list == ListFocus::Players;
    let mut pills = Vec::with_capacity(section.players.len() * 2);
    for (i, nick) in section.players.iter().enumerate() {
        let style = if players_active && i == view.ui.player_cursor[rarity.index()] {
            Style::default().fg(Color::Black).bg(accent)
        } else {
            Style::default().fg(accent)
        };
        pills.push(Span::styled(format!("[{}]", truncate(nick, 20)), style));
        pills.push(Span::raw(" "));
    }
    let players = Paragraph::new(Line::from(pills))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::TOP)
                .title(format!("Players ({})", section.players.len())),
        );
    f.render_widget(players, rows[5]);

    rows[0]
}

fn draw_gallery(f: &mut Frame, area: Rect, view: &View<'_>) {
    let gallery = view.state.gallery();
    let width = area.width.saturating_sub(2) as usize;
    let mut lines = Vec::with_capacity(gallery.len());
    if gallery.is_empty() {
        lines.push(Line::styled("No prizes yet", Style::default().fg(Color::DarkGray)));
    }
    for (rarity, prize) in gallery {
        let label = format!("{:<10}", rarity.label());
        let mut spans = vec![
            Span::styled(label, Style::default().fg(rarity_color(rarity))),
            Span::raw(truncate(prize.display_name(), width.saturating_sub(11))),
        ];
        if prize.played {
            spans.push(Span::styled(
                format!("  won by {}", prize.winner),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));
    }
    let gallery = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Gallery"));
    f.render_widget(gallery, area);
}

fn draw_help(f: &mut Frame, area: Rect, view: &View<'_>) {
    let help = if view.locked {
        Paragraph::new("Spinning... actions are disabled until the tape settles")
            .style(Style::default().fg(Color::Yellow))
    } else {
        Paragraph::new(
            "1-3/<- -> section | up/down move | Tab prizes/players | p spin prize | w spin player | a add prize | n add players | d delete | m music | R reset | q quit",
        )
    };
    f.render_widget(help.block(Block::default().borders(Borders::ALL).title("Help")), area);
}

fn draw_modals(f: &mut Frame, view: &View<'_>) {
    let (title, lines, w, h): (&str, Vec<Line>, u16, u16) = match &view.ui.mode {
        Mode::Normal => return,
        Mode::AddPrize(form) => {
            let mut lines = Vec::new();
            for (i, label) in PRIZE_FIELDS.iter().enumerate() {
                let active = i == form.field;
                let cursor = if active { ">" } else { " " };
                let caret = if active { "_" } else { "" };
                let style = if active {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Line::styled(
                    format!("{cursor} {label}: {}{caret}", form.fields[i]),
                    style,
                ));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("Tab next field | Enter add | Esc cancel"));
            ("Add prize", lines, 50, 40)
        }
        Mode::AddPlayers(buffer) => {
            let mut lines: Vec<Line> = buffer.split('\n').map(|l| Line::from(l.to_owned())).collect();
            if let Some(last) = lines.last_mut() {
                last.push_span(Span::raw("_"));
            }
            lines.push(Line::from(""));
            lines.push(Line::styled(
                "One nickname per line, paste works | Ctrl+S add | Esc cancel",
                Style::default().fg(Color::DarkGray),
            ));
            ("Add players", lines, 50, 60)
        }
        Mode::Music(buffer) => (
            "Music",
            vec![
                Line::from("Audio file to loop while spinning (empty disables music):"),
                Line::from(format!("{buffer}_")),
                Line::from(""),
                Line::from("Enter save | Esc cancel"),
            ],
            60,
            30,
        ),
        Mode::ConfirmDelete { rarity, name, .. } => (
            "Delete prize",
            vec![Line::from(format!(
                "Delete \"{name}\" from {}? (Y/N)",
                rarity.label()
            ))],
            50,
            20,
        ),
        Mode::ConfirmReset => (
            "Reset",
            vec![
                Line::from("Reset everything? Prizes, players and music are cleared."),
                Line::from("(Y/N)"),
            ],
            50,
            20,
        ),
        Mode::QuitModal => ("Confirm Quit", vec![Line::from("Quit the prize wheel? (Y/N)")], 40, 20),
        Mode::Notice(text) => (
            "Notice",
            vec![
                Line::from(text.clone()),
                Line::from(""),
                Line::styled("Press any key", Style::default().fg(Color::DarkGray)),
            ],
            50,
            20,
        ),
    };
    let area = centered_rect(w, h, f.area());
    let block = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), block.inner(area));
}

/// A horizontal strip of cards scrolled by `offset` cells, with the card
/// under the centre column highlighted.
struct TapeWidget<'a> {
    tape: Option<&'a Tape<Card>>,
    offset: f64,
}

impl Widget for TapeWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height < TAPE_HEIGHT {
            return;
        }
        let centre = i32::from(area.x + area.width / 2);
        let marker = Style::default().fg(Color::Yellow);
        put_clipped(buf, centre, area.y, "v", marker, area);
        put_clipped(buf, centre, area.y + TAPE_HEIGHT - 1, "^", marker, area);

        let Some(tape) = self.tape else {
            let text = ". . .";
            let x = centre - (text.width() / 2) as i32;
            put_clipped(
                buf,
                x,
                area.y + TAPE_HEIGHT / 2,
                text,
                Style::default().fg(Color::DarkGray),
                area,
            );
            return;
        };

        let step = f64::from(CARD_WIDTH + CARD_GAP);
        let first = ((-self.offset - f64::from(CARD_WIDTH)) / step).floor().max(0.0) as usize;
        let last = ((f64::from(area.width) - self.offset) / step).ceil().max(0.0) as usize;
        for (idx, card) in tape
            .cards
            .iter()
            .enumerate()
            .take(last.saturating_add(1))
            .skip(first)
        {
            let x = i32::from(area.x) + (self.offset + idx as f64 * step).round() as i32;
            let highlighted = x <= centre && centre < x + i32::from(CARD_WIDTH);
            draw_card(buf, x, area.y + 1, card, highlighted, area);
        }
    }
}

fn draw_card(buf: &mut Buffer, x: i32, y: u16, card: &Card, highlighted: bool, clip: Rect) {
    let colour = match card.accent {
        Accent::Rarity(rarity) => rarity_color(rarity),
        Accent::Neutral => Color::White,
    };
    let border = if highlighted {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(colour)
    };
    let inner = usize::from(CARD_WIDTH - 2);
    let right = x + i32::from(CARD_WIDTH) - 1;
    let horizontal = "-".repeat(inner);
    put_clipped(buf, x, y, &format!("+{horizontal}+"), border, clip);
    let rows = [
        (&card.title, Style::default().fg(colour).add_modifier(Modifier::BOLD)),
        (&card.subtitle, Style::default().fg(Color::DarkGray)),
    ];
    for (i, (text, style)) in rows.into_iter().enumerate() {
        let row = y + 1 + i as u16;
        put_clipped(buf, x, row, "|", border, clip);
        put_clipped(buf, x + 1, row, &fit(text, inner), style, clip);
        put_clipped(buf, right, row, "|", border, clip);
    }
    put_clipped(buf, x, y + CARD_HEIGHT - 1, &format!("+{horizontal}+"), border, clip);
}

/// Writes `text` starting at column `x` (which may lie off screen), keeping
/// only characters that fit entirely inside `clip`.
fn put_clipped(buf: &mut Buffer, x: i32, y: u16, text: &str, style: Style, clip: Rect) {
    if y < clip.top() || y >= clip.bottom() {
        return;
    }
    let mut x = x;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0) as i32;
        if w == 0 {
            continue;
        }
        if x >= i32::from(clip.left()) && x + w <= i32::from(clip.right()) {
            if let Some(cell) = buf.cell_mut((x as u16, y)) {
                cell.set_char(ch).set_style(style);
            }
        }
        x += w;
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_owned();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Centre `text` in exactly `width` columns.
fn fit(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let used = text.width();
    let left = (width - used) / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(width - used - left))
}

fn rarity_color(rarity: Rarity) -> Color {
    match rarity {
        Rarity::Rare => Color::Cyan,
        Rarity::VeryRare => Color::Magenta,
        Rarity::Exclusive => Color::Yellow,
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crossterm::event::KeyEventState;
    use prize_wheel::test_helpers::new_prize;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(ui: &mut UiState, text: &str) {
        for c in text.chars() {
            interpret_event(ui, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn interpret_event__spin_keys_target_focused_section() {
        let mut ui = UiState::default();

        interpret_event(&mut ui, key(KeyCode::Right));
        let ev = interpret_event(&mut ui, key(KeyCode::Char('p')));

        assert_eq!(ev, Some(UserEvent::SpinPrize(Rarity::VeryRare)));
        assert_eq!(
            interpret_event(&mut ui, key(KeyCode::Char('w'))),
            Some(UserEvent::SpinPlayer(Rarity::VeryRare))
        );
    }

    #[test]
    fn interpret_event__add_prize_form_submits_all_fields() {
        // given
        let mut ui = UiState::default();
        interpret_event(&mut ui, key(KeyCode::Char('3')));
        interpret_event(&mut ui, key(KeyCode::Char('a')));

        // when
        type_text(&mut ui, "Mug");
        interpret_event(&mut ui, key(KeyCode::Tab));
        type_text(&mut ui, "Big");
        let ev = interpret_event(&mut ui, key(KeyCode::Enter));

        // then
        assert_eq!(
            ev,
            Some(UserEvent::AddPrize(
                Rarity::Exclusive,
                NewPrize {
                    name: "Mug".into(),
                    description: "Big".into(),
                    image_url: String::new(),
                }
            ))
        );
        assert!(matches!(ui.mode, Mode::Normal));
    }

    #[test]
    fn interpret_event__players_modal_accepts_paste_and_ctrl_s() {
        let mut ui = UiState::default();
        interpret_event(&mut ui, key(KeyCode::Char('n')));

        interpret_event(&mut ui, Event::Paste("@alice\r\nbob".into()));
        interpret_event(&mut ui, key(KeyCode::Enter));
        type_text(&mut ui, "carol");
        let ev = interpret_event(&mut ui, ctrl('s'));

        assert_eq!(
            ev,
            Some(UserEvent::AddPlayers(Rarity::Rare, "@alice\nbob\ncarol".into()))
        );
    }

    #[test]
    fn interpret_event__delete_prize_requires_confirmation() {
        // given
        let mut state = AppState::default();
        let id = state.add_prize(Rarity::Rare, new_prize("Mug")).unwrap();
        let mut ui = UiState::default();
        ui.sync(&state);

        // when
        let opened = interpret_event(&mut ui, key(KeyCode::Char('d')));
        let confirmed = interpret_event(&mut ui, key(KeyCode::Char('y')));

        // then
        assert_eq!(opened, Some(UserEvent::Redraw));
        assert_eq!(confirmed, Some(UserEvent::DeletePrize(Rarity::Rare, id)));
    }

    #[test]
    fn interpret_event__delete_with_empty_list_is_ignored() {
        let mut ui = UiState::default();

        assert_eq!(interpret_event(&mut ui, key(KeyCode::Char('d'))), None);
        interpret_event(&mut ui, key(KeyCode::Tab));
        assert_eq!(interpret_event(&mut ui, key(KeyCode::Char('d'))), None);
    }

    #[test]
    fn interpret_event__removes_player_at_cursor() {
        let mut state = AppState::default();
        state.add_players(Rarity::Rare, "x\ny\nz").unwrap();
        let mut ui = UiState::default();
        ui.sync(&state);

        interpret_event(&mut ui, key(KeyCode::Tab));
        interpret_event(&mut ui, key(KeyCode::Down));
        interpret_event(&mut ui, key(KeyCode::Down));
        interpret_event(&mut ui, key(KeyCode::Down));
        let ev = interpret_event(&mut ui, key(KeyCode::Char('d')));

        assert_eq!(ev, Some(UserEvent::RemovePlayer(Rarity::Rare, 2)));
    }

    #[test]
    fn interpret_event__reset_and_quit_ask_first() {
        let mut ui = UiState::default();

        interpret_event(&mut ui, key(KeyCode::Char('R')));
        assert_eq!(interpret_event(&mut ui, key(KeyCode::Char('n'))), Some(UserEvent::Redraw));
        interpret_event(&mut ui, key(KeyCode::Char('R')));
        assert_eq!(interpret_event(&mut ui, key(KeyCode::Char('y'))), Some(UserEvent::Reset));

        interpret_event(&mut ui, key(KeyCode::Char('q')));
        assert_eq!(interpret_event(&mut ui, key(KeyCode::Char('y'))), Some(UserEvent::Quit));
    }

    #[test]
    fn interpret_event__any_key_dismisses_notice() {
        let mut stage = TerminalStage::new(LockFlag::default());
        stage.show_notice("Pick a prize first");

        let ev = interpret_event(stage.ui_mut(), key(KeyCode::Char('p')));

        assert_eq!(ev, Some(UserEvent::Redraw));
        assert!(matches!(stage.ui.mode, Mode::Normal));
    }

    #[test]
    fn measure__is_none_before_first_draw() {
        let stage = TerminalStage::new(LockFlag::default());

        assert_eq!(stage.measure(Rarity::Rare), None);
    }

    #[test]
    fn tape_widget__highlights_card_under_centre() {
        // given
        let area = Rect::new(0, 0, 40, TAPE_HEIGHT);
        let mut buf = Buffer::empty(area);
        let card = Card {
            title: "Mug".into(),
            subtitle: String::new(),
            image_url: String::new(),
            accent: Accent::Neutral,
        };
        let tape = Tape {
            cards: vec![card; 5],
            final_index: 2,
        };
        let metrics = TapeMetrics {
            card_width: f64::from(CARD_WIDTH),
            gap: f64::from(CARD_GAP),
            viewport_width: 40.0,
        };

        // when
        TapeWidget {
            tape: Some(&tape),
            offset: metrics.shift_for_index(2),
        }
        .render(area, &mut buf);

        // then
        let left = 20 - CARD_WIDTH / 2;
        assert_eq!(buf[(left, 1)].symbol(), "+");
        assert_eq!(buf[(left, 1)].fg, Color::Yellow);
        assert_eq!(buf[(20, 0)].symbol(), "v");
    }

    #[test]
    fn truncate__respects_display_width() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 6), "hello…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn fit__pads_to_exact_width() {
        assert_eq!(fit("ab", 6), "  ab  ");
        assert_eq!(fit("abcdefgh", 4).width(), 4);
    }
}
