//! The two raffle flows and the add actions that share their spin lease.

use crate::{
    audio::Audio,
    error::{
        Notice,
        Result,
    },
    model::{
        AppState,
        NewPrize,
        PrizeId,
        Rarity,
    },
    orchestrator::{
        FrameClock,
        InteractionLock,
        SpinEngine,
        SpinGate,
        TapeView,
    },
    profile::SpinKind,
};
use std::io;
use tracing::info;

/// Redraws every view derived from the state. Never mutates it.
pub trait Render {
    fn render(&mut self, state: &AppState) -> io::Result<()>;
}

/// Spin over the section's unplayed prizes and leave the result picked.
pub async fn spin_for_prize<V, A, L, C>(
    state: &mut AppState,
    engine: &mut SpinEngine<V, A, L, C>,
    rarity: Rarity,
) -> Result<PrizeId>
where
    V: TapeView + Render,
    A: Audio,
    L: InteractionLock,
    C: FrameClock,
{
    let candidates: Vec<_> = state.section(rarity).available_prizes().cloned().collect();
    if candidates.is_empty() {
        return Err(Notice::NoAvailablePrizes.into());
    }
    let spin = engine.prepare(rarity, SpinKind::Prize, candidates)?;

    state.section_mut(rarity).clear_pick();
    if let Err(err) = engine.view_mut().render(state) {
        engine.abandon(spin);
        return Err(err.into());
    }

    let prize = engine.run(spin).await?;

    let section = state.section_mut(rarity);
    section.picked_prize_id = Some(prize.id);
    section.winner.clear();
    info!(%rarity, id = %prize.id, name = %prize.name, "prize picked");
    engine.view_mut().render(state)?;
    Ok(prize.id)
}

/// Spin over the section's roster for the picked prize and record the winner.
pub async fn spin_for_player<V, A, L, C>(
    state: &mut AppState,
    engine: &mut SpinEngine<V, A, L, C>,
    rarity: Rarity,
) -> Result<String>
where
    V: TapeView + Render,
    A: Audio,
    L: InteractionLock,
    C: FrameClock,
{
    let section = state.section(rarity);
    let id = section.picked_prize_id.ok_or(Notice::NoPrizePicked)?;
    match section.prize(id) {
        Some(prize) if !prize.played => {}
        _ => return Err(Notice::PrizeUnavailable.into()),
    }
    if section.players.is_empty() {
        return Err(Notice::EmptyRoster.into());
    }
    let roster = section.players.clone();
    let spin = engine.prepare(rarity, SpinKind::Player, roster)?;

    let winner = engine.run(spin).await?;

    let section = state.section_mut(rarity);
    section.winner = winner.clone();
    if let Some(prize) = section.prize_mut(id) {
        prize.played = true;
        prize.winner = winner.clone();
    }
    info!(%rarity, %id, %winner, "prize won");
    engine.view_mut().render(state)?;
    Ok(winner)
}

pub fn add_prize(
    state: &mut AppState,
    gate: &SpinGate,
    rarity: Rarity,
    prize: NewPrize,
) -> Result<PrizeId, Notice> {
    if gate.is_busy() {
        return Err(Notice::SpinInProgress);
    }
    state.add_prize(rarity, prize)
}

pub fn add_players(
    state: &mut AppState,
    gate: &SpinGate,
    rarity: Rarity,
    text: &str,
) -> Result<usize, Notice> {
    if gate.is_busy() {
        return Err(Notice::SpinInProgress);
    }
    state.add_players(rarity, text)
}
