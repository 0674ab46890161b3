use crate::error::Notice;
use itertools::Itertools;
use std::fmt;
use tracing::info;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Rarity {
    Rare,
    VeryRare,
    Exclusive,
}

impl Rarity {
    pub const ALL: [Rarity; 3] = [Rarity::Rare, Rarity::VeryRare, Rarity::Exclusive];

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Rare => "Rare",
            Rarity::VeryRare => "Very rare",
            Rarity::Exclusive => "Exclusive",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Rarity::Rare => 0,
            Rarity::VeryRare => 1,
            Rarity::Exclusive => 2,
        }
    }

    pub fn next(self) -> Rarity {
        Rarity::ALL[(self.index() + 1) % Rarity::ALL.len()]
    }

    pub fn prev(self) -> Rarity {
        Rarity::ALL[(self.index() + Rarity::ALL.len() - 1) % Rarity::ALL.len()]
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Opaque prize handle, unique within one [`AppState`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PrizeId(u64);

impl fmt::Display for PrizeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prize-{:06x}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Prize {
    pub id: PrizeId,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub played: bool,
    pub winner: String,
}

impl Prize {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { "Untitled" } else { &self.name }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewPrize {
    pub name: String,
    pub description: String,
    pub image_url: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    pub prizes: Vec<Prize>,
    pub players: Vec<String>,
    pub picked_prize_id: Option<PrizeId>,
    pub winner: String,
}

impl Section {
    pub fn available_prizes(&self) -> impl Iterator<Item = &Prize> {
        self.prizes.iter().filter(|p| !p.played)
    }

    pub fn available_count(&self) -> usize {
        self.available_prizes().count()
    }

    pub fn played_count(&self) -> usize {
        self.prizes.iter().filter(|p| p.played).count()
    }

    pub fn prize(&self, id: PrizeId) -> Option<&Prize> {
        self.prizes.iter().find(|p| p.id == id)
    }

    pub fn prize_mut(&mut self, id: PrizeId) -> Option<&mut Prize> {
        self.prizes.iter_mut().find(|p| p.id == id)
    }

    pub fn picked_prize(&self) -> Option<&Prize> {
        self.picked_prize_id.and_then(|id| self.prize(id))
    }

    pub fn clear_pick(&mut self) {
        self.picked_prize_id = None;
        self.winner.clear();
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppState {
    pub music_url: String,
    sections: [Section; 3],
    next_prize_id: u64,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            music_url: String::new(),
            sections: Default::default(),
            next_prize_id: 1,
        }
    }
}

impl AppState {
    pub fn section(&self, rarity: Rarity) -> &Section {
        &self.sections[rarity.index()]
    }

    pub fn section_mut(&mut self, rarity: Rarity) -> &mut Section {
        &mut self.sections[rarity.index()]
    }

    pub fn sections(&self) -> impl Iterator<Item = (Rarity, &Section)> {
        Rarity::ALL.into_iter().map(move |r| (r, self.section(r)))
    }

    /// Newest prizes go first, as in the section list.
    pub fn add_prize(&mut self, rarity: Rarity, prize: NewPrize) -> Result<PrizeId, Notice> {
        let name = prize.name.trim();
        if name.is_empty() {
            return Err(Notice::EmptyPrizeName);
        }
        let id = PrizeId(self.next_prize_id);
        self.next_prize_id += 1;
        self.section_mut(rarity).prizes.insert(
            0,
            Prize {
                id,
                name: name.to_owned(),
                description: prize.description.trim().to_owned(),
                image_url: prize.image_url.trim().to_owned(),
                played: false,
                winner: String::new(),
            },
        );
        info!(%rarity, %id, "prize added");
        Ok(id)
    }

    pub fn remove_prize(&mut self, rarity: Rarity, id: PrizeId) -> Option<Prize> {
        let section = self.section_mut(rarity);
        let pos = section.prizes.iter().position(|p| p.id == id)?;
        let removed = section.prizes.remove(pos);
        if section.picked_prize_id == Some(id) {
            section.clear_pick();
        }
        info!(%rarity, %id, "prize removed");
        Some(removed)
    }

    pub fn add_players(&mut self, rarity: Rarity, text: &str) -> Result<usize, Notice> {
        let nicks = normalize_nicks(text);
        if nicks.is_empty() {
            return Err(Notice::NoNicknames);
        }
        let added = nicks.len();
        self.section_mut(rarity).players.extend(nicks);
        info!(%rarity, added, "players added");
        Ok(added)
    }

    pub fn remove_player(&mut self, rarity: Rarity, index: usize) -> Option<String> {
        let players = &mut self.section_mut(rarity).players;
        if index >= players.len() {
            return None;
        }
        Some(players.remove(index))
    }

    pub fn set_music_url(&mut self, url: &str) {
        self.music_url = url.trim().to_owned();
    }

    pub fn reset(&mut self) {
        *self = AppState::default();
        info!("raffle state reset");
    }

    /// Every prize across sections, unplayed first, otherwise in section order.
    pub fn gallery(&self) -> Vec<(Rarity, &Prize)> {
        self.sections()
            .flat_map(|(r, s)| s.prizes.iter().map(move |p| (r, p)))
            .sorted_by_key(|(_, p)| p.played)
            .collect()
    }
}

/// One nickname per line, trimmed, with a single leading `@` removed.
pub fn normalize_nicks(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.strip_prefix('@').unwrap_or(line))
        .filter(|nick| !nick.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn new_prize(name: &str) -> NewPrize {
        NewPrize {
            name: name.to_owned(),
            ..NewPrize::default()
        }
    }

    #[test]
    fn add_prize__inserts_trimmed_prize_at_front() {
        // given
        let mut state = AppState::default();
        state.add_prize(Rarity::Rare, new_prize("Mug")).unwrap();

        // when
        let id = state
            .add_prize(
                Rarity::Rare,
                NewPrize {
                    name: "  Hoodie ".into(),
                    description: " warm ".into(),
                    image_url: "".into(),
                },
            )
            .unwrap();

        // then
        let first = &state.section(Rarity::Rare).prizes[0];
        assert_eq!(first.id, id);
        assert_eq!(first.name, "Hoodie");
        assert_eq!(first.description, "warm");
        assert!(!first.played);
        assert_eq!(state.section(Rarity::Rare).prizes.len(), 2);
    }

    #[test]
    fn add_prize__rejects_blank_name() {
        let mut state = AppState::default();

        let res = state.add_prize(Rarity::Exclusive, new_prize("   "));

        assert_eq!(res, Err(Notice::EmptyPrizeName));
        assert!(state.section(Rarity::Exclusive).prizes.is_empty());
    }

    #[test]
    fn add_prize__allocates_distinct_ids_across_sections() {
        let mut state = AppState::default();

        let a = state.add_prize(Rarity::Rare, new_prize("A")).unwrap();
        let b = state.add_prize(Rarity::VeryRare, new_prize("A")).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn remove_prize__clears_pick_and_winner_when_picked_prize_removed() {
        // given
        let mut state = AppState::default();
        let id = state.add_prize(Rarity::Rare, new_prize("Mug")).unwrap();
        let section = state.section_mut(Rarity::Rare);
        section.picked_prize_id = Some(id);
        section.winner = "bob".into();

        // when
        let removed = state.remove_prize(Rarity::Rare, id);

        // then
        assert_eq!(removed.map(|p| p.name), Some("Mug".to_owned()));
        let section = state.section(Rarity::Rare);
        assert_eq!(section.picked_prize_id, None);
        assert!(section.winner.is_empty());
    }

    #[test]
    fn remove_prize__keeps_pick_when_other_prize_removed() {
        let mut state = AppState::default();
        let keep = state.add_prize(Rarity::Rare, new_prize("Keep")).unwrap();
        let drop = state.add_prize(Rarity::Rare, new_prize("Drop")).unwrap();
        state.section_mut(Rarity::Rare).picked_prize_id = Some(keep);

        state.remove_prize(Rarity::Rare, drop);

        assert_eq!(state.section(Rarity::Rare).picked_prize_id, Some(keep));
    }

    #[test]
    fn normalize_nicks__trims_strips_at_and_drops_blank_lines() {
        let text = "  @alice \r\n\n bob\n@@carol\n   \n@\n";

        let nicks = normalize_nicks(text);

        assert_eq!(nicks, vec!["alice", "bob", "@carol"]);
    }

    #[test]
    fn add_players__appends_in_order_and_allows_duplicates() {
        let mut state = AppState::default();
        state.add_players(Rarity::VeryRare, "x\ny").unwrap();

        let added = state.add_players(Rarity::VeryRare, "x").unwrap();

        assert_eq!(added, 1);
        assert_eq!(state.section(Rarity::VeryRare).players, vec!["x", "y", "x"]);
    }

    #[test]
    fn add_players__rejects_text_without_nicknames() {
        let mut state = AppState::default();

        let res = state.add_players(Rarity::Rare, "\n  \n");

        assert_eq!(res, Err(Notice::NoNicknames));
    }

    #[test]
    fn remove_player__ignores_out_of_range_index() {
        let mut state = AppState::default();
        state.add_players(Rarity::Rare, "x\ny").unwrap();

        assert_eq!(state.remove_player(Rarity::Rare, 5), None);
        assert_eq!(state.remove_player(Rarity::Rare, 0), Some("x".to_owned()));
        assert_eq!(state.section(Rarity::Rare).players, vec!["y"]);
    }

    #[test]
    fn gallery__lists_played_prizes_last() {
        // given
        let mut state = AppState::default();
        let a = state.add_prize(Rarity::Rare, new_prize("A")).unwrap();
        state.add_prize(Rarity::VeryRare, new_prize("B")).unwrap();
        state.add_prize(Rarity::Exclusive, new_prize("C")).unwrap();
        let prize = state.section_mut(Rarity::Rare).prize_mut(a).unwrap();
        prize.played = true;
        prize.winner = "zed".into();

        // when
        let names: Vec<_> = state.gallery().iter().map(|(_, p)| p.name.clone()).collect();

        // then
        assert_eq!(names, vec!["B", "C", "A"]);
    }

    #[test]
    fn reset__restores_default_state() {
        let mut state = AppState::default();
        state.add_prize(Rarity::Rare, new_prize("A")).unwrap();
        state.add_players(Rarity::Rare, "x").unwrap();
        state.set_music_url(" song.ogg ");

        state.reset();

        assert_eq!(state, AppState::default());
    }

    #[test]
    fn rarity__next_and_prev_wrap_around() {
        assert_eq!(Rarity::Exclusive.next(), Rarity::Rare);
        assert_eq!(Rarity::Rare.prev(), Rarity::Exclusive);
        assert_eq!(Rarity::Rare.next(), Rarity::VeryRare);
    }
}
