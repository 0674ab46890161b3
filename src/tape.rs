use crate::selector;
use rand::Rng;

/// Buffer sizing for a spin tape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TapeConfig {
    /// Extra filler before the final card on top of the integrated distance.
    pub lead_margin: usize,
    /// Filler after the final card so the strip never runs dry once settled.
    pub trailing_cards: usize,
    /// Length of the repeated run shown for a single-choice spin.
    pub single_run_len: usize,
    /// Index the single-choice run is centred on.
    pub single_final_index: usize,
}

impl Default for TapeConfig {
    fn default() -> Self {
        TapeConfig {
            lead_margin: 25,
            trailing_cards: 60,
            single_run_len: 30,
            single_final_index: 15,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tape<T> {
    pub cards: Vec<T>,
    pub final_index: usize,
}

impl<T> Tape<T> {
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn final_card(&self) -> Option<&T> {
        self.cards.get(self.final_index)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Tape<U> {
        Tape {
            cards: self.cards.into_iter().map(f).collect(),
            final_index: self.final_index,
        }
    }
}

/// Random filler, then `final_item` at `ceil(cards_to_pass) + lead_margin`,
/// then more filler.
pub fn build_tape<T: Clone, R: Rng>(
    rng: &mut R,
    candidates: &[T],
    final_item: &T,
    cards_to_pass: f64,
    config: &TapeConfig,
) -> Tape<T> {
    let lead = cards_to_pass.max(0.0).ceil() as usize + config.lead_margin;
    let total = lead + 1 + config.trailing_cards;
    let mut cards = Vec::with_capacity(total);
    let mut filler = |cards: &mut Vec<T>, count: usize| {
        for _ in 0..count {
            let card = selector::pick(rng, candidates).unwrap_or(final_item);
            cards.push(card.clone());
        }
    };
    filler(&mut cards, lead);
    cards.push(final_item.clone());
    filler(&mut cards, config.trailing_cards);
    Tape {
        cards,
        final_index: lead,
    }
}

/// A run of one repeated item, used when motion would show nothing new.
pub fn single_item_tape<T: Clone>(item: &T, config: &TapeConfig) -> Tape<T> {
    let len = config.single_run_len.max(config.single_final_index + 1);
    Tape {
        cards: vec![item.clone(); len],
        final_index: config.single_final_index,
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
    fn build_tape__places_final_item_after_lead_buffer() {
        // given
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = vec!["a", "b", "c"];
        let config = TapeConfig::default();

        // when
        let tape = build_tape(&mut rng, &candidates, &"b", 40.2, &config);

        // then
        assert_eq!(tape.final_index, 41 + 25);
        assert_eq!(tape.len(), 41 + 25 + 1 + 60);
        assert_eq!(tape.final_card(), Some(&"b"));
        assert!(tape.cards.iter().all(|c| candidates.contains(c)));
    }

    #[test]
    fn build_tape__honours_custom_buffer_sizes() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = TapeConfig {
            lead_margin: 0,
            trailing_cards: 0,
            ..TapeConfig::default()
        };

        let tape = build_tape(&mut rng, &[1, 2], &2, 0.0, &config);

        assert_eq!(tape.cards, vec![2]);
        assert_eq!(tape.final_index, 0);
    }

    #[test]
    fn single_item_tape__centres_on_fixed_index() {
        let tape = single_item_tape(&"solo", &TapeConfig::default());

        assert_eq!(tape.len(), 30);
        assert_eq!(tape.final_index, 15);
        assert!(tape.cards.iter().all(|c| *c == "solo"));
    }

    #[test]
    fn single_item_tape__grows_run_to_cover_final_index() {
        let config = TapeConfig {
            single_run_len: 3,
            single_final_index: 10,
            ..TapeConfig::default()
        };

        let tape = single_item_tape(&'x', &config);

        assert_eq!(tape.len(), 11);
        assert_eq!(tape.final_card(), Some(&'x'));
    }
}
