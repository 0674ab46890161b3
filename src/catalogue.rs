//! Seeding the raffle from a prepared JSON file.

use crate::model::{
    AppState,
    NewPrize,
    Rarity,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::Deserialize;
use std::{
    fmt,
    fs,
    path::Path,
};
use tracing::{
    info,
    warn,
};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalogue {
    #[serde(default)]
    pub music_url: String,
    #[serde(default)]
    pub sections: CatalogueSections,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueSections {
    #[serde(default)]
    pub rare: CatalogueSection,
    #[serde(default)]
    pub very_rare: CatalogueSection,
    #[serde(default)]
    pub exclusive: CatalogueSection,
}

impl CatalogueSections {
    pub fn get(&self, rarity: Rarity) -> &CatalogueSection {
        match rarity {
            Rarity::Rare => &self.rare,
            Rarity::VeryRare => &self.very_rare,
            Rarity::Exclusive => &self.exclusive,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CatalogueSection {
    #[serde(default)]
    pub prizes: Vec<CataloguePrize>,
    #[serde(default)]
    pub players: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CataloguePrize {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "description")]
    pub desc: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ImportSummary {
    pub prizes: usize,
    pub players: usize,
    pub skipped: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Imported {} prizes and {} players", self.prizes, self.players)?;
        if self.skipped > 0 {
            write!(f, " ({} unnamed prizes skipped)", self.skipped)?;
        }
        Ok(())
    }
}

pub fn parse(data: &[u8]) -> Result<Catalogue> {
    serde_json::from_slice::<Catalogue>(data).wrap_err("Failed to parse catalogue JSON")
}

pub fn load(path: impl AsRef<Path>) -> Result<Catalogue> {
    let path = path.as_ref();
    let data = fs::read(path)
        .wrap_err_with(|| format!("Failed to read catalogue: {}", path.display()))?;
    parse(&data).wrap_err_with(|| format!("Invalid catalogue: {}", path.display()))
}

impl Catalogue {
    /// Adds everything through the regular state operations, keeping file order.
    pub fn apply(&self, state: &mut AppState) -> ImportSummary {
        let mut summary = ImportSummary::default();
        if !self.music_url.trim().is_empty() {
            state.set_music_url(&self.music_url);
        }
        for rarity in Rarity::ALL {
            let section = self.sections.get(rarity);
            // add_prize inserts at the front
            for prize in section.prizes.iter().rev() {
                let added = state.add_prize(
                    rarity,
                    NewPrize {
                        name: prize.name.clone(),
                        description: prize.desc.clone(),
                        image_url: prize.image_url.clone(),
                    },
                );
                match added {
                    Ok(_) => summary.prizes += 1,
                    Err(notice) => {
                        warn!(%rarity, %notice, "skipping catalogue prize");
                        summary.skipped += 1;
                    }
                }
            }
            if let Ok(added) = state.add_players(rarity, &section.players.join("\n")) {
                summary.players += added;
            }
        }
        info!(
            prizes = summary.prizes,
            players = summary.players,
            skipped = summary.skipped,
            "catalogue imported"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    const SAMPLE: &str = r#"{
        "musicUrl": "~/music/theme.ogg",
        "sections": {
            "rare": {
                "prizes": [
                    { "id": "p1", "name": "Mug", "desc": "Ceramic", "imageUrl": "", "played": false, "winner": "" },
                    { "name": "Sticker pack" }
                ],
                "players": ["@alice", "bob", "  "]
            },
            "exclusive": {
                "prizes": [{ "name": "   " }]
            }
        }
    }"#;

    #[test]
    fn apply__adds_prizes_in_file_order() {
        // given
        let catalogue = parse(SAMPLE.as_bytes()).unwrap();
        let mut state = AppState::default();

        // when
        let summary = catalogue.apply(&mut state);

        // then
        let names: Vec<_> = state
            .section(Rarity::Rare)
            .prizes
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Mug", "Sticker pack"]);
        assert_eq!(state.section(Rarity::Rare).prizes[0].description, "Ceramic");
        assert_eq!(state.section(Rarity::Rare).players, vec!["alice", "bob"]);
        assert_eq!(state.music_url, "~/music/theme.ogg");
        assert_eq!(
            summary,
            ImportSummary {
                prizes: 2,
                players: 2,
                skipped: 1
            }
        );
    }

    #[test]
    fn apply__leaves_missing_sections_empty() {
        let catalogue = parse(SAMPLE.as_bytes()).unwrap();
        let mut state = AppState::default();

        catalogue.apply(&mut state);

        assert!(state.section(Rarity::VeryRare).prizes.is_empty());
        assert!(state.section(Rarity::VeryRare).players.is_empty());
    }

    #[test]
    fn get__maps_camel_case_section_keys_to_rarities() {
        // given
        let json = r#"{ "sections": { "veryRare": { "players": ["@zed"] } } }"#;

        // when
        let catalogue = parse(json.as_bytes()).unwrap();

        // then
        assert_eq!(catalogue.sections.get(Rarity::VeryRare).players, vec!["@zed"]);
        assert!(catalogue.sections.get(Rarity::Rare).players.is_empty());
        assert!(catalogue.sections.get(Rarity::Exclusive).players.is_empty());
    }

    #[test]
    fn parse__rejects_malformed_json() {
        let res = parse(b"{ \"sections\": [");

        assert!(res.is_err());
    }

    #[test]
    fn import_summary__mentions_skipped_prizes() {
        let summary = ImportSummary {
            prizes: 3,
            players: 0,
            skipped: 2,
        };

        assert_eq!(
            summary.to_string(),
            "Imported 3 prizes and 0 players (2 unnamed prizes skipped)"
        );
    }
}
