use crate::model::Rarity;
use std::{
    fmt,
    io,
};

pub type Result<T, E = SpinError> = std::result::Result<T, E>;

/// User-facing rejections. None of these change state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Notice {
    NothingToSpin,
    SpinInProgress,
    NoAvailablePrizes,
    NoPrizePicked,
    PrizeUnavailable,
    EmptyRoster,
    EmptyPrizeName,
    NoNicknames,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Notice::NothingToSpin => "Nothing to spin",
            Notice::SpinInProgress => "A spin is already in progress",
            Notice::NoAvailablePrizes => "No available prizes in this section",
            Notice::NoPrizePicked => "Pick a prize first",
            Notice::PrizeUnavailable => "This prize is already played or unavailable",
            Notice::EmptyRoster => "Add some players first",
            Notice::EmptyPrizeName => "Enter a prize name",
            Notice::NoNicknames => "Paste at least one nickname",
        };
        f.write_str(text)
    }
}

#[derive(Debug)]
pub enum SpinError {
    /// A precondition failed; shown to the user as a dismissable notice.
    Rejected(Notice),
    /// The display surface has no place to show the tape for this section.
    MissingAnchor {
        rarity: Rarity,
        anchor: &'static str,
    },
    Io(io::Error),
}

impl SpinError {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            SpinError::Rejected(notice) => Some(*notice),
            _ => None,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, SpinError::MissingAnchor { .. })
    }
}

impl fmt::Display for SpinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinError::Rejected(notice) => write!(f, "{notice}"),
            SpinError::MissingAnchor { rarity, anchor } => {
                write!(f, "display error: {anchor} not found for {rarity} section")
            }
            SpinError::Io(err) => write!(f, "terminal error: {err}"),
        }
    }
}

impl std::error::Error for SpinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpinError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Notice> for SpinError {
    fn from(notice: Notice) -> Self {
        SpinError::Rejected(notice)
    }
}

impl From<io::Error> for SpinError {
    fn from(err: io::Error) -> Self {
        SpinError::Io(err)
    }
}
