pub mod audio;

pub mod catalogue;

pub mod error;

pub mod model;

pub mod motion;

pub mod orchestrator;

pub mod profile;

pub mod raffle;

pub mod selector;

pub mod tape;

pub mod test_helpers;

pub use error::{
    Notice,
    Result,
    SpinError,
};
