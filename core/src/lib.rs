//! Core of the content-site idle game.
//!
//! A `SaveSlot` holds one site's state. `SaveSlot::update` replays every
//! in-game day since the slot was last touched; `command` mutates the slot
//! on the player's behalf; `store` reads and writes slot documents through
//! the tagged `registry` and the `value` codec.

pub mod boost;
pub mod clock;
pub mod command;
pub mod engine;
pub mod error;
pub mod event;
pub mod geo;
pub mod registry;
pub mod slot;
pub mod store;
pub mod transaction;
pub mod types;
pub mod value;

pub use boost::{Advertisement, AnyBoost, Boost, CdnSetup, Channels, Friends};
pub use engine::{SessionState, UnaffordableWarning, UpdateOutcome};
pub use error::{SimError, SimResult};
pub use slot::SaveSlot;
pub use transaction::Transaction;
