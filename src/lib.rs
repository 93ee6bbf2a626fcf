//! Turn-based roguelike simulation core: dungeon generation, visibility,
//! pathfinding, status effects, enemy behaviour and the player command
//! surface. Drawing is left to the caller.

pub mod ai;
pub mod config;
pub mod data;
pub mod effects;
pub mod engine;
pub mod entity;
pub mod error;
pub mod floor;
pub mod map;
pub mod scripted_input;
pub mod site;

pub use config::EngineConfig;
pub use engine::{Command, Direction, Engine, RunOutcome};
pub use error::{EngineError, Result};
