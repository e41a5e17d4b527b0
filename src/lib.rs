//! `deepdelve`: a turn-based, tile-based dungeon-crawl engine.
//!
//! An entity-component [`world`], a deterministic [`rng`], [`map`]
//! generation and [`fov`], an energy-driven [`scheduler`] over an [`action`]
//! library dispatched by [`ai`] policies, a [`combat`] and [`effects`]
//! pipeline, an [`inventory`] and [`message`] log, a [`state`] machine
//! tying it all to external input, and [`config`]/[`save`] for the ambient
//! configuration/persistence concerns a renderer-free engine still owns.
//!
//! An ASCII renderer, input decoding, and tilesheet loading are external
//! collaborators consuming the data this crate produces; none of them are
//! depended on here.

pub mod action;
pub mod ai;
pub mod app;
pub mod combat;
pub mod config;
pub mod content;
pub mod dice;
pub mod effects;
pub mod error;
pub mod fov;
pub mod inventory;
pub mod map;
pub mod math;
pub mod message;
pub mod pathfind;
pub mod rng;
pub mod save;
pub mod scheduler;
pub mod state;
pub mod world;

pub use app::App;
pub use error::{GameError, GameResult};
pub use world::World;
