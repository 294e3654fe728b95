//! Domain model for the narrative engine.

pub mod aggregates;
pub mod audit;
pub mod commands;
pub mod effects;
pub mod events;
pub mod generation;
pub mod timeline;
pub mod world;
