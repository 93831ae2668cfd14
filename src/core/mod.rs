// src/core/mod.rs — Core evolution engine

pub mod engine;
pub mod progress;
pub mod state;
pub mod summary;
pub mod types;
