//! Falling-block puzzle engine: grid model, piece catalog, move validation,
//! row clearing and the tick-driven game state machine.

pub mod config;
pub mod game;
pub mod grid;
pub mod line_clear;
pub mod piece;
pub mod validator;
