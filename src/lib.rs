// Library surface, shared by the server binary and the integration tests

pub mod abuse;
pub mod bot;
pub mod config;
pub mod error;
pub mod game;
pub mod protocol;
pub mod state;
pub mod types;
pub mod words;
pub mod ws;
