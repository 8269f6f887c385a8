pub mod cli;
pub mod error;
pub mod state;
pub mod tui;
