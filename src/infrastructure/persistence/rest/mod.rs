//! Hosted backend persistence over its HTTP table API

pub mod client;
mod group_repo;
mod player_repo;

pub use client::RestClient;
pub use group_repo::RestGroupRepository;
pub use player_repo::RestPlayerRepository;
