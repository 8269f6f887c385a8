mod group_service;
mod player_service;
mod session_service;

pub use group_service::{CreateGroupOutcome, GroupService};
pub use player_service::PlayerService;
pub use session_service::SessionService;
