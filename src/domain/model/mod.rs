mod group;
mod player;
mod session;

pub use group::{merge_groups, validate_group_name, Group, GroupRecord, Membership, NewGroup};
pub use player::Player;
pub use session::Session;
