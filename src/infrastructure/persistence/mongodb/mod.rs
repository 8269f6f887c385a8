//! MongoDB persistence implementation

mod connection;
mod group_repo;
mod player_repo;

pub use connection::{init_mongodb, MongoConnection};
pub use group_repo::MongoGroupRepository;
pub use player_repo::MongoPlayerRepository;

/// Escape regex metacharacters so user input matches literally
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
