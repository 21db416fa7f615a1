pub mod content;
pub mod tags;
pub mod users;
pub mod votes;
