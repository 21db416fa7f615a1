pub mod badge;
pub mod ranking;
pub mod tag;
pub mod user;
pub mod vote;

pub use badge::*;
pub use ranking::*;
pub use tag::*;
pub use user::*;
pub use vote::*;
