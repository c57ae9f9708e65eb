pub mod auth;
pub mod character;
pub mod common;
pub mod job;
pub mod pagination;
pub mod user;

pub use auth::*;
pub use character::*;
pub use common::*;
pub use job::*;
pub use pagination::*;
pub use user::*;
