pub mod auth;
pub mod character;
pub mod job;
pub mod user;

pub use auth::auth_config;
pub use character::character_config;
pub use job::job_config;
pub use user::user_config;
