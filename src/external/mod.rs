pub mod generation;
pub mod sms;
pub mod wechat;

pub use generation::*;
pub use sms::*;
pub use wechat::*;
