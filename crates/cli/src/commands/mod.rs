//! CLI Commands

pub mod driver;
pub mod evidence;
pub mod logins;
pub mod results;
