pub mod add;
pub mod common;
pub mod config;
pub mod day;
pub mod delete;
pub mod edit;
pub mod favorite;
pub mod list;
pub mod session_cmd;
pub mod streak;
pub mod sync;
