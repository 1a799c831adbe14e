pub mod add;
pub mod common;
pub mod delete;
pub mod edit;
pub mod export;
pub mod list;
pub mod mood;
pub mod sync;
pub mod tip;
pub mod watch;
