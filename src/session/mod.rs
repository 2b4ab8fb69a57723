//! Browser session subsystem.

pub mod store;

pub use store::{Notice, NoticeLevel, SessionRecord, SessionStore};
