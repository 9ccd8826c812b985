pub mod add;
pub mod bundle;
pub mod list;
pub mod prefs;
pub mod search;
pub mod setup;
pub mod ui;
pub mod watch;
