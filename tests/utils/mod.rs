pub mod fixtures;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use fixtures::{game, player, stat, team, LeagueBuilder};
#[allow(unused_imports)]
pub use mocks::{RecordingEventSink, UnreachableStore};
pub use setup::TestSetup;
