// Event distribution for statistics writes
//
// Write paths publish through the StatsEventSink trait; the EventBus fans
// events out to per-topic broadcast channels.

pub use bus::{EventBus, StatsEventSink};
pub use events::StatsEvent;

mod bus;
mod events;
