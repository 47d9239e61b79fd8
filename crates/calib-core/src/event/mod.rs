//! Log de eventos del orquestador y trait EventStore.

mod store;
mod types;

pub use store::{EventStore, InMemoryEventStore};
pub use types::{CalibEvent, CalibEventKind};
