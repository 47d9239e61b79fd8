use chrono::Utc;
use parking_lot::Mutex;

use super::{CalibEvent, CalibEventKind};

/// Almacenamiento de eventos append-only, compartido entre workers.
pub trait EventStore: Send + Sync {
    /// Agrega un evento y devuelve el evento completo (con seq y ts).
    fn append_kind(&self, configuration: &str, kind: CalibEventKind) -> CalibEvent;
    /// Todos los eventos en orden de append.
    fn list(&self) -> Vec<CalibEvent>;
    /// Eventos de una configuración (orden ascendente por seq).
    fn list_for(&self, configuration: &str) -> Vec<CalibEvent> {
        self.list().into_iter().filter(|e| e.configuration == configuration).collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: Mutex<Vec<CalibEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&self, configuration: &str, kind: CalibEventKind) -> CalibEvent {
        let mut vec = self.inner.lock();
        let seq = vec.len() as u64;
        let ev = CalibEvent { seq,
                              configuration: configuration.to_string(),
                              kind,
                              ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }

    fn list(&self) -> Vec<CalibEvent> {
        self.inner.lock().clone()
    }
}
