//! Cache en memoria de artifacts, particionado por configuración.
//!
//! Cada configuración tiene su propio `Bucket` detrás de un `Mutex`
//! exclusivo. El `DashMap` exterior sólo se toca para obtener (o crear) el
//! `Arc` del bucket; el guard del shard se suelta antes de bloquear el bucket,
//! así un build largo en una configuración no frena a las demás.

mod bucket;

pub use bucket::{Bucket, CacheKey};

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

pub type SharedBucket = Arc<Mutex<Bucket>>;

#[derive(Debug, Default)]
pub struct ArtifactCache {
    buckets: DashMap<String, SharedBucket>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket de la configuración, creado vacío si no existía.
    pub fn bucket(&self, configuration: &str) -> SharedBucket {
        if let Some(existing) = self.buckets.get(configuration) {
            return existing.value().clone();
        }
        self.buckets.entry(configuration.to_string()).or_default().value().clone()
    }

    /// Bucket existente (sin crearlo).
    pub fn peek(&self, configuration: &str) -> Option<SharedBucket> {
        self.buckets.get(configuration).map(|b| b.value().clone())
    }

    /// Descarta el bucket completo. Devuelve `true` si existía.
    pub fn remove(&self, configuration: &str) -> bool {
        self.buckets.remove(configuration).is_some()
    }

    pub fn configurations(&self) -> Vec<String> {
        let mut out: Vec<String> = self.buckets.iter().map(|e| e.key().clone()).collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
