//! Contrato de builders (colaboradores externos, uno por tipo de artifact).
//!
//! El core nunca inspecciona el payload: sólo decide *si* llamar a `load`,
//! `build` y `persist`, y con qué contexto. El fingerprint lo calcula el core
//! y se entrega ya resuelto en `BuildContext`.

mod registry;

pub use registry::BuilderRegistry;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{BuildError, PersistError};
use crate::exposure::{ExposureRow, FrameType};
use crate::mask::MaskVector;
use crate::model::{Artifact, ArtifactTag, ScopeKey};
use crate::settings::Settings;

/// Artifacts upstream ya resueltos (cache o override explícito) para un build.
#[derive(Debug, Clone, Default)]
pub struct Prerequisites {
    inner: BTreeMap<ArtifactTag, Arc<Artifact>>,
}

impl Prerequisites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, artifact: Arc<Artifact>) {
        self.inner.insert(artifact.tag, artifact);
    }

    pub fn get(&self, tag: ArtifactTag) -> Option<&Artifact> {
        self.inner.get(&tag).map(|a| a.as_ref())
    }

    /// Igual que `get` pero como error de entrada para el builder.
    pub fn require(&self, tag: ArtifactTag) -> Result<&Artifact, BuildError> {
        self.get(tag)
            .ok_or_else(|| BuildError::InvalidInput(format!("prerequisite {tag} not provided")))
    }

    pub fn contains(&self, tag: ArtifactTag) -> bool {
        self.inner.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// (tag, hash) ordenados por tag; entra en el fingerprint.
    pub fn hashes(&self) -> Vec<(ArtifactTag, String)> {
        self.inner.iter().map(|(t, a)| (*t, a.hash.clone())).collect()
    }
}

/// Entradas crudas resueltas desde la tabla de exposiciones.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub frame: Option<FrameType>,
    pub files: Vec<String>,
    /// Primera exposición del tipo pedido (metadatos como binning).
    pub representative: Option<ExposureRow>,
}

impl RawInputs {
    pub fn none() -> Self {
        Self::default()
    }

    /// Falla con `NoRawInputs` si el set está vacío.
    pub fn require_files(&self) -> Result<&[String], BuildError> {
        match self.frame {
            Some(frame) if self.files.is_empty() => Err(BuildError::NoRawInputs { frame }),
            _ => Ok(&self.files),
        }
    }

    pub fn require_representative(&self) -> Result<&ExposureRow, BuildError> {
        let frame = self.frame.unwrap_or(FrameType::Science);
        self.representative
            .as_ref()
            .ok_or(BuildError::MissingExposure { frame })
    }
}

/// Todo lo que un builder recibe en una invocación.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub scope: &'a ScopeKey,
    pub settings: &'a Settings,
    pub prerequisites: &'a Prerequisites,
    pub raw: &'a RawInputs,
    /// Máscara actual del detector (si existe); la usa p.ej. el tilt map.
    pub mask: Option<&'a MaskVector>,
    pub fingerprint: &'a str,
}

/// Resultado de `load` o `build`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub artifact: Artifact,
    /// Regiones excluidas descubiertas por esta etapa.
    pub mask: Option<MaskVector>,
    /// Artifacts hermanos producidos en la misma llamada (p.ej. SlitProfile).
    pub companions: Vec<Artifact>,
    /// Número de slits; obligatorio para SlitGeometry.
    pub slit_count: Option<usize>,
}

impl BuildOutput {
    pub fn new(artifact: Artifact) -> Self {
        Self { artifact,
               mask: None,
               companions: Vec::new(),
               slit_count: None }
    }

    pub fn with_mask(mut self, mask: MaskVector) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_companion(mut self, artifact: Artifact) -> Self {
        self.companions.push(artifact);
        self
    }

    pub fn with_slit_count(mut self, slit_count: usize) -> Self {
        self.slit_count = Some(slit_count);
        self
    }
}

/// Contrato de un builder. Implementaciones deben ser `Send + Sync`: el
/// orquestador las comparte entre workers.
pub trait Builder: Send + Sync {
    fn tag(&self) -> ArtifactTag;

    /// Subconjunto de settings relevante para el fingerprint.
    fn settings_subset(&self, _settings: &Settings) -> Value {
        Value::Null
    }

    /// Intenta cargar un artifact persistido con el mismo fingerprint.
    fn load(&self, _ctx: &BuildContext<'_>) -> Result<Option<BuildOutput>, BuildError> {
        Ok(None)
    }

    /// Calcula el artifact desde las entradas crudas.
    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError>;

    /// Persiste un artifact recién construido. Devuelve `true` si escribió.
    fn persist(&self, _ctx: &BuildContext<'_>, _output: &BuildOutput) -> Result<bool, PersistError> {
        Ok(false)
    }
}

impl<B: Builder + ?Sized> Builder for Arc<B> {
    fn tag(&self) -> ArtifactTag {
        (**self).tag()
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        (**self).settings_subset(settings)
    }

    fn load(&self, ctx: &BuildContext<'_>) -> Result<Option<BuildOutput>, BuildError> {
        (**self).load(ctx)
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        (**self).build(ctx)
    }

    fn persist(&self, ctx: &BuildContext<'_>, output: &BuildOutput) -> Result<bool, PersistError> {
        (**self).persist(ctx, output)
    }
}
