//! Máscara de exclusión por slit.
//!
//! `MaskVector` guarda un booleano por slit (`true` = excluida). Las etapas
//! de calibración de longitud de onda y de tilts pueden ampliar la máscara;
//! la combinación es un OR elemento a elemento, por lo que la exclusión es
//! monótona no decreciente a lo largo del pipeline.

use serde::{Deserialize, Serialize};

use crate::errors::CalibError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaskVector(Vec<bool>);

impl MaskVector {
    /// Máscara sin exclusiones para `slit_count` slits.
    pub fn clear(slit_count: usize) -> Self {
        Self(vec![false; slit_count])
    }

    pub fn from_flags(flags: Vec<bool>) -> Self {
        Self(flags)
    }

    /// Máscara con las posiciones indicadas marcadas como excluidas.
    pub fn with_excluded(slit_count: usize, excluded: &[usize]) -> Self {
        let mut flags = vec![false; slit_count];
        for &i in excluded {
            if let Some(f) = flags.get_mut(i) {
                *f = true;
            }
        }
        Self(flags)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn flags(&self) -> &[bool] {
        &self.0
    }

    pub fn is_excluded(&self, slit: usize) -> bool {
        self.0.get(slit).copied().unwrap_or(false)
    }

    pub fn excluded(&self) -> Vec<usize> {
        self.0.iter().enumerate().filter(|(_, f)| **f).map(|(i, _)| i).collect()
    }

    pub fn excluded_count(&self) -> usize {
        self.0.iter().filter(|f| **f).count()
    }

    /// `true` si toda posición excluida en `other` también lo está aquí.
    pub fn is_superset_of(&self, other: &MaskVector) -> bool {
        self.len() == other.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| *a || !*b)
    }
}

/// OR elemento a elemento. Función pura: no modifica los operandos.
///
/// Una diferencia de longitudes indica que la geometría de slits se
/// reconstruyó sin resetear la máscara y se reporta como `ShapeMismatch`.
pub fn merge(existing: &MaskVector, incoming: &MaskVector) -> Result<MaskVector, CalibError> {
    if existing.len() != incoming.len() {
        return Err(CalibError::ShapeMismatch { expected: existing.len(),
                                               found: incoming.len() });
    }
    Ok(MaskVector(existing.0.iter().zip(incoming.0.iter()).map(|(a, b)| *a || *b).collect()))
}

/// Acumulador con dueño único (un detector dentro de un bucket de
/// configuración). Sólo el engine lo modifica, bajo el lock del bucket.
#[derive(Debug, Clone, Default)]
pub struct MaskAccumulator {
    current: Option<MaskVector>,
    resets: u32,
}

impl MaskAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reinicia a todo-false. Se invoca al construir/cargar la geometría de
    /// slits.
    pub fn reset(&mut self, slit_count: usize) -> &MaskVector {
        self.resets += 1;
        self.current.insert(MaskVector::clear(slit_count))
    }

    /// Combina `incoming` con la máscara actual. Si aún no hay máscara
    /// sembrada (geometría suministrada explícitamente) `incoming` pasa a ser
    /// la semilla.
    pub fn merge(&mut self, incoming: &MaskVector) -> Result<&MaskVector, CalibError> {
        let next = match &self.current {
            Some(existing) => merge(existing, incoming)?,
            None => incoming.clone(),
        };
        Ok(self.current.insert(next))
    }

    pub fn current(&self) -> Option<&MaskVector> {
        self.current.as_ref()
    }

    /// Número de resets recibidos (debería ser 1 por detector y configuración).
    pub fn resets(&self) -> u32 {
        self.resets
    }
}
