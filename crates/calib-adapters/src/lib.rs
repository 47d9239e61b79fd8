//! calib-adapters: builders de referencia para cada tipo de artifact.
//!
//! Este crate provee:
//! - Payloads tipados (`payloads`) declarados con `typed_artifact!`.
//! - Un builder por etapa (`builders`). Los algoritmos numéricos reales
//!   quedan fuera: los builders producen payloads deterministas a nivel de
//!   metadatos (archivos, forma, binning, calidad por slit) derivados con
//!   sha2, suficientes para ejercitar el orquestador de punta a punta.
//! - `standard_registry` / `store_backed_registry` para armar el conjunto
//!   completo, opcionalmente envuelto en el store de masters.

pub mod builders;
pub mod digest;
pub mod payloads;

pub use builders::{standard_registry, store_backed_registry, ArcBuilder, BadPixelMaskBuilder, BiasBuilder,
                   FlatBuilder, PixelLocationBuilder, SlitTraceBuilder, TiltBuilder, WaveCalibBuilder};
