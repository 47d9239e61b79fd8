//! Modelos neutrales (ScopeKey, Artifact, fingerprint, artifacts tipados).

pub mod artifact;
pub mod fingerprint;
pub mod scope;
pub mod typed_artifact;

pub use artifact::{Artifact, ArtifactTag};
pub use fingerprint::ArtifactFingerprintInput;
pub use scope::{Scope, ScopeKey};
pub use typed_artifact::{ArtifactCodecError, ArtifactSpec};
