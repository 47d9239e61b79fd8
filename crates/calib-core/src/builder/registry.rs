use std::collections::HashMap;
use std::sync::Arc;

use crate::model::ArtifactTag;

use super::Builder;

/// Un builder por tag. Registrar dos veces el mismo tag reemplaza al anterior.
#[derive(Clone, Default)]
pub struct BuilderRegistry {
    builders: HashMap<ArtifactTag, Arc<dyn Builder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<B: Builder + 'static>(&mut self, builder: B) -> Option<Arc<dyn Builder>> {
        let tag = builder.tag();
        self.builders.insert(tag, Arc::new(builder))
    }

    pub fn register_arc(&mut self, builder: Arc<dyn Builder>) -> Option<Arc<dyn Builder>> {
        let tag = builder.tag();
        self.builders.insert(tag, builder)
    }

    pub fn get(&self, tag: ArtifactTag) -> Option<Arc<dyn Builder>> {
        self.builders.get(&tag).cloned()
    }

    pub fn contains(&self, tag: ArtifactTag) -> bool {
        self.builders.contains_key(&tag)
    }

    /// Tags registrados en orden de pipeline.
    pub fn tags(&self) -> Vec<ArtifactTag> {
        let mut tags: Vec<ArtifactTag> = self.builders.keys().copied().collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderRegistry").field("tags", &self.tags()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildContext, BuildOutput};
    use crate::errors::BuildError;
    use crate::model::Artifact;
    use serde_json::json;

    struct Fixed(ArtifactTag);

    impl Builder for Fixed {
        fn tag(&self) -> ArtifactTag {
            self.0
        }

        fn build(&self, _ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
            Ok(BuildOutput::new(Artifact::new(self.0, json!(null))))
        }
    }

    #[test]
    fn register_replaces_and_orders_tags() {
        let mut reg = BuilderRegistry::new();
        assert!(reg.register(Fixed(ArtifactTag::Arc)).is_none());
        reg.register(Fixed(ArtifactTag::Bias));
        assert!(reg.register(Fixed(ArtifactTag::Arc)).is_some());
        assert_eq!(reg.tags(), vec![ArtifactTag::Bias, ArtifactTag::Arc]);
        assert!(reg.contains(ArtifactTag::Bias));
        assert!(reg.get(ArtifactTag::TiltMap).is_none());
    }
}
