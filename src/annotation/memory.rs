use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use tracing::debug;

use super::{
    entities::{Annotation, BiologicalEntity, Property, Study},
    repositories::{AnnotationStore, StoreError},
    value_objects::Iri,
};

/// Annotation store keeping every version in process memory.
///
/// Used for embedding and tests; lookups scan the full map.
#[derive(Debug, Default)]
pub struct InMemoryAnnotationStore {
    annotations: Mutex<BTreeMap<Iri, Annotation>>,
}

impl InMemoryAnnotationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `annotations`, later duplicates winning.
    #[must_use]
    pub fn with_annotations(annotations: impl IntoIterator<Item = Annotation>) -> Self {
        let annotations = annotations
            .into_iter()
            .map(|annotation| (annotation.uri().clone(), annotation))
            .collect();
        Self {
            annotations: Mutex::new(annotations),
        }
    }

    /// Number of stored versions.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.guard()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.guard()?.is_empty())
    }

    fn guard(&self) -> Result<MutexGuard<'_, BTreeMap<Iri, Annotation>>, StoreError> {
        self.annotations
            .lock()
            .map_err(|_| StoreError::backend("in-memory annotation store poisoned"))
    }

    fn select(
        &self,
        predicate: impl Fn(&Annotation) -> bool,
    ) -> Result<Vec<Annotation>, StoreError> {
        Ok(self
            .guard()?
            .values()
            .filter(|annotation| predicate(annotation))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnnotationStore for InMemoryAnnotationStore {
    type Error = StoreError;

    async fn read(&self, uri: &Iri) -> Result<Option<Annotation>, Self::Error> {
        Ok(self.guard()?.get(uri).cloned())
    }

    async fn read_by_property(&self, property: &Property) -> Result<Vec<Annotation>, Self::Error> {
        self.select(|annotation| annotation.property().matches_both_ways(property))
    }

    async fn read_by_semantic_tag(&self, tag: &Iri) -> Result<Vec<Annotation>, Self::Error> {
        self.select(|annotation| annotation.semantic_tags().contains(tag))
    }

    async fn read_by_study(&self, study: &Study) -> Result<Vec<Annotation>, Self::Error> {
        self.select(|annotation| {
            annotation.biological_entities().iter().any(|entity| {
                entity
                    .studies()
                    .iter()
                    .any(|candidate| candidate.uri() == study.uri())
            })
        })
    }

    async fn read_by_biological_entity(
        &self,
        entity: &BiologicalEntity,
    ) -> Result<Vec<Annotation>, Self::Error> {
        self.select(|annotation| {
            annotation
                .biological_entities()
                .iter()
                .any(|candidate| candidate.uri() == entity.uri())
        })
    }

    async fn create(&self, annotation: Annotation) -> Result<(), Self::Error> {
        let mut guard = self.guard()?;
        let uri = annotation.uri().clone();
        if guard.contains_key(&uri) {
            return Err(StoreError::already_exists(&uri));
        }
        debug!(annotation = %uri, "annotation_created");
        guard.insert(uri, annotation);
        Ok(())
    }

    async fn update(&self, annotation: Annotation) -> Result<(), Self::Error> {
        let mut guard = self.guard()?;
        let uri = annotation.uri().clone();
        let Some(existing) = guard.get_mut(&uri) else {
            return Err(StoreError::not_found(&uri));
        };
        *existing = annotation;
        debug!(annotation = %uri, "annotation_updated");
        Ok(())
    }

    async fn delete(&self, uri: &Iri) -> Result<(), Self::Error> {
        self.guard()?
            .remove(uri)
            .map_or_else(|| Err(StoreError::not_found(uri)), |_| Ok(()))
    }
}
