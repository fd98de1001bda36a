//! Decides whether an incoming annotation is novel, current, or a successor.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    entities::{Annotation, UNTYPED},
    modification::{get_modification, is_updated},
    repositories::{StoreError, StoreHandle},
    value_objects::Iri,
};

/// Strategy looking up a stored annotation that `annotation` supersedes.
///
/// Only consulted when the store has no annotation under the incoming IRI.
#[async_trait]
pub trait ModifiedAnnotationLocator: Send + Sync {
    async fn find_modified(
        &self,
        store: &StoreHandle,
        annotation: &Annotation,
    ) -> Result<Option<Annotation>, StoreError>;
}

/// Configurable choice of [`ModifiedAnnotationLocator`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    /// Match on shared biological entities, see [`ContextLocator`].
    #[default]
    Context,
    /// Match on shared semantic tags and datasource, see [`TagLocator`].
    Tag,
}

impl LocatorStrategy {
    #[must_use]
    pub fn locator(self) -> Arc<dyn ModifiedAnnotationLocator> {
        match self {
            Self::Context => Arc::new(ContextLocator),
            Self::Tag => Arc::new(TagLocator),
        }
    }
}

/// Keeps the single candidate whose normalised property type equals the one
/// of `annotation`. Zero or several such candidates yield `None`.
fn single_same_type(
    annotation: &Annotation,
    candidates: BTreeMap<Iri, Annotation>,
) -> Option<Annotation> {
    let wanted = annotation.property().normalised_type();
    if wanted == UNTYPED {
        return None;
    }
    let mut matching = candidates.into_values().filter(|candidate| {
        candidate.uri() != annotation.uri()
            && candidate.property().property_type().is_some()
            && candidate.property().normalised_type() == wanted
    });
    let found = matching.next()?;
    matching.next().is_none().then_some(found)
}

/// Looks for the previous version among annotations on the same biological entities.
#[derive(Copy, Clone, Debug, Default)]
pub struct ContextLocator;

#[async_trait]
impl ModifiedAnnotationLocator for ContextLocator {
    async fn find_modified(
        &self,
        store: &StoreHandle,
        annotation: &Annotation,
    ) -> Result<Option<Annotation>, StoreError> {
        let mut candidates = BTreeMap::new();
        for entity in annotation.biological_entities() {
            for candidate in store.read_by_biological_entity(entity).await? {
                candidates.insert(candidate.uri().clone(), candidate);
            }
        }
        Ok(single_same_type(annotation, candidates))
    }
}

/// Looks for the previous version among annotations from the same datasource
/// sharing a semantic tag.
#[derive(Copy, Clone, Debug, Default)]
pub struct TagLocator;

#[async_trait]
impl ModifiedAnnotationLocator for TagLocator {
    async fn find_modified(
        &self,
        store: &StoreHandle,
        annotation: &Annotation,
    ) -> Result<Option<Annotation>, StoreError> {
        let source = &annotation.provenance().source;
        let mut candidates = BTreeMap::new();
        for tag in annotation.semantic_tags() {
            for candidate in store.read_by_semantic_tag(tag).await? {
                if candidate.provenance().source.same_datasource(source) {
                    candidates.insert(candidate.uri().clone(), candidate);
                }
            }
        }
        Ok(single_same_type(annotation, candidates))
    }
}

/// Resolves incoming annotations against the versions held by a store.
#[derive(Clone)]
pub struct AnnotationResolver {
    store: Arc<StoreHandle>,
    locator: Arc<dyn ModifiedAnnotationLocator>,
}

impl AnnotationResolver {
    pub fn new(store: Arc<StoreHandle>, locator: Arc<dyn ModifiedAnnotationLocator>) -> Self {
        Self { store, locator }
    }

    /// Builds a resolver using the configured locator strategy.
    pub fn from_strategy(store: Arc<StoreHandle>, strategy: LocatorStrategy) -> Self {
        Self::new(store, strategy.locator())
    }

    /// Returns a clone of the store handle.
    pub fn store(&self) -> Arc<StoreHandle> {
        Arc::clone(&self.store)
    }

    /// Resolves a single annotation.
    ///
    /// Returns `Ok(None)` when the store already holds an identical version,
    /// otherwise the annotation (or its freshly minted successor) to persist.
    /// Back-links on superseded versions are written through the store.
    pub async fn resolve(&self, annotation: Annotation) -> Result<Option<Annotation>, StoreError> {
        if let Some(stored) = self.store.read(annotation.uri()).await? {
            if !is_updated(&annotation, &stored) {
                debug!(annotation = %annotation.uri(), "annotation_current");
                return Ok(None);
            }

            let modification = get_modification(&annotation, &stored);
            let next_uri = self.store.increment_uri(annotation.uri()).await?;
            let replacement = annotation.successor(next_uri.clone());
            self.store.update(stored.replaced_with(&next_uri)).await?;
            info!(
                annotation = %annotation.uri(),
                replacement = %next_uri,
                modification = ?modification,
                "annotation_superseded"
            );
            return Ok(Some(replacement));
        }

        let Some(modified) = self
            .locator
            .find_modified(self.store.as_ref(), &annotation)
            .await?
        else {
            debug!(annotation = %annotation.uri(), "annotation_novel");
            return Ok(Some(annotation));
        };

        let annotation = annotation.replacing(modified.uri());
        let previous = modified.uri().clone();
        self.store
            .update(modified.replaced_with(annotation.uri()))
            .await?;
        info!(
            annotation = %annotation.uri(),
            replaces = %previous,
            "annotation_links_previous_version"
        );
        Ok(Some(annotation))
    }

    /// Drops annotations that carry no semantic tag.
    pub fn filter(annotations: impl IntoIterator<Item = Annotation>) -> Vec<Annotation> {
        annotations
            .into_iter()
            .filter(|annotation| !annotation.is_untagged())
            .collect()
    }
}
