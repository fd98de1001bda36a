use async_trait::async_trait;

use super::entities::{Annotation, BiologicalEntity, Property, Study};
use super::value_objects::Iri;

/// Upper bound on version lookups performed by [`AnnotationStore::increment_uri`].
const MAX_VERSION_PROBES: usize = 10_000;

/// Contract describing persistence responsibilities for annotation versions.
///
/// Every stored annotation version is addressed by its IRI. Versions are
/// immutable apart from their `replaced_by` edges, which [`AnnotationStore::update`]
/// rewrites when a successor is minted.
#[async_trait]
pub trait AnnotationStore {
    /// Associated error type allowing infrastructure specific failures.
    type Error: From<StoreError> + Send;

    /// Retrieves a stored annotation by identifier.
    ///
    /// Implementors must return `Ok(None)` when the annotation is missing.
    async fn read(&self, uri: &Iri) -> Result<Option<Annotation>, Self::Error>;

    /// Returns annotations whose property matches `property` both ways.
    async fn read_by_property(&self, property: &Property) -> Result<Vec<Annotation>, Self::Error>;

    /// Returns annotations linked to the given semantic tag.
    async fn read_by_semantic_tag(&self, tag: &Iri) -> Result<Vec<Annotation>, Self::Error>;

    /// Returns annotations on biological entities observed in `study`.
    async fn read_by_study(&self, study: &Study) -> Result<Vec<Annotation>, Self::Error>;

    /// Returns annotations on the given biological entity.
    async fn read_by_biological_entity(
        &self,
        entity: &BiologicalEntity,
    ) -> Result<Vec<Annotation>, Self::Error>;

    /// Persists a brand new annotation version.
    ///
    /// Implementors are expected to reject duplicate IRIs.
    async fn create(&self, annotation: Annotation) -> Result<(), Self::Error>;

    /// Replaces a stored annotation version.
    async fn update(&self, annotation: Annotation) -> Result<(), Self::Error>;

    /// Removes a stored annotation version.
    async fn delete(&self, uri: &Iri) -> Result<(), Self::Error>;

    /// Returns the first unused successor IRI of `uri`.
    ///
    /// Probes `uri_1`, `uri_2`, ... until the store reports no annotation under
    /// the candidate.
    async fn increment_uri(&self, uri: &Iri) -> Result<Iri, Self::Error> {
        let mut candidate = uri.next_version(uri);
        for _ in 0..MAX_VERSION_PROBES {
            if self.read(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            candidate = candidate.next_version(uri);
        }
        Err(StoreError::TooManyResults {
            query: format!("versions of {uri}"),
        }
        .into())
    }
}

/// Errors raised by annotation store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Attempted to create an annotation that already exists.
    #[error("annotation `{uri}` already exists")]
    AlreadyExists { uri: Iri },
    /// Referenced annotation was not found.
    #[error("annotation `{uri}` missing")]
    NotFound { uri: Iri },
    /// A lookup returned more results than the adapter is willing to materialise.
    #[error("too many results for {query}")]
    TooManyResults { query: String },
    /// The underlying storage backend failed.
    #[error("annotation store backend failure: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub(crate) fn already_exists(uri: &Iri) -> Self {
        Self::AlreadyExists { uri: uri.clone() }
    }

    pub(crate) fn not_found(uri: &Iri) -> Self {
        Self::NotFound { uri: uri.clone() }
    }

    /// Wraps an adapter specific failure.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Type alias simplifying store trait object usage inside the resolver.
pub type StoreHandle = dyn AnnotationStore<Error = StoreError> + Send + Sync + 'static;
