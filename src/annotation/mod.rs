//! Annotation versioning domain.
//!
//! The module holds the annotation aggregate, the facet comparison rules used
//! to detect modified annotations, and the resolver that decides whether an
//! incoming annotation is novel, already current or a successor of a stored
//! version. Persistence is abstracted behind [`AnnotationStore`] so the
//! resolution logic stays independent from any concrete triple store.

pub mod entities;
pub mod memory;
pub mod modification;
pub mod repositories;
pub mod resolver;
pub mod scheduler;
pub mod value_objects;

pub use entities::{
    Annotation, AnnotationProvenance, AnnotationSource, BiologicalEntity, Evidence, Property,
    SourceKind, Study, UNTYPED,
};
pub use memory::InMemoryAnnotationStore;
pub use modification::{get_modification, is_updated, FacetReport, Modification};
pub use repositories::{AnnotationStore, StoreError, StoreHandle};
pub use resolver::{
    AnnotationResolver, ContextLocator, LocatorStrategy, ModifiedAnnotationLocator, TagLocator,
};
pub use scheduler::{ResolutionError, ResolutionScheduler};
pub use value_objects::{Iri, IriError};
