//! Crate level error aggregating the failures of every component.

use crate::{
    annotation::{IriError, ResolutionError, StoreError},
    config::ConfigError,
    curation::ExclusionError,
    search::SearchError,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Exclusion(#[from] ExclusionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Iri(#[from] IriError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
