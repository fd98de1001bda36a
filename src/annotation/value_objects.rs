use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use oxrdf::NamedNode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between a URI stem and its version counter.
const VERSION_SEPARATOR: char = '_';

/// Value object ensuring that supplied text represents a valid IRI.
///
/// Annotation, study, biological entity and semantic tag identifiers are all
/// carried as [`Iri`] values so every entity is addressed canonically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iri {
    value: String,
}

impl Iri {
    /// Validates and constructs a new [`Iri`] value object.
    pub fn new(value: impl Into<String>) -> Result<Self, IriError> {
        let value = value.into();
        NamedNode::new(value.as_str()).map_err(|_| IriError::Invalid {
            value: value.clone(),
        })?;
        Ok(Self { value })
    }

    /// Returns the underlying textual representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Byte offset just after the last `/` or `#`, i.e. where the local name starts.
    fn local_name_start(&self) -> usize {
        self.value
            .rfind(|c| c == '/' || c == '#')
            .map_or(0, |index| index + 1)
    }

    /// Returns the local name of the IRI (everything after the last `/` or `#`).
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.value[self.local_name_start()..]
    }

    /// Returns the namespace of the IRI (everything up to and including the last `/` or `#`).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.value[..self.local_name_start()]
    }

    /// Returns the OBO style short identifier, e.g. `EFO_0000270` becomes `EFO:0000270`.
    #[must_use]
    pub fn short_form(&self) -> String {
        self.fragment().replacen(VERSION_SEPARATOR, ":", 1)
    }

    /// Returns the next candidate version of this IRI.
    ///
    /// Unversioned IRIs gain a `_1` suffix, versioned ones have their counter
    /// bumped. A trailing segment that is not numeric starts a fresh counter on
    /// `original`, which callers pass as the IRI the lookup started from.
    #[must_use]
    pub fn next_version(&self, original: &Iri) -> Iri {
        let fresh = || Iri {
            value: format!("{}{VERSION_SEPARATOR}1", original.value),
        };
        let Some((stem, counter)) = self.value.rsplit_once(VERSION_SEPARATOR) else {
            return fresh();
        };
        match counter.parse::<u64>() {
            Ok(number) => Iri {
                value: format!("{stem}{VERSION_SEPARATOR}{}", number + 1),
            },
            Err(_) => fresh(),
        }
    }
}

impl Display for Iri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for Iri {
    type Err = IriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl TryFrom<String> for Iri {
    type Error = IriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Iri> for String {
    fn from(iri: Iri) -> Self {
        iri.value
    }
}

/// Errors produced when validating an [`Iri`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IriError {
    /// The provided text could not be parsed as an IRI.
    #[error("invalid IRI: {value}")]
    Invalid { value: String },
}
