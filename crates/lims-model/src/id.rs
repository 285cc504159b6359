//! Resource identifiers
//!
//! Provides [`LimsId`], the identifier value type used as the identity key
//! throughout the workspace, and [`EntityUri`], which parses a resource
//! locator into a kind segment, an id and an optional `state` suffix.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Errors produced while parsing identifiers or resource locators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Empty identifier
    #[error("identifier is empty")]
    Empty,

    /// Identifier contains a character reserved for locators
    #[error("identifier '{id}' contains reserved character '{ch}'")]
    ReservedCharacter { id: String, ch: char },

    /// Locator has no usable path segments
    #[error("malformed resource uri: {0}")]
    MalformedUri(String),

    /// Locator points at an unknown resource collection
    #[error("unknown resource kind '{0}'")]
    UnknownKind(String),
}

/// Identifier of a remote LIMS resource (e.g. `2-1234`, `24-5678`)
///
/// Unique within one kind of resource. Never carries a locator prefix or a
/// query suffix; use [`EntityUri`] to go from a locator to an id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LimsId(String);

impl LimsId {
    /// Create a validated identifier
    ///
    /// # Errors
    /// Returns error if the id is empty or contains `/`, `?`, `&` or whitespace
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::Empty);
        }
        if let Some(ch) = id
            .chars()
            .find(|c| matches!(c, '/' | '?' | '&') || c.is_whitespace())
        {
            return Err(IdError::ReservedCharacter { id, ch });
        }
        Ok(Self(id))
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LimsId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LimsId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LimsId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LimsId> for String {
    fn from(id: LimsId) -> Self {
        id.0
    }
}

impl AsRef<str> for LimsId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LimsId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kinds of entities tracked by the identity cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Process input or output (analyte or file)
    Artifact,
    /// Executed lab step
    Process,
}

impl EntityKind {
    /// Collection segment used in resource locators
    #[inline]
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Artifact => "artifacts",
            Self::Process => "processes",
        }
    }

    fn from_collection(segment: &str) -> Option<Self> {
        match segment {
            "artifacts" => Some(Self::Artifact),
            "processes" => Some(Self::Process),
            _ => None,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Artifact => "Artifact",
            Self::Process => "Process",
        })
    }
}

/// Parsed resource locator
///
/// `https://lims.example.org/api/v2/artifacts/2-101?state=88` parses into
/// kind [`EntityKind::Artifact`], id `2-101` and state `88`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityUri {
    kind: EntityKind,
    id: LimsId,
    state: Option<String>,
}

impl EntityUri {
    /// Build a locator value from its parts
    #[inline]
    #[must_use]
    pub fn new(kind: EntityKind, id: LimsId) -> Self {
        Self {
            kind,
            id,
            state: None,
        }
    }

    /// Parse a full or relative resource locator
    ///
    /// # Errors
    /// Returns error if the path does not end in `<collection>/<id>` or the
    /// collection is not a known entity kind
    pub fn parse(uri: &str) -> Result<Self, IdError> {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };

        let mut segments = path.trim_end_matches('/').rsplit('/');
        let id = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IdError::MalformedUri(uri.to_string()))?;
        let collection = segments
            .next()
            .ok_or_else(|| IdError::MalformedUri(uri.to_string()))?;
        let kind = EntityKind::from_collection(collection)
            .ok_or_else(|| IdError::UnknownKind(collection.to_string()))?;

        let state = query.and_then(|q| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "state")
                .map(|(_, value)| value.to_string())
        });

        Ok(Self {
            kind,
            id: LimsId::new(id)?,
            state,
        })
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &LimsId {
        &self.id
    }

    /// State suffix, if the locator carried one
    #[inline]
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Same locator without the state suffix
    #[must_use]
    pub fn stateless(&self) -> Self {
        Self::new(self.kind, self.id.clone())
    }

    /// Render against a service base uri
    #[must_use]
    pub fn render(&self, base_uri: &str) -> String {
        let mut out = format!(
            "{}/{}/{}",
            base_uri.trim_end_matches('/'),
            self.kind.collection(),
            self.id
        );
        if let Some(state) = &self.state {
            out.push_str("?state=");
            out.push_str(state);
        }
        out
    }
}

impl FromStr for EntityUri {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
