//! Call-scoped data that extensions can use to compute custom label values.

use std::fmt;
use tonic::metadata::MetadataMap;

/// Where a call came from.
///
/// The caller attaches this to a call before it reaches the instrumented
/// service, either through [`CallContext::with_source`] or by inserting it into
/// the extensions of a [`tonic::Request`]. Calls without a source are
/// treated as [`Source::Internal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Source {
    /// Requests from other components of the same system
    #[default]
    Internal,
    /// Everything else
    External,
}

impl Source {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Source::Internal => "internal",
            Source::External => "external",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ambient context of a single call.
///
/// It is read-only once the call starts: everything is set with the
/// `with_*` builders before the call is handed to the interceptor.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    metadata: MetadataMap,
    source: Option<Source>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for a tonic request, copying its metadata and the
    /// [`Source`] stored in its extensions (if any).
    pub fn from_request<T>(request: &tonic::Request<T>) -> Self {
        Self {
            metadata: request.metadata().clone(),
            source: request.extensions().get::<Source>().copied(),
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    /// The source attached to this call, or [`Source::Internal`] if none was.
    pub fn source(&self) -> Source {
        self.source.unwrap_or_default()
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }
}
