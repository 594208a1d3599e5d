use crate::{ByteStream, ResolvedObject, ResolvedRange};

/// An object ready to be written out, with its body stream already planned
pub struct OpenedObject {
    pub object: ResolvedObject,
    /// Served byte range; `None` only for an empty object
    pub range: Option<ResolvedRange>,
    /// Whether the caller asked for a range (answered as partial content)
    pub partial: bool,
    pub stream: ByteStream,
}

impl OpenedObject {
    pub fn new(
        object: ResolvedObject,
        range: Option<ResolvedRange>,
        partial: bool,
        stream: ByteStream,
    ) -> Self {
        Self {
            object,
            range,
            partial,
            stream,
        }
    }

    /// Number of body bytes the stream yields when it runs to completion
    pub fn content_length(&self) -> u64 {
        self.range.map(|r| r.content_length()).unwrap_or(0)
    }

    pub fn total_size(&self) -> u64 {
        self.object.size()
    }

    /// Declared MIME type, or `fallback` when the object has none
    pub fn content_type<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.object.media.mime_type().unwrap_or(fallback)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.object.media.file_name()
    }
}

impl std::fmt::Debug for OpenedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedObject")
            .field("object", &self.object)
            .field("range", &self.range)
            .field("partial", &self.partial)
            .finish_non_exhaustive()
    }
}
