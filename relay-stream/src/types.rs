use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use uuid::Uuid;

use crate::{RelayError, RelayResult};

/// Stream of bytes for relayed content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Stable identifier of a backend credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CredentialId(pub u32);

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote partition ("datacenter") identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionId(pub u32);

impl std::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

const HANDLE_VERSION: u8 = 1;

/// Decoded identifier of a stored file.
///
/// Immutable once decoded; built per request and never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteObjectRef {
    pub partition: PartitionId,
    pub object_id: u64,
    pub access_hash: u64,
    pub file_reference: Option<Bytes>,
}

impl RemoteObjectRef {
    pub fn new(partition: PartitionId, object_id: u64, access_hash: u64) -> Self {
        Self {
            partition,
            object_id,
            access_hash,
            file_reference: None,
        }
    }

    pub fn with_file_reference<B: Into<Bytes>>(mut self, reference: B) -> Self {
        let reference = reference.into();
        self.file_reference = if reference.is_empty() {
            None
        } else {
            Some(reference)
        };
        self
    }

    /// Encode as a URL-safe handle.
    ///
    /// Layout: version u8, partition u32, object id u64, access hash u64,
    /// reference length u16, reference bytes. Integers are little endian.
    /// A reference longer than `u16::MAX` bytes cannot be encoded.
    pub fn encode(&self) -> RelayResult<String> {
        let reference = self.file_reference.as_deref().unwrap_or_default();
        let reference_len = u16::try_from(reference.len()).map_err(|_| {
            RelayError::invalid(format!(
                "file reference of {} bytes does not fit a handle",
                reference.len()
            ))
        })?;
        let mut buf = BytesMut::with_capacity(1 + 4 + 8 + 8 + 2 + reference.len());
        buf.put_u8(HANDLE_VERSION);
        buf.put_u32_le(self.partition.0);
        buf.put_u64_le(self.object_id);
        buf.put_u64_le(self.access_hash);
        buf.put_u16_le(reference_len);
        buf.put_slice(reference);
        Ok(URL_SAFE_NO_PAD.encode(buf))
    }

    /// Decode a handle produced by [`RemoteObjectRef::encode`].
    ///
    /// Any malformed handle is reported as `ObjectNotFound`.
    pub fn decode(handle: &str) -> RelayResult<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(handle.trim())
            .map_err(|_| RelayError::not_found(handle))?;
        let mut buf = raw.as_slice();

        if buf.remaining() < 1 + 4 + 8 + 8 + 2 || buf.get_u8() != HANDLE_VERSION {
            return Err(RelayError::not_found(handle));
        }
        let partition = PartitionId(buf.get_u32_le());
        let object_id = buf.get_u64_le();
        let access_hash = buf.get_u64_le();
        let reference_len = buf.get_u16_le() as usize;
        if buf.remaining() != reference_len {
            return Err(RelayError::not_found(handle));
        }

        Ok(Self::new(partition, object_id, access_hash)
            .with_file_reference(Bytes::copy_from_slice(buf)))
    }
}

/// Size, name and MIME type shared by every media kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: u64,
}

impl MediaInfo {
    pub fn new(size: u64) -> Self {
        Self {
            file_name: None,
            mime_type: None,
            size,
        }
    }

    pub fn with_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.mime_type = Some(mime.into());
        self
    }
}

/// The attachment a stored message carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaPayload {
    Document(MediaInfo),
    Video(MediaInfo),
    Audio(MediaInfo),
}

impl MediaPayload {
    /// Pick the first present attachment, preferring document, then video, then audio.
    pub fn first_of(
        document: Option<MediaInfo>,
        video: Option<MediaInfo>,
        audio: Option<MediaInfo>,
    ) -> Option<Self> {
        document
            .map(Self::Document)
            .or_else(|| video.map(Self::Video))
            .or_else(|| audio.map(Self::Audio))
    }

    pub fn info(&self) -> &MediaInfo {
        match self {
            Self::Document(info) | Self::Video(info) | Self::Audio(info) => info,
        }
    }

    pub fn size(&self) -> u64 {
        self.info().size
    }

    pub fn file_name(&self) -> Option<&str> {
        self.info().file_name.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.info().mime_type.as_deref()
    }

    /// Whether a player can consume it inline (video/* or audio/*).
    pub fn is_streamable(&self) -> bool {
        self.mime_type()
            .map(|m| m.starts_with("video/") || m.starts_with("audio/"))
            .unwrap_or(false)
    }
}

/// Everything the relay needs to serve one object
#[derive(Debug, Clone)]
pub struct ResolvedObject {
    pub object_ref: RemoteObjectRef,
    pub media: MediaPayload,
}

impl ResolvedObject {
    pub fn new(object_ref: RemoteObjectRef, media: MediaPayload) -> Self {
        Self { object_ref, media }
    }

    pub fn size(&self) -> u64 {
        self.media.size()
    }
}

/// Byte range for partial content requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>, // None means "to end of file"
}

impl ByteRange {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self { start, end }
    }

    pub fn from_start(start: u64) -> Self {
        Self { start, end: None }
    }
}

/// Per-request context carried through relay operations
#[derive(Debug, Clone)]
pub struct RelayCtx {
    pub request_id: String,
}

impl RelayCtx {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = request_id;
        self
    }
}

impl Default for RelayCtx {
    fn default() -> Self {
        Self::new()
    }
}
