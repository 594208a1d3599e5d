//! `Range` request header parsing.
//!
//! Only a single `bytes=<start>-[<end>]` range is understood. Anything else
//! (suffix ranges, multiple ranges, other units, garbage) is read as "no
//! range" and the whole object is served: a deliberate leniency towards
//! sloppy players rather than RFC 7233's rejection.

use axum::http::{header, HeaderMap};
use relay_stream::ByteRange;

/// Parse a `Range` header value; `None` means "serve the whole object".
pub fn parse_range_header(value: &str) -> Option<ByteRange> {
    let spec = value.trim();
    let spec = spec
        .get(..6)
        .filter(|unit| unit.eq_ignore_ascii_case("bytes="))
        .map(|_| &spec[6..])?;

    if spec.contains(',') {
        return None;
    }

    let (start, end) = spec.split_once('-')?;
    let start = parse_position(start)?;
    match end.trim() {
        "" => Some(ByteRange::from_start(start)),
        end => Some(ByteRange::new(start, Some(parse_position(end)?))),
    }
}

/// Range requested by the `Range` header of a request, if usable.
pub fn range_from_headers(headers: &HeaderMap) -> Option<ByteRange> {
    headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header)
}

fn parse_position(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
