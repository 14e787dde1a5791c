//! Pagination primitives shared by `Queue::list`, `Message::list`, and
//! `Catalogue::list`.
//!
//! `spec.md` §9 asks for "pull-based iterators with a `next_marker()`
//! accessor, not ... generator functions, so pagination is explicit". We
//! model that as a concrete [`Page<T>`] returned by each `list` call: the
//! caller threads `page.next_marker` back into the next call itself, rather
//! than holding a live cursor/stream across an await boundary (`spec.md`
//! §5, "a listing iterator ... either yields the next page atomically or
//! fails").

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};

use super::ids::MsgId;

/// Default page size used when a caller does not specify one.
pub const DEFAULT_LIMIT: usize = 10;

/// An opaque pagination cursor. Construct one with [`Marker::encode`] and
/// consume it with the matching `decode_*`. A marker that fails to decode
/// is never an error to the caller — it is treated as if no further results
/// exist (`spec.md` §7, "Absent-vs-malformed distinction", extended to
/// markers by §4.2's `list` contract).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker(String);

impl Marker {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps a marker string a caller echoed back verbatim (e.g. from a
    /// `?marker=` query parameter) without re-encoding it. The matching
    /// `decode_*` still treats anything malformed as absent.
    #[must_use]
    pub fn opaque(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Marker for `Queue::list`: queues sort lexicographically by name, so
    /// the name itself is a valid, self-describing cursor.
    #[must_use]
    pub fn for_queue_name(name: &str) -> Self {
        Self(name.to_string())
    }

    #[must_use]
    pub fn decode_queue_name(raw: &str) -> Option<String> {
        if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        }
    }

    /// Marker for `Message::list`: encodes `(created_at, msg_id)`, the
    /// snapshot-stable key `spec.md` §3 invariant 6 requires.
    #[must_use]
    pub fn for_message(created_at: DateTime<Utc>, msg_id: MsgId) -> Self {
        let raw = format!("{}|{}", created_at.timestamp_nanos_opt().unwrap_or(0), msg_id);
        Self(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Decodes a message marker. Returns `None` for anything malformed —
    /// callers map that to an empty page, never an error.
    #[must_use]
    pub fn decode_message(raw: &str) -> Option<(DateTime<Utc>, MsgId)> {
        let decoded = URL_SAFE_NO_PAD.decode(raw).ok()?;
        let text = String::from_utf8(decoded).ok()?;
        let (ts, id) = text.split_once('|')?;
        let nanos: i64 = ts.parse().ok()?;
        let created_at = DateTime::from_timestamp_nanos(nanos);
        let msg_id = MsgId::parse(id)?;
        Some((created_at, msg_id))
    }

    /// Marker for `Catalogue::list`: entries sort by `(project, queue)`,
    /// same rationale as [`Marker::for_queue_name`].
    #[must_use]
    pub fn for_catalogue_key(project: &str, queue: &str) -> Self {
        Self(URL_SAFE_NO_PAD.encode(format!("{project}|{queue}")))
    }

    #[must_use]
    pub fn decode_catalogue_key(raw: &str) -> Option<(String, String)> {
        let decoded = URL_SAFE_NO_PAD.decode(raw).ok()?;
        let text = String::from_utf8(decoded).ok()?;
        let (project, queue) = text.split_once('|')?;
        Some((project.to_string(), queue.to_string()))
    }
}

/// A single page of results plus the marker needed to fetch the next one.
/// `next_marker` is `None` once the traversal is exhausted.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_marker: Option<Marker>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_marker: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_message_marker_decodes_to_none() {
        assert_eq!(Marker::decode_message("xyz"), None);
        assert_eq!(Marker::decode_message(""), None);
    }

    #[test]
    fn message_marker_round_trips() {
        let ts = Utc::now();
        let id = MsgId::generate();
        let marker = Marker::for_message(ts, id);
        let (decoded_ts, decoded_id) =
            Marker::decode_message(marker.as_str()).expect("valid marker decodes");
        assert_eq!(decoded_id, id);
        // nanosecond round-trip through timestamp_nanos_opt
        assert_eq!(decoded_ts.timestamp_nanos_opt(), ts.timestamp_nanos_opt());
    }
}
