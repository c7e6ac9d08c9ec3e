//! Ephemeral segment cache for long generated responses.
//!
//! Long replies are split into addressable fragments so a later user action
//! (save, copy, expand) can reference one fragment by id. Entries live for a
//! fixed TTL and are evicted opportunistically whenever the cache is touched;
//! there is no background sweep.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// How long a cached segment stays addressable.
pub const DEFAULT_TTL_MINUTES: i64 = 30;

/// Content shorter than this is never force-chunked.
const CHUNK_FALLBACK_THRESHOLD: usize = 800;

/// Upper bound on a fallback chunk, in characters.
const MAX_CHUNK_CHARS: usize = 600;

/// Opaque identifier for a cached segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentId(String);

impl SegmentId {
    fn generate(owner: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}-{}",
            owner,
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone)]
struct CachedSegment {
    content: String,
    #[allow(dead_code)]
    owner: String,
    created_at: DateTime<Utc>,
}

/// TTL-bounded cache of text segments keyed by opaque ids.
#[derive(Debug)]
pub struct SegmentCache {
    ttl: Duration,
    entries: HashMap<SegmentId, CachedSegment>,
}

impl Default for SegmentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentCache {
    /// Create a cache with the default 30-minute TTL.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(DEFAULT_TTL_MINUTES))
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Store a segment for an owner and return its fresh id.
    pub fn put(&mut self, content: impl Into<String>, owner: &str) -> SegmentId {
        self.purge_expired();
        let id = SegmentId::generate(owner);
        self.entries.insert(
            id.clone(),
            CachedSegment {
                content: content.into(),
                owner: owner.to_string(),
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Look up a segment by id.
    ///
    /// Returns [`CoreError::SegmentNotFound`] both for unknown ids and for
    /// entries past their TTL; an expired entry is evicted on the way out.
    pub fn get(&mut self, id: &SegmentId) -> Result<String> {
        let expired = match self.entries.get(id) {
            Some(entry) => Utc::now() - entry.created_at > self.ttl,
            None => return Err(CoreError::SegmentNotFound(id.to_string())),
        };
        if expired {
            self.entries.remove(id);
            return Err(CoreError::SegmentNotFound(id.to_string()));
        }
        Ok(self.entries[id].content.clone())
    }

    /// Drop every expired entry. Called lazily from `put`; hosts may also
    /// call it from their own periodic sweep.
    pub fn purge_expired(&mut self) {
        let now = Utc::now();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now - entry.created_at <= ttl);
    }

    /// Number of live (possibly expired but not yet purged) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Line that starts a new segment: markdown heading, bolded title, or a
/// leading symbol/emoji bullet.
fn boundary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(#{1,6}\s+\S|\*\*[^*]+\*\*\s*$|[•▪‣◦●★☆✦]|[\u{1F300}-\u{1FAFF}\u{2600}-\u{27BF}]|\d+[.、]\s)",
        )
        .expect("invalid boundary pattern")
    })
}

/// Split content into addressable segments.
///
/// Structural markers open a new segment; when no markers exist and the
/// content is long, falls back to paragraph-based chunking bounded by
/// [`MAX_CHUNK_CHARS`]. Short unstructured content comes back as a single
/// segment.
pub fn split_segments(content: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if boundary_pattern().is_match(line.trim_start()) && !current.trim().is_empty() {
            segments.push(current.trim_end().to_string());
            current = String::new();
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        segments.push(current.trim_end().to_string());
    }

    if segments.len() > 1 {
        return segments;
    }
    if content.chars().count() <= CHUNK_FALLBACK_THRESHOLD {
        return segments;
    }
    chunk_by_paragraphs(content)
}

/// Greedy paragraph packing bounded by [`MAX_CHUNK_CHARS`].
fn chunk_by_paragraphs(content: &str) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in content.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if !current.is_empty()
            && current.chars().count() + paragraph.chars().count() > MAX_CHUNK_CHARS
        {
            chunks.push(current.trim_end().to_string());
            current = String::new();
        }
        if paragraph.chars().count() > MAX_CHUNK_CHARS {
            // Oversized paragraph: hard-split on character boundaries.
            let chars: Vec<char> = paragraph.chars().collect();
            for piece in chars.chunks(MAX_CHUNK_CHARS) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(paragraph);
        current.push_str("\n\n");
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim_end().to_string());
    }
    chunks
}
