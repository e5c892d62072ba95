//! Chunk identity: a stable source id plus a time window.

use sha1::{Digest, Sha1};

/// Longest source id kept verbatim before falling back to hashing.
const MAX_SOURCE_ID_CHARS: usize = 64;

/// Identifies one cacheable audio chunk: a source plus a `[start, start+duration)`
/// window in whole seconds. Immutable once constructed; two requests for the
/// same URL and window always derive an equal key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    source_id: String,
    start_secs: u32,
    duration_secs: u32,
}

impl ChunkKey {
    /// Derive a key from a source URL and time window.
    ///
    /// The source id is extracted from the URL (video id query parameter or
    /// last path segment), sanitized to filesystem-safe characters. URLs
    /// with no usable identifier hash to a stable hex id instead.
    pub fn derive(source_url: &str, start_secs: u32, duration_secs: u32) -> Self {
        Self {
            source_id: extract_source_id(source_url),
            start_secs,
            duration_secs,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn start_secs(&self) -> u32 {
        self.start_secs
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Cache file name for this key's audio artifact.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.wav",
            self.source_id, self.start_secs, self.duration_secs
        )
    }

    /// Compact form for log lines and error messages.
    pub fn label(&self) -> String {
        format!(
            "{}@{}+{}",
            self.source_id, self.start_secs, self.duration_secs
        )
    }
}

impl std::fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Extract a stable identifier from a source URL.
fn extract_source_id(url: &str) -> String {
    // Prefer an explicit video id query parameter (YouTube-style watch URLs)
    if let Some(id) = query_param(url, "v") {
        let sanitized = sanitize(id);
        if !sanitized.is_empty() {
            return sanitized;
        }
    }

    // Otherwise the last non-empty path segment (youtu.be/<id>, direct files)
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");

    // Skip scheme-only leftovers like "https:"
    if !last_segment.is_empty() && !last_segment.ends_with(':') {
        let sanitized = sanitize(last_segment);
        if !sanitized.is_empty() {
            return sanitized;
        }
    }

    // No usable identifier: hash the whole URL
    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Find a query parameter's value in a URL without a full URL parser.
fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let query = url.split('?').nth(1)?;
    let query = query.split('#').next().unwrap_or(query);
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next() == Some(name) {
            let value = parts.next().unwrap_or("");
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

/// Keep filesystem- and shell-safe characters, map the rest to underscores,
/// and collapse an all-underscore result to empty.
fn sanitize(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .take(MAX_SOURCE_ID_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if mapped.chars().all(|c| c == '_') {
        String::new()
    } else {
        mapped
    }
}
