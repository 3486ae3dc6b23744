//! Recovering JSON values from free-form model text.
//!
//! Candidate spans are tried in order and the first one that parses wins:
//! 1. the body of a markdown fence (```` ``` ```` with an optional `json` tag)
//! 2. the outermost bracket span of whichever kind (`{` or `[`) opens first
//! 3. the outermost span of the other bracket kind
//!
//! Each candidate is trimmed, stripped of control characters, and parsed
//! strictly. If strict parsing fails, one lenient pass rewrites the common
//! model mistakes (trailing commas, bare object keys, raw newlines inside
//! strings) and the parse is retried.

use autoforge_core::error::ExtractionError;
use autoforge_core::event::{DomainEvent, EventBus};
use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, LazyLock, Mutex};
use tracing::{debug, warn};

/// Characters of offending text kept in errors and diagnostics.
const SNIPPET_CHARS: usize = 200;

const DEFAULT_DIAGNOSTICS: usize = 100;

static FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?(.*?)```").ok());

/// Extract the first parseable JSON value from `raw`.
pub fn extract_value(raw: &str) -> Result<Value, ExtractionError> {
    if raw.trim().is_empty() {
        return Err(ExtractionError {
            reason: "empty response".into(),
            snippet: String::new(),
        });
    }

    let mut last_error = String::from("no JSON object or array found");
    for candidate in candidates(raw) {
        let cleaned = clean(candidate);
        if cleaned.is_empty() {
            continue;
        }
        match parse(&cleaned) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e,
        }
    }

    Err(ExtractionError {
        reason: format!("no valid JSON found: {last_error}"),
        snippet: truncate(raw),
    })
}

/// Extract a value from `raw` and deserialize it into `T`.
///
/// A value of the wrong shape is an error just like unparseable text.
pub fn extract<T: DeserializeOwned>(raw: &str) -> Result<T, ExtractionError> {
    let value = extract_value(raw)?;
    serde_json::from_value(value).map_err(|e| ExtractionError {
        reason: format!("unexpected shape: {e}"),
        snippet: truncate(raw),
    })
}

/// Candidate spans in the order they should be tried.
fn candidates(raw: &str) -> Vec<&str> {
    let mut spans = Vec::new();

    if let Some(fence) = FENCE.as_ref()
        && let Some(inner) = fence.captures(raw).and_then(|c| c.get(1))
    {
        spans.push(inner.as_str());
    }

    let object = bracket_span(raw, '{', '}');
    let array = bracket_span(raw, '[', ']');
    match (object, array) {
        (Some(o), Some(a)) if a.0 < o.0 => {
            spans.push(&raw[a.0..a.1]);
            spans.push(&raw[o.0..o.1]);
        }
        (o, a) => {
            spans.extend(o.map(|(s, e)| &raw[s..e]));
            spans.extend(a.map(|(s, e)| &raw[s..e]));
        }
    }

    if spans.is_empty() {
        spans.push(raw);
    }
    spans
}

/// Byte range from the first `open` to the last `close`, inclusive.
fn bracket_span(raw: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    (end > start).then_some((start, end + close.len_utf8()))
}

fn clean(candidate: &str) -> String {
    candidate
        .trim_matches(|c: char| c.is_whitespace() || c == '`')
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

fn parse(text: &str) -> Result<Value, String> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(strict) => {
            let repaired = lenient(text);
            serde_json::from_str(&repaired).map_err(|_| strict.to_string())
        }
    }
}

/// Rewrite near-JSON into JSON: drop trailing commas, quote bare keys,
/// escape raw line breaks and tabs inside string literals.
fn lenient(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            match c {
                _ if escaped => {
                    out.push(c);
                    escaped = false;
                }
                '\\' => {
                    out.push(c);
                    escaped = true;
                }
                '"' => {
                    out.push(c);
                    in_string = false;
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            c if is_key_start(c) && expects_key(&out) => {
                let start = i;
                while i < chars.len() && is_key_char(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let next = chars[i..].iter().find(|c| !c.is_whitespace());
                if next == Some(&':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

fn expects_key(out: &str) -> bool {
    matches!(out.trim_end().chars().last(), Some('{') | Some(','))
}

fn is_key_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '-')
}

fn truncate(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

/// One extraction that fell back.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionDiagnostic {
    pub context: String,
    pub reason: String,
    pub snippet: String,
    pub timestamp: DateTime<Utc>,
}

/// Fault-tolerant extraction with a bounded log of failures.
pub struct Extractor {
    diagnostics: Mutex<VecDeque<ExtractionDiagnostic>>,
    capacity: usize,
    events: Option<Arc<EventBus>>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DIAGNOSTICS)
    }

    /// Keep at most `capacity` diagnostics; older ones are dropped.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            diagnostics: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_DIAGNOSTICS))),
            capacity: capacity.max(1),
            events: None,
        }
    }

    /// Publish an `ExtractionFailed` event for every fallback.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Extract a `T` from `raw`, returning `fallback` on any failure.
    pub fn safe_extract<T: DeserializeOwned>(&self, raw: &str, fallback: T) -> T {
        self.safe_extract_for("extraction", raw, fallback)
    }

    /// Like [`safe_extract`](Self::safe_extract), tagging the diagnostic
    /// with `context` (usually the pipeline stage).
    pub fn safe_extract_for<T: DeserializeOwned>(&self, context: &str, raw: &str, fallback: T) -> T {
        match extract(raw) {
            Ok(value) => {
                debug!(context, "Extracted structured response");
                value
            }
            Err(e) => {
                warn!(context, reason = %e.reason, "Extraction failed, using fallback");
                self.record(context, e);
                fallback
            }
        }
    }

    /// Failures recorded so far, oldest first.
    pub fn diagnostics(&self) -> Vec<ExtractionDiagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    fn record(&self, context: &str, error: ExtractionError) {
        let diagnostic = ExtractionDiagnostic {
            context: context.to_string(),
            reason: error.reason,
            snippet: error.snippet,
            timestamp: Utc::now(),
        };

        if let Some(events) = &self.events {
            events.publish(DomainEvent::ExtractionFailed {
                context: diagnostic.context.clone(),
                reason: diagnostic.reason.clone(),
                timestamp: diagnostic.timestamp,
            });
        }

        let mut log = self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
        if log.len() >= self.capacity {
            log.pop_front();
        }
        log.push_back(diagnostic);
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
