use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::state::body::BodyEncoding;
use crate::state::item::ItemId;

/// Status line and headers of a response. Headers are grouped by name, names in
/// first-seen order, since that is how `HeaderMap` iterates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(status: u16) -> Self {
        Self { status, headers: Vec::new() }
    }

    pub fn status_text(&self) -> &'static str {
        reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
    }

    /// First header with `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body encoding named by the `charset` parameter of `Content-Type`, when it
    /// is one courier can decode.
    pub fn charset(&self) -> Option<BodyEncoding> {
        let content_type: mime::Mime = self.header("content-type")?.parse().ok()?;
        content_type.get_param(mime::CHARSET)?.as_str().parse().ok()
    }
}

/// What an execution produced. A failure carries only its message, so two
/// failures are equal when their messages are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success { body: Vec<u8>, response: ResponseHead },
    Failure { message: String },
}

impl Outcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Outcome::Failure { message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Success { response, .. } => Some(response.status),
            Outcome::Failure { .. } => None,
        }
    }
}

/// Record of one execution attempt. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    outcome: Outcome,
}

impl ExecutionResult {
    /// `end_time` is clamped so it is never before `start_time`.
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, outcome: Outcome) -> Self {
        Self {
            start_time,
            end_time: end_time.max(start_time),
            outcome,
        }
    }

    /// A failure that happened before anything was sent.
    pub fn immediate_failure(message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self::new(now, now, Outcome::failure(message))
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn elapsed(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Response body decoded for display, if this was a success. Uses the
    /// response charset, else `fallback`.
    pub fn body_text(&self, fallback: BodyEncoding) -> Option<Result<String, DecodeError>> {
        match &self.outcome {
            Outcome::Success { body, response } => {
                Some(response.charset().unwrap_or(fallback).decode(body))
            }
            Outcome::Failure { .. } => None,
        }
    }
}

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub request_id: ItemId,
    pub result: ExecutionResult,
}

/// Bounded, newest-first log of execution results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl Default for ResultHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ResultHistory {
    /// A capacity of zero is treated as one so `latest` always works.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Rebuild a history from newest-first `entries`, keeping at most `capacity` of them.
    pub fn from_entries(capacity: usize, entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut history = Self::with_capacity(capacity);
        history
            .entries
            .extend(entries.into_iter().take(history.capacity));
        history
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&mut self, request_id: ItemId, result: ExecutionResult) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(HistoryEntry { request_id, result });
    }

    pub fn latest(&self) -> Option<&ExecutionResult> {
        self.entries.front().map(|entry| &entry.result)
    }

    pub fn for_request(&self, request_id: ItemId) -> impl Iterator<Item = &ExecutionResult> {
        self.entries
            .iter()
            .filter(move |entry| entry.request_id == request_id)
            .map(|entry| &entry.result)
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_end_time_never_precedes_start() {
        let start = Utc::now();
        let earlier = start - TimeDelta::milliseconds(5);
        let result = ExecutionResult::new(start, earlier, Outcome::failure("boom"));
        assert_eq!(result.end_time(), start);
        assert_eq!(result.elapsed(), TimeDelta::zero());
    }

    #[test]
    fn test_failure_equality_is_by_message() {
        assert_eq!(Outcome::failure("timed out"), Outcome::failure("timed out"));
        assert_ne!(Outcome::failure("timed out"), Outcome::failure("refused"));
    }

    #[test]
    fn test_success_equality_compares_body_and_head() {
        let head = ResponseHead {
            status: 200,
            headers: vec![("content-type".into(), "text/plain".into())],
        };
        let a = Outcome::Success { body: b"ok".to_vec(), response: head.clone() };
        let b = Outcome::Success { body: b"ok".to_vec(), response: head.clone() };
        let c = Outcome::Success { body: b"ok".to_vec(), response: ResponseHead::new(200) };
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(head.header("Content-Type"), Some("text/plain"));
        assert_eq!(head.status_text(), "OK");
    }

    #[test]
    fn test_body_text_follows_response_charset() {
        let now = Utc::now();
        let sjis = ResponseHead {
            status: 200,
            headers: vec![("Content-Type".into(), "text/plain; charset=Shift_JIS".into())],
        };
        let body = BodyEncoding::ShiftJis.encode("テスト").unwrap();
        let result = ExecutionResult::new(now, now, Outcome::Success { body, response: sjis.clone() });
        assert_eq!(sjis.charset(), Some(BodyEncoding::ShiftJis));
        assert_eq!(result.body_text(BodyEncoding::Utf8), Some(Ok("テスト".to_string())));

        let plain = Outcome::Success { body: vec![0xff, 0xfe], response: ResponseHead::new(200) };
        let result = ExecutionResult::new(now, now, plain);
        assert_eq!(
            result.body_text(BodyEncoding::Utf8),
            Some(Err(DecodeError { encoding: "UTF-8" }))
        );
        assert_eq!(ExecutionResult::immediate_failure("x").body_text(BodyEncoding::Utf8), None);
    }

    #[test]
    fn test_unknown_charset_is_ignored() {
        let head = ResponseHead {
            status: 200,
            headers: vec![("content-type".into(), "application/json; charset=klingon".into())],
        };
        assert_eq!(head.charset(), None);
        assert_eq!(ResponseHead::new(204).charset(), None);
    }

    #[test]
    fn test_history_is_bounded_and_newest_first() {
        let mut history = ResultHistory::with_capacity(2);
        let req = Uuid::new_v4();
        let other = Uuid::new_v4();
        history.record(req, ExecutionResult::immediate_failure("first"));
        history.record(other, ExecutionResult::immediate_failure("second"));
        history.record(req, ExecutionResult::immediate_failure("third"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().outcome(), &Outcome::failure("third"));
        assert_eq!(history.for_request(req).count(), 1);
        history.clear();
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_history_from_entries_keeps_newest() {
        let req = Uuid::new_v4();
        let entries = ["c", "b", "a"].map(|message| HistoryEntry {
            request_id: req,
            result: ExecutionResult::immediate_failure(message),
        });
        let history = ResultHistory::from_entries(2, entries);
        assert_eq!(history.capacity(), 2);
        let kept: Vec<_> = history.iter().map(|e| e.result.outcome().clone()).collect();
        assert_eq!(kept, vec![Outcome::failure("c"), Outcome::failure("b")]);
    }
}
