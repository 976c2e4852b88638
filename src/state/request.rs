use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DecodeError, EncodeError};
use crate::state::body::BodyEncoding;
use crate::state::key_value::{KeyValueList, PathSegmentList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
    Connect,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 9] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
        HttpMethod::Connect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }

    /// Whether requests with this method conventionally carry a body.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown HTTP method `{s}`"))
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Trace => reqwest::Method::TRACE,
            HttpMethod::Connect => reqwest::Method::CONNECT,
        }
    }
}

/// Editable description of one HTTP request.
///
/// Every mutator refreshes `updated_at`. `id` never changes after creation;
/// [`RequestDocument::duplicate`] is the only way to get a copy with a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDocument {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    method: HttpMethod,
    base_url: String,
    #[serde(default)]
    path_segments: PathSegmentList,
    #[serde(default)]
    query_params: KeyValueList,
    #[serde(default)]
    headers: KeyValueList,
    #[serde(default)]
    body_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Vec<u8>>,
    #[serde(default)]
    body_encoding: BodyEncoding,
}

impl Default for RequestDocument {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            created_at: now,
            updated_at: now,
            method: HttpMethod::default(),
            base_url: String::new(),
            path_segments: PathSegmentList::new(),
            query_params: KeyValueList::new(),
            headers: KeyValueList::new(),
            body_enabled: false,
            body: None,
            body_encoding: BodyEncoding::default(),
        }
    }
}

impl RequestDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.set_base_url(base_url);
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.set_method(method);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path_segments(&self) -> &PathSegmentList {
        &self.path_segments
    }

    pub fn query_params(&self) -> &KeyValueList {
        &self.query_params
    }

    pub fn headers(&self) -> &KeyValueList {
        &self.headers
    }

    pub fn body_enabled(&self) -> bool {
        self.body_enabled
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn body_encoding(&self) -> BodyEncoding {
        self.body_encoding
    }

    /// Body bytes to transmit: present only when the body is enabled.
    pub fn outgoing_body(&self) -> Option<&[u8]> {
        if self.body_enabled { self.body() } else { None }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_method(&mut self, method: HttpMethod) {
        self.method = method;
        self.touch();
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
        self.touch();
    }

    pub fn edit_path_segments<R>(&mut self, edit: impl FnOnce(&mut PathSegmentList) -> R) -> R {
        let out = edit(&mut self.path_segments);
        self.touch();
        out
    }

    pub fn edit_query_params<R>(&mut self, edit: impl FnOnce(&mut KeyValueList) -> R) -> R {
        let out = edit(&mut self.query_params);
        self.touch();
        out
    }

    pub fn edit_headers<R>(&mut self, edit: impl FnOnce(&mut KeyValueList) -> R) -> R {
        let out = edit(&mut self.headers);
        self.touch();
        out
    }

    pub fn set_body_enabled(&mut self, enabled: bool) {
        self.body_enabled = enabled;
        self.touch();
    }

    pub fn set_body(&mut self, body: Option<Vec<u8>>) {
        self.body = body;
        self.touch();
    }

    /// Change the declared encoding. The stored bytes are left as they are.
    pub fn set_body_encoding(&mut self, encoding: BodyEncoding) {
        self.body_encoding = encoding;
        self.touch();
    }

    /// Body decoded with the declared encoding, `None` when there is no body.
    pub fn body_text(&self) -> Result<Option<String>, DecodeError> {
        self.body
            .as_deref()
            .map(|bytes| self.body_encoding.decode(bytes))
            .transpose()
    }

    /// Replace the body with `text` encoded in the declared encoding.
    pub fn set_body_text(&mut self, text: &str) -> Result<(), EncodeError> {
        let bytes = self.body_encoding.encode(text)?;
        self.set_body(Some(bytes));
        Ok(())
    }

    /// Deep copy with a fresh id and fresh timestamps.
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    fn touch(&mut self) {
        let now = Utc::now();
        // Wall clocks can step backwards; never let updated_at regress.
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}
