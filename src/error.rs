use crate::state::item::ItemId;

/// Failures turning a request document into a wire request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("invalid header name `{name}`")]
    InvalidHeaderName { name: String },
    #[error("invalid value for header `{name}`")]
    InvalidHeaderValue { name: String },
    #[error("path segment `{value}` would be resolved away by the URL")]
    InvalidPathSegment { value: String },
}

/// Structural violations reported by the item tree. The tree is unchanged when
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("item {0} not found")]
    NotFound(ItemId),
    #[error("parent folder {0} does not exist")]
    MissingParent(ItemId),
    #[error("item {0} is not a folder")]
    NotAFolder(ItemId),
    #[error("item {0} is not a request file")]
    NotAFile(ItemId),
    #[error("cannot move folder {folder} into {destination}, which is inside it")]
    CyclicMove { folder: ItemId, destination: ItemId },
    #[error("item id {0} already exists")]
    DuplicateId(ItemId),
    #[error("new order is not a permutation of the children of {parent}")]
    InvalidOrder { parent: String },
    #[error("item {0} is part of a parent cycle")]
    Cycle(ItemId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("body is not valid {encoding}")]
pub struct DecodeError {
    pub encoding: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("text cannot be represented in {encoding}")]
pub struct EncodeError {
    pub encoding: &'static str,
}

/// Failure reported by a transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::new("request timed out");
        }
        Self::new(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}
