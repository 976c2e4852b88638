//! Request assembly and collection tree core for an HTTP client.
//!
//! [`state::tree::ItemTree`] keeps folders and saved requests consistent,
//! [`http::builder`] turns a [`state::request::RequestDocument`] into a wire
//! request, and [`http::executor::ExecutionRecorder`] sends it through a
//! [`http::client::Transport`] and records the outcome.

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod state;
pub mod storage;

pub use error::{AppError, AssemblyError, DecodeError, EncodeError, TransportError, TreeError};
pub use http::builder::{HeaderPolicy, ResolvedUrl, WireRequest, build_wire_request, resolve_url};
pub use http::client::{ReqwestTransport, Transport, TransportResponse};
pub use http::executor::{ExecutionEvent, ExecutionRecorder};
pub use state::body::BodyEncoding;
pub use state::item::{File, Folder, Item, ItemId};
pub use state::key_value::{KeyValueEntry, KeyValueList, PathSegment, PathSegmentList};
pub use state::request::{HttpMethod, RequestDocument};
pub use state::result::{ExecutionResult, HistoryEntry, Outcome, ResponseHead, ResultHistory};
pub use state::tree::ItemTree;
