//! Infrastructure layer for network, encoding and filesystem interactions.
//!
//! This module provides the pieces the store modules depend on but do not
//! own: the HTTP fetch capability, URI component encoding for query strings,
//! and the data directory used for log files.

pub mod http;
pub mod paths;
pub mod uri;

pub use http::{Fetch, HttpResponse, ReqwestFetch};
pub use paths::{expand_tilde, get_data_dir, log_dir};
pub use uri::{decode_uri_component, encode_uri_component};
