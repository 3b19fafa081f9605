//! Test doubles for driving the store without a network.
//!
//! [`ScriptedFetch`] answers requests from a script keyed by the
//! `startIndex` query parameter and records every URL it was asked for.
//! Replies can be held back until released, which lets tests interleave a
//! slow response with a newer request.
//!
//! Compiled for unit tests and behind the `testkit` feature.

use crate::domain::error::{BookInquiryError, Result};
use crate::infrastructure::http::{Fetch, HttpResponse};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tokio::sync::Notify;

/// How a scripted request is answered.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `200 OK` with a JSON body.
    Json(Value),
    /// An empty body with the given status.
    Status(u16),
    /// No response at all.
    Transport,
}

impl Reply {
    /// A successful search page of `count` generated books.
    #[must_use]
    pub fn page(total_items: u64, count: usize, tag: &str) -> Self {
        Self::Json(json!({ "totalItems": total_items, "items": books(count, tag) }))
    }

    /// A successful, empty search page.
    #[must_use]
    pub fn empty() -> Self {
        Self::Json(json!({ "totalItems": 0, "items": [] }))
    }

    fn respond(&self) -> Result<HttpResponse> {
        match self {
            Self::Json(body) => Ok(HttpResponse::ok(body.to_string())),
            Self::Status(status) => Ok(HttpResponse {
                status: *status,
                body: String::new(),
            }),
            Self::Transport => Err(BookInquiryError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "scripted transport failure",
            ))),
        }
    }
}

/// `count` distinct book records whose ids start with `tag`.
#[must_use]
pub fn books(count: usize, tag: &str) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "id": format!("{tag}-{i}"),
                "title": format!("{tag} volume {i}"),
                "authors": "Anonymous",
                "publisher": "",
                "description": "",
                "thumbnail": "",
                "infoLink": "",
            })
        })
        .collect()
}

/// A [`Fetch`] that answers from a script.
#[derive(Debug)]
pub struct ScriptedFetch {
    requests: RefCell<Vec<String>>,
    replies: RefCell<HashMap<u64, Reply>>,
    fallback: RefCell<Reply>,
    held: RefCell<HashMap<u64, Rc<Notify>>>,
}

impl Default for ScriptedFetch {
    fn default() -> Self {
        Self {
            requests: RefCell::new(Vec::new()),
            replies: RefCell::new(HashMap::new()),
            fallback: RefCell::new(Reply::empty()),
            held: RefCell::new(HashMap::new()),
        }
    }
}

impl ScriptedFetch {
    /// A fetcher answering everything with an empty page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests for `start_index` with `reply`.
    pub fn on(&self, start_index: u64, reply: Reply) -> &Self {
        self.replies.borrow_mut().insert(start_index, reply);
        self
    }

    /// Answers every unscripted request with `reply`.
    pub fn otherwise(&self, reply: Reply) -> &Self {
        *self.fallback.borrow_mut() = reply;
        self
    }

    /// Holds replies for `start_index` until [`release`](Self::release).
    pub fn hold(&self, start_index: u64) -> &Self {
        self.held
            .borrow_mut()
            .insert(start_index, Rc::new(Notify::new()));
        self
    }

    /// Lets one held request for `start_index` complete.
    pub fn release(&self, start_index: u64) {
        if let Some(gate) = self.held.borrow_mut().remove(&start_index) {
            gate.notify_one();
        }
    }

    /// Every URL requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// The `startIndex` of every search request so far, in order.
    #[must_use]
    pub fn start_indexes(&self) -> Vec<u64> {
        self.requests.borrow().iter().filter_map(|u| start_index(u)).collect()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }
}

#[async_trait(?Send)]
impl Fetch for ScriptedFetch {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(url.to_string());

        let index = start_index(url);
        let gate = index.and_then(|i| self.held.borrow().get(&i).cloned());
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = index
            .and_then(|i| self.replies.borrow().get(&i).cloned())
            .unwrap_or_else(|| self.fallback.borrow().clone());
        reply.respond()
    }
}

fn start_index(url: &str) -> Option<u64> {
    let parsed = url::Url::parse(url).ok()?;
    let value = parsed
        .query_pairs()
        .find(|(key, _)| key == "startIndex")?
        .1;
    value.parse().ok()
}
