//! Client event handling.
//!
//! The interactive client turns each input line into an [`Event`] and hands it
//! to [`handle_event`], which translates it into store dispatches. All state
//! changes happen inside the store; the handler only decides what to dispatch.
//!
//! # Input
//!
//! | Line | Event |
//! |---|---|
//! | `:n` | [`Event::NextPage`] |
//! | `:p` | [`Event::PreviousPage`] |
//! | `:b` / `:f` | [`Event::Back`] / [`Event::Forward`] |
//! | `:t` | [`Event::ToggleTotalPages`] |
//! | `:q` | [`Event::Quit`] |
//! | anything else | [`Event::Search`] |
//!
//! # Example
//!
//! ```rust
//! use book_inquiry::app::handler::Event;
//!
//! assert_eq!(Event::parse(":n"), Some(Event::NextPage));
//! assert_eq!(Event::parse("  dune  "), Some(Event::Search("dune".to_string())));
//! assert_eq!(Event::parse("   "), None);
//! ```

use crate::app::history::MemoryHistory;
use crate::store::StoreRoot;
use serde_json::json;
use tracing::debug;

/// A user request from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Search for the given text from page 1.
    Search(String),
    /// Show the next page, if there is one.
    NextPage,
    /// Show the previous page, if there is one.
    PreviousPage,
    /// Walk one entry back in history.
    Back,
    /// Walk one entry forward in history.
    Forward,
    /// Show or hide the total page count.
    ToggleTotalPages,
    /// Leave the client.
    Quit,
}

impl Event {
    /// Parses one input line; blank lines yield `None`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let event = match line {
            "" => return None,
            ":n" => Self::NextPage,
            ":p" => Self::PreviousPage,
            ":b" => Self::Back,
            ":f" => Self::Forward,
            ":t" => Self::ToggleTotalPages,
            ":q" => Self::Quit,
            text => Self::Search(text.to_string()),
        };
        Some(event)
    }
}

/// What the client loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep reading input.
    Continue,
    /// Stop the client.
    Quit,
}

/// Applies `event` to the store.
///
/// History navigation reads the entry from `history` and replays it through
/// `history/popState`; walking past either end does nothing.
pub async fn handle_event(store: &StoreRoot, history: &MemoryHistory, event: &Event) -> Control {
    debug!(event = ?event, "handling event");

    match event {
        Event::Search(text) => {
            store.dispatch("setSearchValue", vec![json!(text)]).await;
            store.dispatch("newSearch", vec![]).await;
        }
        Event::NextPage => {
            store.dispatch("nextPage", vec![]).await;
        }
        Event::PreviousPage => {
            store.dispatch("previousPage", vec![]).await;
        }
        Event::Back => match history.back() {
            Some(state) => {
                store.dispatch("history/popState", vec![state]).await;
            }
            None => debug!("already at the oldest history entry"),
        },
        Event::Forward => match history.forward() {
            Some(state) => {
                store.dispatch("history/popState", vec![state]).await;
            }
            None => debug!("already at the newest history entry"),
        },
        Event::ToggleTotalPages => {
            store.dispatch("ui/toggleTotalPagesDisplay", vec![]).await;
        }
        Event::Quit => return Control::Quit,
    }

    Control::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Event::parse(":p"), Some(Event::PreviousPage));
        assert_eq!(Event::parse(":b\n"), Some(Event::Back));
        assert_eq!(Event::parse(":f"), Some(Event::Forward));
        assert_eq!(Event::parse(":t"), Some(Event::ToggleTotalPages));
        assert_eq!(Event::parse(":q"), Some(Event::Quit));
        assert_eq!(Event::parse(":x"), Some(Event::Search(":x".to_string())));
        assert_eq!(Event::parse(""), None);
    }
}
