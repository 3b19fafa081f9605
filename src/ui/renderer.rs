//! Plain-text rendering of the view model.
//!
//! The renderer writes to any [`Write`] so the binary can target stdout and
//! tests can target a buffer. Output is line oriented with no cursor control.
//!
//! # Layout
//!
//! ```text
//! Book Inquiry: dune
//! ────────────────────────
//!  21. Dune
//!      Frank Herbert · Chilton
//!      https://books.example/dune
//! ────────────────────────
//! < page 2 of 5 >
//! :n next | :p previous | ...
//! ```

use crate::app::state::RootState;
use crate::domain::error::Result;
use crate::ui::viewmodel::{Body, PaginationInfo, UIViewModel};
use std::io::Write;

const RULE_WIDTH: usize = 48;

/// Renders the root state to `out`.
///
/// # Errors
///
/// Returns [`BookInquiryError::Io`](crate::domain::BookInquiryError::Io) if
/// writing fails.
///
/// # Example
///
/// ```rust
/// use book_inquiry::app::state::RootState;
/// use book_inquiry::ui::render;
///
/// let mut out = Vec::new();
/// render(&RootState::default(), &mut out).unwrap();
/// assert!(String::from_utf8(out).unwrap().starts_with("Book Inquiry"));
/// ```
pub fn render(root: &RootState, out: &mut impl Write) -> Result<()> {
    render_viewmodel(&UIViewModel::from_root(root), out)
}

/// Renders a pre-computed view model to `out`.
///
/// # Errors
///
/// Returns [`BookInquiryError::Io`](crate::domain::BookInquiryError::Io) if
/// writing fails.
pub fn render_viewmodel(vm: &UIViewModel, out: &mut impl Write) -> Result<()> {
    let rule = "─".repeat(RULE_WIDTH);

    match &vm.header.query {
        Some(query) => writeln!(out, "{}: {query}", vm.header.title)?,
        None => writeln!(out, "{}", vm.header.title)?,
    }
    writeln!(out, "{rule}")?;

    match &vm.body {
        Body::Welcome => writeln!(out, "Type a title, author or subject to search.")?,
        Body::Loading => writeln!(out, "Searching...")?,
        Body::Failed => writeln!(out, "Search failed. Try again in a moment.")?,
        Body::NoResults { query } => writeln!(out, "No books found for \"{query}\".")?,
        Body::Results(rows) => {
            for row in rows {
                writeln!(out, "{:>3}. {}", row.position, row.title)?;
                if !row.byline.is_empty() {
                    writeln!(out, "     {}", row.byline)?;
                }
                if !row.link.is_empty() {
                    writeln!(out, "     {}", row.link)?;
                }
            }
        }
    }

    writeln!(out, "{rule}")?;
    if let Some(pagination) = &vm.pagination {
        writeln!(out, "{}", page_indicator(pagination))?;
    }
    writeln!(out, "{}", vm.footer.keybindings)?;
    out.flush()?;

    Ok(())
}

fn page_indicator(pagination: &PaginationInfo) -> String {
    let previous = if pagination.has_previous { "<" } else { " " };
    let next = if pagination.has_next { ">" } else { " " };
    match pagination.total_pages {
        Some(total) => format!("{previous} page {} of {total} {next}", pagination.current_page),
        None => format!("{previous} page {} {next}", pagination.current_page),
    }
}
