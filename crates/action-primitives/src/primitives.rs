//! Built-in actions
//!
//! Five handlers cover the chat-style workflows:
//! 1. input - focus the prompt field, clear it, type the text
//! 2. click - resolve a button by selector or text and click it
//! 3. wait_response - wait for the busy marker to clear
//! 4. extract - scrape the latest response and optionally save it
//! 5. download - click a link and watch the output directory

mod click;
mod download;
mod extract;
mod input;
mod wait_response;

pub use click::*;
pub use download::*;
pub use extract::*;
pub use input::*;
pub use wait_response::*;

use std::time::Duration;

use cdp_adapter::{ElementHandle, ElementQuery, PageController};
use tokio::time::sleep;

use crate::errors::ActionError;

/// Tries each query in order with its own timeout; first hit wins.
pub(crate) async fn find_first(
    page: &dyn PageController,
    candidates: &[(ElementQuery, Duration)],
) -> Result<Option<ElementHandle>, ActionError> {
    for (query, timeout) in candidates {
        if let Some(handle) = page.find(query, *timeout).await? {
            return Ok(Some(handle));
        }
    }
    Ok(None)
}

/// Comma-separated selector list → CSS queries, blanks dropped.
pub(crate) fn css_candidates(selectors: &str, timeout: Duration) -> Vec<(ElementQuery, Duration)> {
    selectors
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| (ElementQuery::Css(part.to_string()), timeout))
        .collect()
}

pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_candidates_split_and_trim() {
        let parts = css_candidates(" #a , ,.b", Duration::from_secs(3));
        assert_eq!(
            parts,
            vec![
                (ElementQuery::Css("#a".into()), Duration::from_secs(3)),
                (ElementQuery::Css(".b".into()), Duration::from_secs(3)),
            ]
        );
    }
}
