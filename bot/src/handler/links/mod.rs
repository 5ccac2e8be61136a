//! Finding links in message text.
//!
//! A link is `http` or `https`, then `://`, a host, and optionally a path,
//! query and fragment made of non-whitespace url characters. Trailing
//! sentence punctuation and unbalanced closing brackets are left out of the
//! match. The scanning itself is linkify's.

mod filter;

pub use filter::canonical_url;

use lazy_static::lazy_static;
use linkify::{LinkFinder, LinkKind};
use log::warn;
use regex::Regex;

const IGNORED_LINKS: [&str; 4] = [
    r"(canary\.|ptb\.)?discord(app)?\.com/channels",
    r"tenor\.com/view",
    r"giphy\.com/gifs",
    r"media\.discordapp\.net",
];

/// returns true for links that point back into discord or at gif pickers,
/// those aren't shared content
fn ignored_link(link: &str) -> bool {
    lazy_static! {
        static ref RE: Regex =
            Regex::new(&format!(r"(?i)^https?://(www\.)?({})", IGNORED_LINKS.join("|"))).unwrap();
    }
    RE.is_match(link)
}

fn has_web_scheme(link: &str) -> bool {
    let lower = link.get(..8).unwrap_or(link).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Lazily yields the links in `text` in the order they appear.
pub fn extract_links(text: &str) -> impl Iterator<Item = &str> + '_ {
    let mut finder = LinkFinder::new();
    finder.kinds(&[LinkKind::Url]);
    finder
        .links(text)
        .map(|link| link.as_str())
        .filter(|link| has_web_scheme(link) && !ignored_link(link))
}

/// Canonical form of every link in `text`, first occurrence only. Links that
/// don't parse are logged and dropped.
pub fn unique_links(text: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for raw in extract_links(text) {
        match canonical_url(raw) {
            Ok(url) => {
                let url = String::from(url);
                if !links.contains(&url) {
                    links.push(url);
                }
            }
            Err(why) => warn!("Failed to canonicalize {raw}: {why}"),
        }
    }
    links
}
