use crate::errors::{Error, Result};

use log::trace;
use phf::{phf_map, phf_set};
use url::Url;

// largely sourced from newhouse/url-tracking-stripper on github

/// Query fields dropped everywhere. Anything starting with `utm_` goes too.
static TRACKING_FIELDS: phf::Set<&'static str> = phf_set! {
    // Mailchimp
    "mc_cid",
    "mc_eid",
    // comScore Digital Analytix
    "ns_source",
    "ns_mchannel",
    "ns_campaign",
    "ns_linkname",
    "ns_fee",
    // Simple Reach
    "sr_share",
    // Facebook / Instagram / Google click identifiers
    "fbclid",
    "igshid",
    "srcid",
    "gclid",
    "ocid",
    "ncid",
    "nr_email_referer",
    // Alibaba-family 'super position model' tracker
    "spm",
};

/// Fields that only mean tracking on particular sites.
static SITE_FIELDS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "twitter.com" => &["s", "t", "ref_src"],
    "x.com" => &["s", "t", "ref_src"],
    "youtube.com" => &["feature", "pp", "si"],
    "reddit.com" => &["share_id", "utm_name"],
    "open.spotify.com" => &["si"],
    "amazon.com" => &["ref", "ref_"],
};

/// Subdomains that serve the same site as the bare domain.
const SITE_PREFIXES: [&str; 3] = ["www.", "m.", "mobile."];

/// Key into `SITE_FIELDS` for a host, `m.youtube.com` and `www.youtube.com`
/// both map to `youtube.com`.
fn site_key(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    SITE_PREFIXES
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .map_or_else(|| host.clone(), str::to_string)
}

fn is_tracking_field(site: &str, field: &str) -> bool {
    field.starts_with("utm_")
        || TRACKING_FIELDS.contains(field)
        || SITE_FIELDS
            .get(site)
            .map_or(false, |fields| fields.contains(&field))
}

/// Rewrites short links to the form the full site uses, so both spellings
/// compare equal.
fn expand_short_link(url: Url) -> Result<Url> {
    match url.host_str() {
        Some("youtu.be") if url.path().len() > 1 => {
            let mut expanded = Url::parse("https://www.youtube.com/watch")?;
            expanded
                .query_pairs_mut()
                .append_pair("v", &url.path()[1..])
                .extend_pairs(url.query_pairs());
            Ok(expanded)
        }
        _ => Ok(url),
    }
}

/// Parses `raw` and strips whatever only exists to track who shared it.
/// Two links to the same content posted from different apps should come
/// out of here identical.
pub fn canonical_url(raw: &str) -> Result<Url> {
    let mut url = expand_short_link(Url::parse(raw)?)?;
    let site = url
        .host_str()
        .map(site_key)
        .ok_or_else(|| Error::Internal(format!("link {raw} has no host")))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(field, _)| !is_tracking_field(&site, field))
        .map(|(field, value)| (field.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    trace!("canonical form of {raw} is {url}");
    Ok(url)
}
