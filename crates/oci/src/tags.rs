//! Tag ordering and publish tag computation.

use semver::Version;
use std::cmp::Ordering;
use tracing::warn;

use crate::{Error, Result};

/// The floating tag that always points at the newest release.
pub(crate) const LATEST_TAG: &str = "latest";

/// Sort tags by version precedence with `latest` first.
///
/// Tags compare dot-separated identifier by identifier: numeric identifiers
/// numerically and before alphanumeric ones, alphanumeric ones lexically,
/// and a prefix before the longer tag (`1` < `1.0.0` < `1.0.1`). A
/// pre-release suffix sorts before the release it precedes.
#[must_use]
pub fn sort_tags(tags: Vec<String>) -> Vec<String> {
    let has_latest = tags.iter().any(|tag| tag == LATEST_TAG);
    let mut versions: Vec<String> = tags.into_iter().filter(|tag| tag != LATEST_TAG).collect();
    versions.sort_by(|a, b| compare_tags(a, b));

    if has_latest {
        versions.insert(0, LATEST_TAG.to_string());
    }
    versions
}

fn compare_tags(a: &str, b: &str) -> Ordering {
    let (core_a, pre_a) = split_tag(a);
    let (core_b, pre_b) = split_tag(b);

    compare_dotted(core_a, core_b).then_with(|| match (pre_a, pre_b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_dotted(x, y),
    })
}

/// `1.0.0-rc.1+build` -> (`1.0.0`, Some(`rc.1`))
fn split_tag(tag: &str) -> (&str, Option<&str>) {
    let tag = tag.split_once('+').map_or(tag, |(version, _)| version);
    match tag.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (tag, None),
    }
}

fn compare_dotted(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => match compare_identifier(x, y) {
                Ordering::Equal => {}
                other => return other,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

fn compare_identifier(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    match (numeric(a), numeric(b)) {
        (true, true) => {
            let (a, b) = (a.trim_start_matches('0'), b.trim_start_matches('0'));
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

/// Tags to bind when publishing `version`, given the tags already published.
///
/// Publishing `1.2.3` moves `1`, `1.2` and `latest` only when `1.2.3` is
/// newer than every published release each of them currently covers.
/// Returns `None` when `version` is already published.
///
/// # Errors
///
/// Returns [`Error::InvalidVersion`] if `version` is not valid semver.
pub fn semantic_tags(version: &str, published: &[String]) -> Result<Option<Vec<String>>> {
    if published.iter().any(|tag| tag == version) {
        warn!(version, "Version already published, skipping");
        return Ok(None);
    }

    let parsed = Version::parse(version).map_err(|e| Error::InvalidVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })?;

    let releases: Vec<Version> = published
        .iter()
        .filter_map(|tag| Version::parse(tag).ok())
        .filter(|v| v.pre.is_empty())
        .collect();
    let is_newest = |covers: &dyn Fn(&Version) -> bool| {
        releases
            .iter()
            .filter(|v| covers(v))
            .max()
            .is_none_or(|max| parsed > *max)
    };

    let mut tags = Vec::with_capacity(4);
    if is_newest(&|v| v.major == parsed.major) {
        tags.push(parsed.major.to_string());
    }
    if is_newest(&|v| v.major == parsed.major && v.minor == parsed.minor) {
        tags.push(format!("{}.{}", parsed.major, parsed.minor));
    }
    tags.push(version.to_string());
    if is_newest(&|_| true) {
        tags.push(LATEST_TAG.to_string());
    }

    Ok(Some(tags))
}
