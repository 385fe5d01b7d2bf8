//! Moniker path grammar and parser.
//!
//! A moniker is a hierarchical name identifying a data asset:
//!
//! ```text
//! moniker   := [namespace "@"] domain ["/" segments] ["@" version] ["/v" revision] ["?" params]
//! namespace := identifier
//! domain    := dotted_identifier            (e.g. prices.equity)
//! segments  := segment ("/" segment)*
//! segment   := [A-Za-z0-9_.\-]+ | "ALL"
//! version   := "latest" | YYYYMMDD
//! revision  := positive integer
//! ```
//!
//! Examples: `prices.equity/AAPL@20260115`, `rates.libor/usd`,
//! `user@analytics.risk/views/my-watchlist@latest/v3?fields=px_last`.
//!
//! Parsing is greedy-left: the `?params` section is split off first, then a
//! trailing `/vN` revision, then a trailing `@version`; the remainder splits
//! on the first `/` into `[namespace@]domain` and segments. Leading and
//! trailing slashes are tolerated. The canonical string form round-trips
//! through [`MonikerPath::parse`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, MonikerErrorKind, Result};

/// Segment names longer than this are rejected outright.
const MAX_SEGMENT_LEN: usize = 128;

/// A parsed version suffix (`@latest` or `@YYYYMMDD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonikerVersion {
    /// The symbolic `latest` version.
    Latest,
    /// A concrete calendar date.
    Date(NaiveDate),
}

impl MonikerVersion {
    /// Returns the raw suffix text (`latest` or `YYYYMMDD`).
    #[must_use]
    pub fn raw(&self) -> String {
        match self {
            Self::Latest => "latest".to_string(),
            Self::Date(date) => date.format("%Y%m%d").to_string(),
        }
    }

    /// Returns true for the symbolic `latest` version.
    #[must_use]
    pub const fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }
}

impl fmt::Display for MonikerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

impl Serialize for MonikerVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw())
    }
}

impl<'de> Deserialize<'de> for MonikerVersion {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_version(&raw).map_err(serde::de::Error::custom)
    }
}

/// The parsed form of a moniker string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonikerPath {
    /// Optional scope prefix (`user`, `verified`, `official`, or arbitrary).
    pub namespace: Option<String>,
    /// Required dotted domain, e.g. `prices.equity`.
    pub domain: String,
    /// Ordered path parts after the domain.
    pub segments: Vec<String>,
    /// Optional `@version` suffix.
    pub version: Option<MonikerVersion>,
    /// Optional `/vN` revision.
    pub revision: Option<u32>,
    /// Query parameters, sorted by name.
    pub params: BTreeMap<String, String>,
}

impl MonikerPath {
    /// Parses a raw moniker string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMoniker`] with a sub-reason describing the
    /// first rejected component.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_moniker(
                MonikerErrorKind::BadDomain,
                "empty moniker string",
            ));
        }

        // 1. Split off ?params.
        let (rest, params) = match trimmed.split_once('?') {
            Some((rest, query)) => (rest, parse_params(query)?),
            None => (trimmed, BTreeMap::new()),
        };

        let rest = rest.trim_matches('/');
        if rest.is_empty() {
            return Err(Error::invalid_moniker(
                MonikerErrorKind::BadDomain,
                "moniker has no domain",
            ));
        }

        // 2. Split off a trailing /vN revision.
        let (rest, revision) = split_revision(rest)?;

        // 3. Split off a trailing @version.
        let (rest, version) = split_version(rest)?;

        if rest.is_empty() {
            return Err(Error::invalid_moniker(
                MonikerErrorKind::BadDomain,
                "moniker has no domain",
            ));
        }

        // 4. The remainder splits on the first '/': [namespace@]domain / segments.
        let (head, tail) = match rest.split_once('/') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };

        let (namespace, domain) = match head.split_once('@') {
            Some((ns, dom)) => {
                validate_namespace(ns)?;
                (Some(ns.to_string()), dom)
            }
            None => (None, head),
        };
        validate_domain(domain)?;

        let mut segments = Vec::new();
        if let Some(tail) = tail {
            for segment in tail.split('/') {
                validate_segment(segment)?;
                segments.push(segment.to_string());
            }
        }

        Ok(Self {
            namespace,
            domain: domain.to_string(),
            segments,
            version,
            revision,
            params,
        })
    }

    /// Returns the registry lookup key: `domain` plus the segments joined
    /// by `/`. The namespace is preserved on the path but does not
    /// discriminate registry keys.
    #[must_use]
    pub fn registry_key(&self) -> String {
        if self.segments.is_empty() {
            self.domain.clone()
        } else {
            format!("{}/{}", self.domain, self.segments.join("/"))
        }
    }

    /// Returns the canonical string form. Parsing the result yields an
    /// equal `MonikerPath`.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MonikerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}@")?;
        }
        write!(f, "{}", self.domain)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        if let Some(revision) = self.revision {
            write!(f, "/v{revision}")?;
        }
        if !self.params.is_empty() {
            let mut sep = '?';
            for (key, value) in &self.params {
                write!(f, "{sep}{key}={value}")?;
                sep = '&';
            }
        }
        Ok(())
    }
}

impl FromStr for MonikerPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Normalizes a moniker string to its canonical form.
///
/// # Errors
///
/// Returns [`Error::InvalidMoniker`] if the string cannot be parsed.
pub fn canonicalize(input: &str) -> Result<String> {
    Ok(MonikerPath::parse(input)?.to_string())
}

fn parse_params(query: &str) -> Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    if query.is_empty() {
        return Ok(params);
    }
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            return Err(Error::invalid_moniker(
                MonikerErrorKind::BadParams,
                format!("empty parameter name in '{query}'"),
            ));
        }
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}

fn split_revision(rest: &str) -> Result<(&str, Option<u32>)> {
    let Some(idx) = rest.rfind('/') else {
        return Ok((rest, None));
    };
    let tail = &rest[idx + 1..];
    let Some(digits) = tail.strip_prefix('v') else {
        return Ok((rest, None));
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok((rest, None));
    }
    let revision: u32 = digits.parse().map_err(|_| {
        Error::invalid_moniker(
            MonikerErrorKind::BadRevision,
            format!("revision out of range: '{tail}'"),
        )
    })?;
    if revision == 0 {
        return Err(Error::invalid_moniker(
            MonikerErrorKind::BadRevision,
            "revision must be a positive integer",
        ));
    }
    Ok((&rest[..idx], Some(revision)))
}

fn split_version(rest: &str) -> Result<(&str, Option<MonikerVersion>)> {
    let Some(idx) = rest.rfind('@') else {
        return Ok((rest, None));
    };
    let candidate = &rest[idx + 1..];

    // An '@' after the first '/' can only introduce a version: segments
    // never contain '@'. An '@' before any '/' may instead be the
    // namespace marker, so an unrecognized suffix there is left alone.
    let in_segment_region = rest[..idx].contains('/');

    match parse_version(candidate) {
        Ok(version) => Ok((&rest[..idx], Some(version))),
        Err(err) if in_segment_region => Err(err),
        Err(_) => Ok((rest, None)),
    }
}

fn parse_version(candidate: &str) -> Result<MonikerVersion> {
    if candidate == "latest" {
        return Ok(MonikerVersion::Latest);
    }
    if candidate.len() == 8 && candidate.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(candidate, "%Y%m%d")
            .map(MonikerVersion::Date)
            .map_err(|_| {
                Error::invalid_moniker(
                    MonikerErrorKind::BadVersion,
                    format!("'{candidate}' is not a valid calendar date"),
                )
            });
    }
    Err(Error::invalid_moniker(
        MonikerErrorKind::BadVersion,
        format!("version must be 'latest' or YYYYMMDD, got '{candidate}'"),
    ))
}

fn validate_namespace(ns: &str) -> Result<()> {
    let valid = !ns.is_empty()
        && ns.as_bytes()[0].is_ascii_alphabetic()
        && ns
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_moniker(
            MonikerErrorKind::BadDomain,
            format!("invalid namespace: '{ns}'"),
        ))
    }
}

fn validate_domain(domain: &str) -> Result<()> {
    let valid = !domain.is_empty()
        && domain.split('.').all(|part| {
            !part.is_empty()
                && part.as_bytes()[0].is_ascii_lowercase()
                && part
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        });
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_moniker(
            MonikerErrorKind::BadDomain,
            format!("invalid domain: '{domain}'"),
        ))
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::invalid_moniker(
            MonikerErrorKind::BadSegment,
            "empty path segment",
        ));
    }
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(Error::invalid_moniker(
            MonikerErrorKind::BadSegment,
            format!("segment exceeds {MAX_SEGMENT_LEN} characters"),
        ));
    }
    let valid = segment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_moniker(
            MonikerErrorKind::BadSegment,
            format!("invalid path segment: '{segment}'"),
        ))
    }
}
