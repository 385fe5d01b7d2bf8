//! Query template expansion.
//!
//! Source bindings carry query templates with `{placeholder}` slots that
//! are filled from a parsed [`MonikerPath`] at resolve time. Two families
//! of placeholders exist:
//!
//! Raw values:
//!
//! | placeholder | substitution |
//! |---|---|
//! | `{path}` | segments joined by `/` |
//! | `{segments[N]}` | Nth segment (0-indexed); error when out of range |
//! | `{version}` | raw version suffix, or empty when absent |
//! | `{revision}` | revision digits, or empty |
//! | `{namespace}` | namespace, or empty |
//!
//! SQL-translated values:
//!
//! | placeholder | substitution |
//! |---|---|
//! | `{version_date}` | `CURRENT_DATE()` / `'__LATEST__'` / `TO_DATE('YYYYMMDD','YYYYMMDD')` |
//! | `{filter[N]:column}` | `column = '<segment>'`, or `1=1` when the segment is `ALL` |
//! | `{is_all[N]}` | `'true'` when segment N is `ALL`, else `'false'` |
//! | `{is_latest}` | `'true'` when the version is `latest`, else `'false'` |
//!
//! Segment values are single-quoted with embedded quotes doubled. An
//! unknown placeholder fails the expansion with
//! [`Error::TemplateMissing`] naming the offending slot.

use crate::error::{Error, Result};
use crate::moniker::{MonikerPath, MonikerVersion};

/// Sentinel emitted for `{version_date}` when the version is `latest`;
/// downstream adapters replace it with a dialect-specific subquery.
pub const LATEST_SENTINEL: &str = "'__LATEST__'";

/// Expands every placeholder in `template` using `path`.
///
/// # Errors
///
/// Returns [`Error::TemplateMissing`] for unknown placeholders,
/// unterminated braces, or out-of-range `{segments[N]}` indexes.
pub fn expand(template: &str, path: &MonikerPath) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return Err(Error::template_missing(after.trim()));
        };
        let token = &after[..close];
        out.push_str(&substitute(token, path)?);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn substitute(token: &str, path: &MonikerPath) -> Result<String> {
    match token {
        "path" => return Ok(path.segments.join("/")),
        "namespace" => return Ok(path.namespace.clone().unwrap_or_default()),
        "version" => return Ok(path.version.as_ref().map(MonikerVersion::raw).unwrap_or_default()),
        "revision" => {
            return Ok(path.revision.map(|r| r.to_string()).unwrap_or_default());
        }
        "version_date" => return Ok(version_date_sql(path)),
        "is_latest" => {
            return Ok(sql_bool(matches!(path.version, Some(MonikerVersion::Latest))));
        }
        _ => {}
    }

    if let Some(idx) = indexed(token, "segments") {
        let idx = idx?;
        return path.segments.get(idx).cloned().ok_or_else(|| {
            Error::template_missing(format!("segments[{idx}]"))
        });
    }

    if let Some(idx) = indexed(token, "is_all") {
        let idx = idx?;
        let is_all = path
            .segments
            .get(idx)
            .is_some_and(|s| s.eq_ignore_ascii_case("ALL"));
        return Ok(sql_bool(is_all));
    }

    if let Some(rest) = token.strip_prefix("filter[") {
        let (idx, column) = rest
            .split_once("]:")
            .ok_or_else(|| Error::template_missing(token))?;
        let idx: usize = idx
            .parse()
            .map_err(|_| Error::template_missing(token))?;
        return Ok(segment_filter_sql(path, idx, column));
    }

    Err(Error::template_missing(token))
}

/// Parses `name[N]` tokens; returns `None` when the prefix does not match.
fn indexed(token: &str, name: &str) -> Option<Result<usize>> {
    let rest = token.strip_prefix(name)?.strip_prefix('[')?;
    let digits = rest.strip_suffix(']')?;
    Some(
        digits
            .parse::<usize>()
            .map_err(|_| Error::template_missing(token)),
    )
}

fn version_date_sql(path: &MonikerPath) -> String {
    match &path.version {
        None => "CURRENT_DATE()".to_string(),
        Some(MonikerVersion::Latest) => LATEST_SENTINEL.to_string(),
        Some(MonikerVersion::Date(date)) => {
            let raw = date.format("%Y%m%d");
            format!("TO_DATE('{raw}','YYYYMMDD')")
        }
    }
}

fn segment_filter_sql(path: &MonikerPath, idx: usize, column: &str) -> String {
    match path.segments.get(idx) {
        Some(segment) if segment.eq_ignore_ascii_case("ALL") => "1=1".to_string(),
        Some(segment) => format!("{column} = {}", sql_quote(segment)),
        None => "1=1".to_string(),
    }
}

fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn sql_bool(value: bool) -> String {
    if value { "'true'" } else { "'false'" }.to_string()
}
