//! UTC instant parsing and formatting.
//!
//! Every instant that enters the store or leaves the API goes through here.
//! Stored and serialized form is RFC 3339 with second precision and a
//! trailing `Z`, which keeps lexical order equal to chronological order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

use crate::error::{Error, Result};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Drop a `Z` that directly follows an explicit numeric offset
/// (`2025-09-07T18:30:00+00:00Z`), a form older clients wrote.
fn strip_redundant_zulu(s: &str) -> &str {
    let Some(body) = s.strip_suffix(['Z', 'z']) else {
        return s;
    };
    let b = body.as_bytes();
    if b.len() < 6 {
        return s;
    }
    let tail = &b[b.len() - 6..];
    let is_offset = matches!(tail[0], b'+' | b'-')
        && tail[1].is_ascii_digit()
        && tail[2].is_ascii_digit()
        && tail[3] == b':'
        && tail[4].is_ascii_digit()
        && tail[5].is_ascii_digit();
    if is_offset {
        body
    } else {
        s
    }
}

fn parse_with_offset(s: &str) -> Option<DateTime<Utc>> {
    let s = strip_redundant_zulu(s.trim());
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Parse a client-supplied instant. An explicit offset or `Z` is required.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    parse_with_offset(s).ok_or_else(|| {
        Error::validation(format!(
            "invalid date-time '{s}': expected ISO-8601 with an offset or 'Z'"
        ))
    })
}

/// Parse a stored instant, also accepting naive timestamps (taken as UTC).
/// Returns `None` for anything unparsable.
pub fn parse_legacy_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Some(t) = parse_with_offset(s) {
        return Some(t);
    }
    let s = s.trim();
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn format_instant(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Truncate to the precision the store keeps.
pub fn to_stored_precision(t: DateTime<Utc>) -> DateTime<Utc> {
    t.trunc_subsecs(0)
}

/// Serde adapters that write instants in the canonical `...Z` form.
pub mod serde_instant {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_instant(*t))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            t: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_str(&super::super::format_instant(*t)),
                None => s.serialize_none(),
            }
        }
    }
}
