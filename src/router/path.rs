//! Decomposition of route patterns and request paths into segments.
//!
//! Both sides split on `/` and drop empty pieces, so `/a//b/` and `/a/b` are
//! the same path and `/` has no segments at all.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;

use super::RouteError;

pub(crate) const PARAM_MARKER: char = ':';
pub(crate) const WILDCARD_MARKER: char = '*';

/// One token of a route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    Wildcard(&'a str),
}

/// Splits a request path, skipping empty segments.
pub(crate) fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Percent-decodes a bound value. Input that does not decode to UTF-8 is
/// returned unchanged.
pub(crate) fn decode(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(text) => text.into_owned(),
        Err(_) => raw.to_owned(),
    }
}

/// Parses and validates a route pattern.
///
/// Rejects patterns that are empty or relative, markers without a name, a
/// wildcard anywhere but last, and a name bound twice in the same pattern.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::InvalidPath {
            path: pattern.to_owned(),
        });
    }

    let raw: Vec<&str> = split(pattern).collect();
    let mut segments = Vec::with_capacity(raw.len());
    let mut bound = HashSet::new();

    for (i, token) in raw.iter().enumerate() {
        let segment = classify(pattern, token)?;

        match segment {
            Segment::Static(_) => {}
            Segment::Param(name) | Segment::Wildcard(name) => {
                if !bound.insert(name) {
                    return Err(RouteError::DuplicateParamName {
                        path: pattern.to_owned(),
                        name: name.to_owned(),
                    });
                }
            }
        }

        if let Segment::Wildcard(name) = segment {
            if i + 1 != raw.len() {
                return Err(RouteError::MisplacedWildcard {
                    path: pattern.to_owned(),
                    name: name.to_owned(),
                });
            }
        }

        segments.push(segment);
    }

    Ok(segments)
}

fn classify<'a>(pattern: &str, token: &'a str) -> Result<Segment<'a>, RouteError> {
    let (marker, name, make): (char, &str, fn(&'a str) -> Segment<'a>) =
        if let Some(name) = token.strip_prefix(PARAM_MARKER) {
            (PARAM_MARKER, name, Segment::Param)
        } else if let Some(name) = token.strip_prefix(WILDCARD_MARKER) {
            (WILDCARD_MARKER, name, Segment::Wildcard)
        } else {
            return Ok(Segment::Static(token));
        };

    if name.is_empty() {
        return Err(RouteError::MissingName {
            path: pattern.to_owned(),
            segment: token.to_owned(),
            marker,
        });
    }
    Ok(make(name))
}
