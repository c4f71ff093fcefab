//! Free-form stop lookup.
//!
//! A query is tried, in order, as a stop id, a stop code, a full stop name
//! (case-insensitive) and finally a name substring. The first strategy with
//! any match wins. Callers that need a single stop take the first element;
//! for name and substring matches that is the first stop in load order, so
//! an ambiguous query silently picks one of several stops.

use crate::error::{Error, Result};
use crate::gtfs::{ReferenceIndex, Stop};

/// Returns every stop matching `query`, possibly none.
pub fn resolve_stops<'a>(query: &str, index: &'a ReferenceIndex) -> Vec<&'a Stop> {
    let q = query.trim();

    if let Some(stop) = index.stop(q) {
        return vec![stop];
    }
    if let Some(stop) = index.stop_by_code(q) {
        return vec![stop];
    }

    let by_name = index.stops_named(q);
    if !by_name.is_empty() {
        return by_name;
    }

    let needle = q.to_lowercase();
    index
        .stops()
        .filter(|s| s.stop_name.to_lowercase().contains(&needle))
        .collect()
}

/// Resolves `query` to a single stop, the first match.
///
/// # Errors
///
/// Returns [`Error::StopNotFound`] when nothing matches.
pub fn resolve_stop<'a>(query: &str, index: &'a ReferenceIndex) -> Result<&'a Stop> {
    resolve_stops(query, index)
        .into_iter()
        .next()
        .ok_or_else(|| Error::StopNotFound {
            query: query.trim().to_string(),
        })
}
