//! Dot-path lookups into nested configuration data.
//!
//! `"view.paths.0"` walks object keys and array indices. Object keys may
//! themselves contain dots: at every level the longest matching key wins, so
//! `{"view.blade": {...}}` is reachable as `"view.blade"`.

use serde_json::{Map, Value as Json};

/// Find the value at `path` inside `root`. An empty path returns `root`.
pub fn query<'a>(root: &'a Json, path: &str) -> Option<&'a Json> {
    if path.is_empty() {
        return Some(root);
    }

    match root {
        Json::Object(map) => query_map(map, path),
        Json::Array(items) => {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, rest),
                None => (path, ""),
            };
            let index: usize = head.parse().ok()?;
            query(items.get(index)?, rest)
        }
        _ => None,
    }
}

/// Like [`query`], starting from an object's entries.
pub fn query_map<'a>(map: &'a Map<String, Json>, path: &str) -> Option<&'a Json> {
    for (head, rest) in prefix_splits(path) {
        let Some(child) = map.get(head) else {
            continue;
        };
        if rest.is_empty() {
            return Some(child);
        }
        if let Some(found) = query(child, rest) {
            return Some(found);
        }
    }
    None
}

/// Every split of `path` on a dot boundary, longest head first.
///
/// The first item is the whole path with an empty rest.
pub fn prefix_splits<'p>(path: &'p str) -> impl Iterator<Item = (&'p str, &'p str)> + 'p {
    std::iter::once((path, "")).chain(
        path.rmatch_indices('.')
            .map(move |(idx, _)| (&path[..idx], &path[idx + 1..])),
    )
}
