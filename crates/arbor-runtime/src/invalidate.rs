//! Invalidation: cancelling in-flight work and distrusting stored results.

use crate::clock::now_ms;
use crate::runtime::Runtime;
use arbor_state::{ArborError, ArborResult, Event, OpKind};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Cascade and cleanup options for [`Runtime::invalidate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvalidateOptions {
    /// Also invalidate every tracked strict descendant of the path.
    pub include_children: bool,
    /// Also invalidate every tracked ancestor of the path.
    pub include_parents: bool,
    /// Delete the stored data at each invalidated path.
    pub clear_data: bool,
}

impl Runtime {
    /// Invalidate a path: cancel its commands, reset its status, and
    /// optionally cascade to tracked descendants/ancestors and clear data.
    pub fn invalidate(&self, path: &str, options: &InvalidateOptions) {
        let resolved = self.store().state().resolve(path).to_string();
        let tracked: Vec<String> = self.store().state().status.keys().cloned().collect();

        let mut candidates = vec![resolved.clone()];
        if options.include_children {
            candidates.extend(
                tracked
                    .iter()
                    .filter(|key| is_strict_descendant(key, &resolved))
                    .cloned(),
            );
        }
        if options.include_parents {
            candidates.extend(
                tracked
                    .iter()
                    .filter(|key| is_strict_descendant(&resolved, key))
                    .cloned(),
            );
        }
        candidates.dedup();
        // Descendants are strict string extensions of their ancestors, so
        // length-descending order clears children before parents and a
        // delete never recreates a just-cleared container.
        candidates.sort_by_key(|path| std::cmp::Reverse(path.len()));

        tracing::debug!(path = %resolved, count = candidates.len(), "invalidating");
        for candidate in candidates {
            self.invalidate_one(&candidate, options.clear_data);
        }
    }

    /// Invalidate every tracked status path matching a glob-like pattern.
    ///
    /// `*` matches any run of characters; everything else, bracketed
    /// indices included, matches literally. Returns the number of paths
    /// invalidated; a malformed pattern fails without touching state.
    pub fn invalidate_pattern(&self, pattern: &str) -> ArborResult<usize> {
        let matcher = compile_pattern(pattern)?;
        let matches: Vec<String> = self
            .store()
            .state()
            .status
            .keys()
            .filter(|key| matcher.is_match(key))
            .cloned()
            .collect();
        for path in &matches {
            self.invalidate_one(path, false);
        }
        Ok(matches.len())
    }

    /// Abort every queued and executing command and cancel every tracked
    /// status path.
    pub fn invalidate_all(&self) {
        let aborted = self.queue().cancel_all();
        tracing::debug!(aborted, "invalidate_all");
        let tracked: Vec<String> = self.store().state().status.keys().cloned().collect();
        for path in tracked {
            self.dispatch_cancel(&path);
        }
    }

    fn invalidate_one(&self, path: &str, clear_data: bool) {
        self.queue().cancel_by_xpath(path);
        self.dispatch_cancel(path);
        if clear_data {
            self.store().dispatch(&Event::DataOperation {
                path: path.to_string(),
                kind: OpKind::Delete,
                value: None,
            });
        }
    }

    fn dispatch_cancel(&self, path: &str) {
        let request_id = self
            .store()
            .state()
            .status
            .get(path)
            .map(|record| record.request_id.clone())
            .unwrap_or_default();
        self.store().dispatch(&Event::AsyncCancel {
            path: path.to_string(),
            request_id,
            timestamp: now_ms(),
        });
    }
}

/// Whether `candidate` addresses a location strictly inside `base`:
/// a string-prefix match that ends on a segment boundary.
fn is_strict_descendant(candidate: &str, base: &str) -> bool {
    if candidate == base {
        return false;
    }
    if base == "/" {
        return candidate.len() > 1 && candidate.starts_with('/');
    }
    candidate
        .strip_prefix(base)
        .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('['))
}

fn compile_pattern(pattern: &str) -> ArborResult<Regex> {
    let mut source = String::with_capacity(pattern.len() + 4);
    source.push('^');
    for (i, literal) in pattern.split('*').enumerate() {
        if i > 0 {
            source.push_str(".*");
        }
        source.push_str(&regex::escape(literal));
    }
    source.push('$');
    Regex::new(&source).map_err(|_| ArborError::invalid_pattern(pattern))
}
