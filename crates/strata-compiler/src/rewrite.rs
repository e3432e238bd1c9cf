//! Reference rewriting
//!
//! `ref` embeds the backquoted canonical rendering of a target at call time.
//! Once every action is registered, actions whose effective target differs
//! from their canonical target contribute a rewrite pair, and every action's
//! SQL text is patched in one global pass. Keys and replacements are always
//! complete backquoted renderings, so only whole reference tokens can match;
//! unrelated SQL text containing similar substrings is left alone.

use std::collections::BTreeMap;

/// Map from backquoted canonical rendering to backquoted effective rendering
pub type RewriteMap = BTreeMap<String, String>;

/// Rewrite every embedded reference token in `text` according to `map`.
///
/// No-op for an empty map. Applying the same map twice yields no further
/// change, because replacements are effective renderings which never appear
/// as keys.
pub fn rewrite_references(text: &str, map: &RewriteMap) -> String {
    if map.is_empty() {
        return text.to_string();
    }
    let mut result = text.to_string();
    for (canonical, effective) in map {
        result = result.replace(canonical, effective);
    }
    result
}
