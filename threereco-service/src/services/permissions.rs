//! Permission evaluation.
//!
//! Permission strings are dot-separated paths (`materials.create`). A plain
//! grant covers the path itself and every path below it at a `.` boundary,
//! so `users.update` admits `users.update.self`. A `.*` grant is a raw
//! string prefix: `materials.*` admits anything starting with `materials`.
//! `*` alone is the global grant.
//!
//! Plain grants are compiled into a segment trie once per principal; checks
//! walk the required permission's segments until they meet a granted node.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
struct Node {
    granted: bool,
    children: HashMap<String, Node>,
}

#[derive(Debug, Default, Clone)]
pub struct PermissionSet {
    global: bool,
    root: Node,
    /// Prefixes of `.*` grants with the suffix removed.
    subtrees: Vec<String>,
}

impl PermissionSet {
    pub fn new<I, S>(grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for grant in grants {
            set.grant(grant.as_ref());
        }
        set
    }

    fn grant(&mut self, permission: &str) {
        let permission = permission.trim();
        if permission.is_empty() {
            return;
        }
        if permission == "*" {
            self.global = true;
            return;
        }

        if let Some(prefix) = permission.strip_suffix(".*") {
            self.subtrees.push(prefix.to_string());
        }

        let mut node = &mut self.root;
        for segment in permission.split('.') {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.granted = true;
    }

    /// Whether a single required permission is satisfied.
    pub fn allows(&self, required: &str) -> bool {
        let required = required.trim();
        if self.global {
            return true;
        }
        if self.subtrees.iter().any(|prefix| required.starts_with(prefix.as_str())) {
            return true;
        }

        let mut node = &self.root;
        for segment in required.split('.') {
            match node.children.get(segment) {
                Some(child) if child.granted => return true,
                Some(child) => node = child,
                None => return false,
            }
        }
        false
    }

    /// Any-of check. An empty requirement admits every principal.
    pub fn allows_any<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.is_empty() || required.iter().any(|r| self.allows(r.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        !self.global && self.subtrees.is_empty() && self.root.children.is_empty()
    }
}

/// Pairwise form of the matching relation used by [`PermissionSet`].
pub fn matches(granted: &str, required: &str) -> bool {
    let (p, r) = (granted.trim(), required.trim());
    if p.is_empty() {
        return false;
    }
    if p == "*" || p == r {
        return true;
    }
    if p.strip_suffix(".*").is_some_and(|prefix| r.starts_with(prefix)) {
        return true;
    }
    r.strip_prefix(p).is_some_and(|rest| rest.starts_with('.'))
}
