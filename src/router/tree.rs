//! The path tree: one node per pattern segment, shared across methods.
//!
//! Each node owns its children outright. A node may have any number of
//! static children, at most one parameter child, and at most one wildcard
//! child. A node that ends at least one registered pattern carries a
//! method table.
//!
//! Lookup walks one segment at a time and tries children in a fixed order:
//! static, then parameter, then wildcard. If a branch dead-ends further down,
//! the walk backs up and tries the next kind, so a static route never hides
//! a parameter route that would have matched the rest of the path.

use std::collections::BTreeMap;

use super::{
    RouteError,
    path::{self, Segment},
};
use crate::{Method, context::Params};

/// A successful lookup: the stored value and the bindings captured on the way.
#[derive(Debug)]
pub struct Match<'t, T> {
    pub value: &'t T,
    pub params: Params,
}

/// A segment tree mapping `(method, path)` to values of type `T`.
///
/// # Examples
///
/// ```
/// use kami::Method;
/// use kami::router::PathTree;
///
/// let mut tree = PathTree::new();
/// tree.insert(Method::Get, "/user/:id", "detail").unwrap();
/// tree.insert(Method::Get, "/user/list", "list").unwrap();
///
/// let hit = tree.lookup(&Method::Get, "/user/list").unwrap();
/// assert_eq!(*hit.value, "list");
///
/// let hit = tree.lookup(&Method::Get, "/user/bob").unwrap();
/// assert_eq!(*hit.value, "detail");
/// assert_eq!(hit.params.get("id"), Some("bob"));
/// ```
#[derive(Debug)]
pub struct PathTree<T> {
    root: Node<T>,
    routes: usize,
}

#[derive(Debug)]
struct Node<T> {
    // Literal text for static nodes, bound name for parameter/wildcard nodes.
    prefix: String,
    static_children: Vec<Node<T>>,
    param_child: Option<Box<Node<T>>>,
    wildcard_child: Option<Box<Node<T>>>,
    methods: BTreeMap<Method, T>,
}

impl<T> Default for PathTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathTree<T> {
    pub fn new() -> Self {
        Self {
            root: Node::new(""),
            routes: 0,
        }
    }

    /// Number of distinct `(method, pattern)` pairs stored.
    pub fn len(&self) -> usize {
        self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }

    /// Stores `value` for `method` at `pattern`.
    ///
    /// Returns the value previously stored for the same method and pattern, if
    /// any; the new value replaces it.
    ///
    /// # Errors
    ///
    /// Any [`RouteError`] from pattern validation, or a conflict with a route
    /// already in the tree. On error the tree is unchanged.
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) -> Result<Option<T>, RouteError> {
        let segments = path::parse_pattern(pattern)?;
        self.root.check(&segments, pattern)?;

        let replaced = self.root.insert(&segments).methods.insert(method, value);
        if replaced.is_none() {
            self.routes += 1;
        }
        Ok(replaced)
    }

    /// Finds the value registered for `method` that matches `path`.
    ///
    /// Returns `None` both when no pattern matches and when the matching
    /// pattern has no entry for `method`. Paths that are empty or do not start
    /// with `/` never match.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<Match<'_, T>> {
        let (node, params) = self.resolve(path, |node| node.methods.contains_key(method))?;
        let value = node.methods.get(method)?;
        Some(Match { value, params })
    }

    /// Lists the methods registered on the pattern that `path` resolves to,
    /// regardless of request method. Empty when nothing matches.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.resolve(path, |node| !node.methods.is_empty())
            .map(|(node, _)| node.methods.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn resolve<F>(&self, path: &str, accept: F) -> Option<(&Node<T>, Params)>
    where
        F: Fn(&Node<T>) -> bool,
    {
        if !path.starts_with('/') {
            return None;
        }
        let segments: Vec<&str> = path::split(path).collect();
        let mut bindings = Vec::new();
        let node = self.root.find(&segments, &accept, &mut bindings)?;
        Some((node, bindings.into_iter().collect()))
    }
}

impl<T> Node<T> {
    fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
            methods: BTreeMap::new(),
        }
    }

    // Read-only pass over the existing edges so a rejected pattern leaves no
    // half-built branch behind.
    fn check(&self, segments: &[Segment<'_>], pattern: &str) -> Result<(), RouteError> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(());
        };

        match *first {
            Segment::Static(text) => match self.static_children.iter().find(|c| c.prefix == text) {
                Some(child) => child.check(rest, pattern),
                None => Ok(()),
            },
            Segment::Param(name) => match self.param_child.as_deref() {
                Some(child) if child.prefix != name => Err(RouteError::ParamNameConflict {
                    path: pattern.to_owned(),
                    existing: child.prefix.clone(),
                    new: name.to_owned(),
                }),
                Some(child) => child.check(rest, pattern),
                None => Ok(()),
            },
            Segment::Wildcard(name) => match self.wildcard_child.as_deref() {
                Some(child) if child.prefix != name => Err(RouteError::DuplicateWildcard {
                    path: pattern.to_owned(),
                    existing: child.prefix.clone(),
                    new: name.to_owned(),
                }),
                _ => Ok(()),
            },
        }
    }

    // Creates missing nodes along `segments` and returns the terminal one.
    // Assumes `check` already accepted the pattern.
    fn insert(&mut self, segments: &[Segment<'_>]) -> &mut Node<T> {
        let Some((first, rest)) = segments.split_first() else {
            return self;
        };

        let child = match *first {
            Segment::Static(text) => {
                match self.static_children.iter().position(|c| c.prefix == text) {
                    Some(i) => &mut self.static_children[i],
                    None => {
                        self.static_children.push(Node::new(text));
                        let last = self.static_children.len() - 1;
                        &mut self.static_children[last]
                    }
                }
            }
            Segment::Param(name) => &mut **self
                .param_child
                .get_or_insert_with(|| Box::new(Node::new(name))),
            Segment::Wildcard(name) => &mut **self
                .wildcard_child
                .get_or_insert_with(|| Box::new(Node::new(name))),
        };
        child.insert(rest)
    }

    // Depth-first search in static > parameter > wildcard order. On failure
    // `bindings` is restored to what it was on entry.
    fn find<'t, F>(
        &'t self,
        segments: &[&str],
        accept: &F,
        bindings: &mut Vec<(&'t str, String)>,
    ) -> Option<&'t Node<T>>
    where
        F: Fn(&Node<T>) -> bool,
    {
        let Some((first, rest)) = segments.split_first() else {
            return accept(self).then_some(self);
        };

        if let Some(child) = self.static_children.iter().find(|c| c.prefix == *first) {
            if let Some(found) = child.find(rest, accept, bindings) {
                return Some(found);
            }
        }

        if let Some(child) = self.param_child.as_deref() {
            bindings.push((child.prefix.as_str(), path::decode(first)));
            if let Some(found) = child.find(rest, accept, bindings) {
                return Some(found);
            }
            bindings.pop();
        }

        let wildcard = self.wildcard_child.as_deref().filter(|&w| accept(w))?;
        bindings.push((wildcard.prefix.as_str(), path::decode(&segments.join("/"))));
        Some(wildcard)
    }
}
