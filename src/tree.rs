//! Segment tree used to match request paths against registered route patterns.
//!
//! Every HTTP method owns one tree. A node holds one `/`-delimited piece of a pattern;
//! a node whose `pattern` is non-empty terminates a registered route.
//!
//! Children are kept in insertion order. At insertion the first child that either equals
//! the incoming segment or is a wildcard is reused, so once a wildcard exists at a position
//! a later literal registered at the same position is attached to that wildcard node and
//! takes over its route. Lookups try every child that equals the segment or is a wildcard,
//! depth first, and return the first success.

use crate::error::Error;

/// One level of the segment tree.
#[derive(Debug, Default)]
pub struct Node {
    segment: String,
    pattern: String,
    is_wildcard: bool,
    children: Vec<Node>,
}

impl Node {
    pub(crate) fn root() -> Node {
        Node::default()
    }

    fn new(segment: &str) -> Node {
        Node {
            segment: segment.to_owned(),
            pattern: String::new(),
            is_wildcard: is_wildcard(segment),
            children: Vec::new(),
        }
    }

    /// The piece of the pattern stored at this level, e.g. `users`, `:id` or `*filepath`.
    pub fn segment(&self) -> &str {
        self.segment.as_str()
    }

    /// The full registered pattern ending at this node, empty if no route ends here.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Whether this node binds a `:name` segment or a `*name` remainder.
    pub fn is_wildcard(&self) -> bool {
        self.is_wildcard
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    fn is_catch_all(&self) -> bool {
        self.segment.starts_with('*')
    }

    fn is_endpoint(&self) -> bool {
        !self.pattern.is_empty()
    }

    fn matches(&self, segment: &str) -> bool {
        self.segment == segment || self.is_wildcard
    }

    pub(crate) fn insert(&mut self, pattern: &str, segments: &[&str], depth: usize) {
        if segments.len() == depth {
            self.pattern = pattern.to_owned();
            return;
        }

        let segment = segments[depth];
        let idx = match self.children.iter().position(|child| child.matches(segment)) {
            Some(idx) => idx,
            None => {
                self.children.push(Node::new(segment));
                self.children.len() - 1
            }
        };

        self.children[idx].insert(pattern, segments, depth + 1);
    }

    pub(crate) fn search(&self, segments: &[&str], depth: usize) -> Option<&Node> {
        if segments.len() == depth || self.is_catch_all() {
            if self.is_endpoint() {
                return Some(self);
            }

            // A catch-all also matches an empty remainder: `/static/*filepath` serves `/static/`.
            if segments.len() == depth {
                return self
                    .children
                    .iter()
                    .find(|child| child.is_catch_all() && child.is_endpoint());
            }

            return None;
        }

        let segment = segments[depth];
        self.children
            .iter()
            .filter(|child| child.matches(segment))
            .find_map(|child| child.search(segments, depth + 1))
    }
}

fn is_wildcard(segment: &str) -> bool {
    segment.starts_with(':') || segment.starts_with('*')
}

/// Splits a pattern or a request path into its segments.
///
/// Empty pieces are dropped and nothing after the first catch-all segment is kept.
pub(crate) fn parse_pattern(pattern: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        segments.push(segment);
        if segment.starts_with('*') {
            break;
        }
    }
    segments
}

pub(crate) fn validate_pattern(pattern: &str) -> crate::Result<()> {
    if !pattern.starts_with('/') {
        return Err(Error::malformed_pattern(format!("route pattern must begin with '/': {:?}", pattern)).into());
    }

    let segments = pattern.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();
    for (idx, segment) in segments.iter().enumerate() {
        if *segment == ":" {
            return Err(Error::malformed_pattern(format!("unnamed ':' segment in route pattern: {:?}", pattern)).into());
        }

        if segment.starts_with('*') && idx + 1 != segments.len() {
            return Err(Error::malformed_pattern(format!(
                "catch-all segment {:?} must be the last one in route pattern: {:?}",
                segment, pattern
            ))
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(patterns: &[&str]) -> Node {
        let mut root = Node::root();
        for pattern in patterns {
            root.insert(pattern, &parse_pattern(pattern), 0);
        }
        root
    }

    fn lookup<'a>(root: &'a Node, path: &str) -> Option<&'a str> {
        root.search(&parse_pattern(path), 0).map(|n| n.pattern())
    }

    #[test]
    fn should_parse_patterns_into_segments() {
        assert_eq!(parse_pattern("/"), Vec::<&str>::new());
        assert_eq!(parse_pattern("/p/:lang/doc"), vec!["p", ":lang", "doc"]);
        assert_eq!(parse_pattern("//a///b/"), vec!["a", "b"]);
        assert_eq!(parse_pattern("/static/*filepath/ignored/rest"), vec!["static", "*filepath"]);
        assert_eq!(parse_pattern("/*"), vec!["*"]);
    }

    #[test]
    fn should_match_literal_param_and_catch_all_routes() {
        let root = tree(&["/", "/hello", "/hello/:name", "/hello/b/c", "/hi/:name", "/assets/*filepath"]);

        assert_eq!(lookup(&root, "/"), Some("/"));
        assert_eq!(lookup(&root, "/hello"), Some("/hello"));
        assert_eq!(lookup(&root, "/hello/geektutu"), Some("/hello/:name"));
        assert_eq!(lookup(&root, "/hi/there"), Some("/hi/:name"));
        assert_eq!(lookup(&root, "/assets/css/a.css"), Some("/assets/*filepath"));
        assert_eq!(lookup(&root, "/hello/geektutu/extra"), None);
        assert_eq!(lookup(&root, "/hi"), None);
        assert_eq!(lookup(&root, "/nothing"), None);
    }

    #[test]
    fn should_nest_literal_under_existing_wildcard() {
        // "/hello/b/c" hangs under ":name", so any second segment reaches it.
        let root = tree(&["/hello/:name", "/hello/b/c"]);

        assert_eq!(lookup(&root, "/hello/b/c"), Some("/hello/b/c"));
        assert_eq!(lookup(&root, "/hello/x/c"), Some("/hello/b/c"));
        assert_eq!(lookup(&root, "/hello/b"), Some("/hello/:name"));
    }

    #[test]
    fn should_match_catch_all_with_empty_remainder() {
        let root = tree(&["/static/*filepath"]);

        assert_eq!(lookup(&root, "/static/"), Some("/static/*filepath"));
        assert_eq!(lookup(&root, "/static"), Some("/static/*filepath"));
        assert_eq!(lookup(&root, "/"), None);
    }

    #[test]
    fn should_reuse_existing_wildcard_for_later_literal() {
        let root = tree(&["/p/:id", "/p/admin"]);

        let p = &root.children()[0];
        assert_eq!(p.children().len(), 1);
        assert_eq!(p.children()[0].segment(), ":id");
        assert!(p.children()[0].is_wildcard());

        // The literal took over the wildcard node's route.
        assert_eq!(lookup(&root, "/p/admin"), Some("/p/admin"));
        assert_eq!(lookup(&root, "/p/42"), Some("/p/admin"));
    }

    #[test]
    fn should_prefer_earlier_literal_over_later_wildcard() {
        let root = tree(&["/p/admin", "/p/:id"]);

        assert_eq!(root.children()[0].children().len(), 2);
        assert_eq!(lookup(&root, "/p/admin"), Some("/p/admin"));
        assert_eq!(lookup(&root, "/p/42"), Some("/p/:id"));
    }

    #[test]
    fn should_keep_tree_shape_on_repeated_insert() {
        let root = tree(&["/a/:b", "/a/:b"]);

        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].children().len(), 1);
    }

    #[test]
    fn should_validate_patterns() {
        assert!(validate_pattern("/").is_ok());
        assert!(validate_pattern("/a/:b/*c").is_ok());
        assert!(validate_pattern("/files/*").is_ok());
        assert!(validate_pattern("no-slash").is_err());
        assert!(validate_pattern("").is_err());
        assert!(validate_pattern("/a/:/b").is_err());
        assert!(validate_pattern("/a/*rest/b").is_err());
    }
}
