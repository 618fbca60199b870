//! The in-memory projection tree.
//!
//! A node is either an interior directory (name to subtree mapping) or a
//! leaf carrying a file record and its resolved store location. Resolution
//! walks this tagged shape segment by segment and never assumes which of
//! the two it will meet.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use lectern_metadata::File;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A file as it appears in the projection: the metadata record plus where
/// its bytes actually live.
#[derive(Debug, Clone)]
pub struct ProjectedFile {
    pub file: File,
    pub cache_path: PathBuf,
}

/// One node of the projection tree.
#[derive(Debug)]
pub enum Node {
    /// Interior directory mapping child names to subtrees.
    Dir(BTreeMap<String, Node>),
    /// A projected file.
    Leaf(ProjectedFile),
}

impl Node {
    pub fn empty_dir() -> Self {
        Self::Dir(BTreeMap::new())
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir(_))
    }

    /// Inserts a projected file at the given rendered path, creating
    /// interior directories as needed.
    ///
    /// Two files rendering to the same path is a template degeneracy, not a
    /// failure: the later insertion wins, like the later of two writes. A
    /// file path colliding with an existing directory (or needing to
    /// descend *through* an existing file) is dropped instead, since
    /// overwriting would discard a whole subtree.
    pub fn insert(&mut self, rendered: &Path, projected: ProjectedFile) {
        let mut segments: Vec<&str> = Vec::new();
        for component in rendered.components() {
            if let std::path::Component::Normal(name) = component {
                segments.push(name.to_str().unwrap_or_default());
            }
        }
        let Some((leaf_name, dirs)) = segments.split_last() else {
            return;
        };

        let mut current = self;
        for dir in dirs {
            let Node::Dir(children) = current else {
                tracing::warn!(path = %rendered.display(), "projection path collides with a file; skipped");
                return;
            };
            current = children.entry((*dir).to_string()).or_insert_with(Node::empty_dir);
        }
        let Node::Dir(children) = current else {
            return;
        };
        match children.get(*leaf_name) {
            Some(Node::Dir(_)) => {
                tracing::warn!(path = %rendered.display(), "projection path collides with a directory; skipped");
            },
            _ => {
                children.insert((*leaf_name).to_string(), Node::Leaf(projected));
            },
        }
    }

    /// Resolves a path to a node: case-sensitive, segment-by-segment
    /// descent. `.` segments and repeated separators are ignored, `..`
    /// steps back one resolved segment, and stepping above the root or
    /// hitting an unknown name is not-found. Descending *into* a leaf is
    /// not-a-directory.
    pub fn resolve(&self, path: &str) -> Result<&Node> {
        let mut stack: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {},
                ".." => {
                    if stack.pop().is_none() {
                        exn::bail!(ErrorKind::NotFound(path.to_string()));
                    }
                },
                name => stack.push(name),
            }
        }

        let mut current = self;
        for name in stack {
            let Node::Dir(children) = current else {
                exn::bail!(ErrorKind::NotADirectory(path.to_string()));
            };
            current = children
                .get(name)
                .ok_or_raise(|| ErrorKind::NotFound(path.to_string()))?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_metadata::{CourseRef, File};
    use rstest::rstest;
    use time::OffsetDateTime;

    fn projected(id: &str) -> ProjectedFile {
        ProjectedFile {
            file: File {
                id: id.to_string(),
                version: 0,
                name: id.to_string(),
                extension: "pdf".to_string(),
                description: String::new(),
                path: vec![],
                course: CourseRef {
                    id: "c1".to_string(),
                    name: "Algorithms".to_string(),
                    abbrev: "Algo".to_string(),
                    course_type: "Lecture".to_string(),
                    type_abbrev: "L".to_string(),
                    semester: "WS 2016/17".to_string(),
                },
                author: String::new(),
                local_date: OffsetDateTime::UNIX_EPOCH,
                copyrighted: false,
            },
            cache_path: PathBuf::from("/store").join(id),
        }
    }

    fn sample_tree() -> Node {
        let mut root = Node::empty_dir();
        root.insert(Path::new("Algorithms/slides.pdf"), projected("f1"));
        root.insert(Path::new("Algorithms/Exercises/sheet1.pdf"), projected("f2"));
        root.insert(Path::new("Databases/intro.pdf"), projected("f3"));
        root
    }

    #[rstest]
    #[case("Algorithms")]
    #[case("/Algorithms")]
    #[case("Algorithms/")]
    #[case("./Algorithms/.")]
    #[case("Databases/../Algorithms")]
    fn test_resolve_directory_with_normalization(#[case] path: &str) {
        assert!(sample_tree().resolve(path).unwrap().is_dir());
    }

    #[test]
    fn test_resolve_leaf() {
        let tree = sample_tree();
        let node = tree.resolve("/Algorithms/Exercises/sheet1.pdf").unwrap();
        match node {
            Node::Leaf(leaf) => assert_eq!(leaf.file.id, "f2"),
            Node::Dir(_) => panic!("expected a leaf"),
        }
    }

    #[test]
    fn test_resolve_root_is_a_directory() {
        assert!(sample_tree().resolve("/").unwrap().is_dir());
    }

    #[rstest]
    #[case("Algorithms/missing.pdf")]
    #[case("Nowhere")]
    #[case("../escape")]
    fn test_resolve_unknown_is_not_found(#[case] path: &str) {
        let err = sample_tree().resolve(path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_resolve_through_leaf_is_not_a_directory() {
        let err = sample_tree().resolve("Algorithms/slides.pdf/deeper").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotADirectory(_)));
    }

    #[test]
    fn test_resolution_is_case_sensitive() {
        assert!(sample_tree().resolve("algorithms").is_err());
    }

    #[test]
    fn test_insert_duplicate_path_last_wins() {
        let mut root = Node::empty_dir();
        root.insert(Path::new("a/same.pdf"), projected("f1"));
        root.insert(Path::new("a/same.pdf"), projected("f2"));
        match root.resolve("a/same.pdf").unwrap() {
            Node::Leaf(leaf) => assert_eq!(leaf.file.id, "f2"),
            Node::Dir(_) => panic!("expected a leaf"),
        }
    }

    #[test]
    fn test_insert_never_overwrites_a_directory() {
        let mut root = Node::empty_dir();
        root.insert(Path::new("a/b/deep.pdf"), projected("f1"));
        root.insert(Path::new("a/b"), projected("f2"));
        assert!(root.resolve("a/b").unwrap().is_dir());
        assert!(root.resolve("a/b/deep.pdf").is_ok());
    }
}
