//! Process-wide list of parsers for annotations the doc parser does not
//! know, such as framework attributes (`@Route("/home")`).

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

/// Result of a line parser accepting a tag line.
pub trait AnnotationParsedLine: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Type ranges within the tag line, with the type text.
    fn types(&self) -> &[(Range<usize>, String)];

    /// Whether the ranges count from just after the `@`.
    fn starts_with_annotation(&self) -> bool;
}

pub trait AnnotationLineParser: Send + Sync {
    /// `line` is the tag line without its leading `@`.
    fn parse(&self, line: &str) -> Option<Box<dyn AnnotationParsedLine>>;
}

/// Plain [`AnnotationParsedLine`] for line parsers that have nothing fancier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub name: String,
    pub description: String,
    pub types: Vec<(Range<usize>, String)>,
    pub starts_with_annotation: bool,
}

impl AnnotationParsedLine for ParsedLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn types(&self) -> &[(Range<usize>, String)] {
        &self.types
    }

    fn starts_with_annotation(&self) -> bool {
        self.starts_with_annotation
    }
}

pub type LineParsers = Arc<[Arc<dyn AnnotationLineParser>]>;

static LINE_PARSERS: LazyLock<RwLock<LineParsers>> = LazyLock::new(|| RwLock::new(Arc::from(Vec::new())));

/// Snapshot of the registered parsers. Later updates do not affect it.
pub fn line_parsers() -> LineParsers {
    LINE_PARSERS.read().clone()
}

/// Swap the whole list. Readers see either the old or the new list.
pub fn replace_all(parsers: Vec<Arc<dyn AnnotationLineParser>>) {
    let count = parsers.len();
    *LINE_PARSERS.write() = Arc::from(parsers);
    debug!(count, "annotation line parsers replaced");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl AnnotationLineParser for Fixed {
        fn parse(&self, line: &str) -> Option<Box<dyn AnnotationParsedLine>> {
            line.starts_with("registry-test").then(|| {
                Box::new(ParsedLine {
                    name: "registry-test".to_string(),
                    description: String::new(),
                    types: vec![],
                    starts_with_annotation: false,
                }) as Box<dyn AnnotationParsedLine>
            })
        }
    }

    #[test]
    fn snapshots_survive_replacement() {
        replace_all(vec![Arc::new(Fixed)]);
        let before = line_parsers();
        assert!(before.iter().any(|p| p.parse("registry-test x").is_some()));

        replace_all(Vec::new());
        assert_eq!(before.len(), 1);
        assert!(line_parsers().iter().all(|p| p.parse("registry-test x").is_none()));
    }
}
