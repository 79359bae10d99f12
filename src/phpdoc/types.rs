use crate::phpdoc::{PhpDocNode, PhpDocTypeNode};
use crate::span::Span;

/// Finds words of a doc comment in order. The cursor only moves forward, so
/// repeated names (`(X&Y)|(X&Z)`) resolve to distinct occurrences.
#[derive(Debug)]
pub(crate) struct Locator<'a> {
    comment: &'a str,
    base: usize,
    cursor: usize,
}

impl<'a> Locator<'a> {
    /// `base` is the absolute offset of `comment`, `cursor` is relative to it.
    pub(crate) fn new(comment: &'a str, base: usize, cursor: usize) -> Self {
        Self { comment, base, cursor: cursor.min(comment.len()) }
    }

    pub(crate) fn position(&self) -> usize {
        self.base + self.cursor
    }

    fn search(&self, needle: &str) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        let rest = self.comment.get(self.cursor..)?;
        rest.find(needle).map(|i| self.cursor + i)
    }

    /// Locate `needle` and move past it.
    pub(crate) fn find(&mut self, needle: &str) -> Option<Span> {
        let start = self.search(needle)?;
        self.cursor = start + needle.len();
        Some(Span::new(self.base + start, self.base + self.cursor))
    }

    /// Locate `needle` and move to its start, so its parts can be found next.
    pub(crate) fn find_start(&mut self, needle: &str) -> Option<Span> {
        let start = self.search(needle)?;
        self.cursor = start;
        Some(Span::new(self.base + start, self.base + start + needle.len()))
    }

    pub(crate) fn node(&mut self, text: &str) -> Option<PhpDocNode> {
        self.find(text).map(|span| PhpDocNode { span, value: text.to_string() })
    }
}

/// Split a type expression on top-level `|` and `&`. A parenthesised
/// intersection group (`(A&B)|null`) is split as well. Types that cannot be
/// found in the comment are left out.
pub(crate) fn split_types(expression: &str, locator: &mut Locator<'_>) -> Vec<PhpDocTypeNode> {
    let mut nodes = Vec::new();
    for part in split_top_level(expression, |bytes, i| matches!(bytes[i], b'|' | b'&')) {
        match part.strip_prefix('(') {
            Some(inner) if matching_paren(part, 0) == Some(part.len() - 1) => {
                nodes.extend(split_types(&inner[..inner.len() - 1], locator));
            }
            _ => nodes.extend(type_node(part, locator)),
        }
    }
    nodes
}

fn type_node(raw: &str, locator: &mut Locator<'_>) -> Option<PhpDocTypeNode> {
    let trimmed = raw.trim_start_matches('(').trim_end_matches(')');
    let is_array = trimmed.ends_with(']') && trimmed.contains('[');
    let cut = trimmed.find(['{', '<', '[', '(']).unwrap_or(trimmed.len());
    let text = trimmed[..cut].trim_end_matches(':');
    if text.is_empty() {
        return None;
    }

    let span = locator.find(text)?;
    let static_access = text.find("::").map(|i| {
        let class = PhpDocNode { span: Span::new(span.start, span.start + i), value: text[..i].to_string() };
        let constant = PhpDocNode { span: Span::new(span.start + i + 2, span.end), value: text[i + 2..].to_string() };
        (class, constant)
    });
    Some(PhpDocTypeNode { span, value: text.to_string(), is_array, static_access })
}

/// Index of the `(` opening a method's parameter list. A `(` at the start
/// or right after `|`, `&`, `?` or a blank is taken for a type group.
pub(crate) fn find_parameter_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (1..bytes.len()).find(|&i| bytes[i] == b'(' && !matches!(bytes[i - 1], b'|' | b'&' | b' ' | b'\t' | b'?'))
}

/// Index of the `)` matching the `(` at `open`.
pub(crate) fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas outside brackets and quotes.
pub(crate) fn split_top_level_commas(text: &str) -> Vec<&str> {
    split_top_level(text, |bytes, i| bytes[i] == b',')
}

/// Whitespace-separated words, keeping `array{a: int}` or
/// `Closure(int, string): void` in one piece.
pub(crate) fn split_words(text: &str) -> Vec<&str> {
    split_top_level(text, |bytes, i| bytes[i].is_ascii_whitespace() && !follows_return_colon(bytes, i))
}

/// Whitespace after the `):` of a callable type, before its return type.
fn follows_return_colon(bytes: &[u8], i: usize) -> bool {
    let before = bytes[..i].iter().rposition(|b| !b.is_ascii_whitespace());
    before.is_some_and(|k| bytes[k] == b':' && k > 0 && bytes[k - 1] == b')')
}

fn split_top_level(text: &str, is_separator: impl Fn(&[u8], usize) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' | b'[' | b'{' | b'<' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                // `=>` and `->` are not closing brackets
                b'>' if i > 0 && !matches!(bytes[i - 1], b'=' | b'-') => depth = depth.saturating_sub(1),
                _ if depth == 0 && is_separator(bytes, i) => {
                    parts.push(&text[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(nodes: &[PhpDocTypeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.value.as_str()).collect()
    }

    #[test]
    fn repeated_names_resolve_forward() {
        let comment = "@param (X&Y)|(X&Z) $p";
        let mut locator = Locator::new(comment, 0, 6);
        let types = split_types("(X&Y)|(X&Z)", &mut locator);
        assert_eq!(values(&types), ["X", "Y", "X", "Z"]);
        assert_eq!(types[0].span, Span::new(8, 9));
        assert_eq!(types[2].span, Span::new(14, 15));
    }

    #[test]
    fn suffixes_are_stripped() {
        let comment = "@return array{a:int}|list<int>|Foo[]";
        let mut locator = Locator::new(comment, 10, 7);
        let types = split_types("array{a:int}|list<int>|Foo[]", &mut locator);
        assert_eq!(values(&types), ["array", "list", "Foo"]);
        assert!(!types[0].is_array);
        assert!(types[2].is_array);
        assert_eq!(types[2].span, Span::new(10 + 31, 10 + 34));
    }

    #[test]
    fn unions_inside_generics_and_shapes_stay_put() {
        let comment = "@return array<int|string, Foo>|array{a: int|string}|null";
        let mut locator = Locator::new(comment, 0, 7);
        let types = split_types("array<int|string, Foo>|array{a: int|string}|null", &mut locator);
        assert_eq!(values(&types), ["array", "array", "null"]);
        assert_eq!(types[0].span, Span::new(8, 13));
        assert_eq!(types[1].span, Span::new(31, 36));
    }

    #[test]
    fn callable_parameters_are_not_types() {
        let comment = "@param Closure(int|string): void $cb";
        let mut locator = Locator::new(comment, 0, 6);
        let types = split_types("Closure(int|string): void", &mut locator);
        assert_eq!(values(&types), ["Closure"]);
        assert_eq!(types[0].span, Span::new(7, 14));
    }

    #[test]
    fn class_constants_are_split() {
        let comment = "@var Foo::BAR";
        let mut locator = Locator::new(comment, 0, 4);
        let types = split_types("Foo::BAR", &mut locator);
        let (class, constant) = types[0].static_access.clone().unwrap();
        assert_eq!((class.value.as_str(), class.span), ("Foo", Span::new(5, 8)));
        assert_eq!((constant.value.as_str(), constant.span), ("BAR", Span::new(10, 13)));
    }

    #[test]
    fn parameter_start_skips_type_groups() {
        assert_eq!(find_parameter_start("Foo create(int $a)"), Some(10));
        assert_eq!(find_parameter_start("(A&B)|C make()"), Some(12));
        assert_eq!(find_parameter_start("A|(B&C) make()"), Some(12));
        assert_eq!(find_parameter_start("Foo (A&B)"), None);
    }

    #[test]
    fn commas_inside_brackets_stay() {
        assert_eq!(
            split_top_level_commas("int $a, array $b = ['k' => 1, 2], array<int, string> $c, string $d = 'x,y'"),
            ["int $a", "array $b = ['k' => 1, 2]", "array<int, string> $c", "string $d = 'x,y'"]
        );
        assert!(split_top_level_commas("  ").is_empty());
    }

    #[test]
    fn callable_return_type_stays_in_its_word() {
        assert_eq!(split_words("Closure(int|string): void $cb text"), ["Closure(int|string): void", "$cb", "text"]);
    }

    #[test]
    fn words_keep_shapes_together() {
        assert_eq!(
            split_words("array{id: int, tags: list<string>}  $filter the\ttext"),
            ["array{id: int, tags: list<string>}", "$filter", "the", "text"]
        );
    }
}
