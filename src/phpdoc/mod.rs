//! Structured PHPDoc comments.
//!
//! ```text
//! /**
//!  * Finds a user.                        <- block description
//!  *
//!  * @param int|string $id the key        <- PhpDocTag, TagBody::VarType
//!  * @return User|null                    <- PhpDocTag, TagBody::Type
//!  */
//! ```
//!
//! Offsets are absolute: the parser is told where the comment starts in the
//! file and every span it produces points back into that file.

pub mod registry;
pub mod tag;
mod types;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::span::Span;

pub use registry::{AnnotationLineParser, AnnotationParsedLine, LineParsers, ParsedLine};
pub use tag::{AnnotationKind, TagKind};
use types::Locator;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n][ \t]*[*]?[ \t]*").expect("valid line regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhpDocNode {
    pub span: Span,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhpDocTypeNode {
    pub span: Span,
    pub value: String,
    /// Written with a `[]` suffix.
    pub is_array: bool,
    /// Class and constant of a `Foo::BAR` type.
    pub static_access: Option<(PhpDocNode, PhpDocNode)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TagBody {
    Plain,
    Type {
        types: Vec<PhpDocTypeNode>,
    },
    VarType {
        types: Vec<PhpDocTypeNode>,
        variable: PhpDocNode,
    },
    Method {
        /// Return type. `void` when none was written.
        types: Vec<PhpDocTypeNode>,
        name: PhpDocNode,
        params: Vec<PhpDocTag>,
        is_static: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhpDocTag {
    pub span: Span,
    pub kind: AnnotationKind,
    pub description: String,
    pub body: TagBody,
}

impl PhpDocTag {
    pub fn types(&self) -> &[PhpDocTypeNode] {
        match &self.body {
            TagBody::Plain => &[],
            TagBody::Type { types } | TagBody::VarType { types, .. } | TagBody::Method { types, .. } => types,
        }
    }

    pub fn variable(&self) -> Option<&PhpDocNode> {
        match &self.body {
            TagBody::VarType { variable, .. } => Some(variable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhpDocBlock {
    pub span: Span,
    pub description: String,
    pub tags: Vec<PhpDocTag>,
}

/// A tag whose lines are still being collected.
struct PendingTag {
    /// Offset of the `@`, relative to the comment.
    at: usize,
    name: String,
    /// First line without the `@`.
    line: String,
    description: String,
    end: usize,
}

pub struct PhpDocParser {
    line_parsers: LineParsers,
}

impl Default for PhpDocParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PhpDocParser {
    /// Uses a snapshot of the process-wide line parser registry.
    pub fn new() -> Self {
        Self { line_parsers: registry::line_parsers() }
    }

    pub fn with_line_parsers(line_parsers: LineParsers) -> Self {
        Self { line_parsers }
    }

    /// Parse `comment`, which spans `start..end` in its file and includes
    /// the `/**` and `*/` delimiters.
    pub fn parse(&self, start: usize, end: usize, comment: &str) -> PhpDocBlock {
        let mut block = PhpDocBlock { span: Span::new(start, end), description: String::new(), tags: Vec::new() };
        let body_end = if comment.len() >= 4 && comment.ends_with("*/") { comment.len() - 2 } else { comment.len() };
        let Some(body) = comment.get(3..body_end) else {
            return block;
        };

        let mut description: Vec<&str> = Vec::new();
        let mut pending: Option<PendingTag> = None;

        for (offset, line) in lines(body) {
            let offset = offset + 3;
            match tag_name(line) {
                Some(name) => {
                    if let Some(tag) = pending.take() {
                        self.finish_tag(tag, comment, start, &mut block.tags);
                    }
                    let rest = line[1 + name.len()..].trim();
                    pending = Some(PendingTag {
                        at: offset,
                        name: name.to_string(),
                        line: line[1..].to_string(),
                        description: rest.to_string(),
                        end: offset + line.len(),
                    });
                }
                None => match pending.as_mut() {
                    Some(tag) => {
                        tag.description.push('\n');
                        tag.description.push_str(line);
                        if !line.is_empty() {
                            tag.end = offset + line.len();
                        }
                    }
                    None => description.push(line),
                },
            }
        }
        if let Some(tag) = pending.take() {
            self.finish_tag(tag, comment, start, &mut block.tags);
        }

        block.description = description.join("\n").trim().to_string();
        block
    }

    fn finish_tag(&self, pending: PendingTag, comment: &str, start: usize, tags: &mut Vec<PhpDocTag>) {
        let span = Span::new(start + pending.at, start + pending.end);
        let description = pending.description.trim().to_string();
        let mut locator = Locator::new(comment, start, pending.at + 1 + pending.name.len());

        let Some(kind) = TagKind::from_name(&pending.name) else {
            tags.push(self.annotation_tag(pending, comment, start, span, description));
            return;
        };

        let body = if kind.has_variable() {
            match var_type_body(&description, &mut locator, kind == TagKind::Param) {
                Some(body) => body,
                None => return,
            }
        } else if kind == TagKind::Method {
            method_body(&description, &mut locator)
        } else if kind.is_type_only() {
            let types = types::split_words(&description)
                .first()
                .map(|expression| types::split_types(expression, &mut locator))
                .unwrap_or_default();
            TagBody::Type { types }
        } else {
            TagBody::Plain
        };

        tags.push(PhpDocTag { span, kind: AnnotationKind::Builtin(kind), description, body });
    }

    /// Tags outside the built-in set go through the registered line parsers.
    fn annotation_tag(
        &self,
        pending: PendingTag,
        comment: &str,
        start: usize,
        span: Span,
        description: String,
    ) -> PhpDocTag {
        let parsed = self.line_parsers.iter().find_map(|parser| parser.parse(&pending.line));
        let Some(parsed) = parsed else {
            return PhpDocTag { span, kind: AnnotationKind::Unknown(pending.name), description, body: TagBody::Plain };
        };

        let tag_start = start + pending.at;
        let shift = usize::from(parsed.starts_with_annotation());
        let types: Vec<PhpDocTypeNode> = parsed
            .types()
            .iter()
            .filter(|(range, _)| range.start <= range.end && pending.at + shift + range.end <= comment.len())
            .map(|(range, value)| PhpDocTypeNode {
                span: Span::new(tag_start + range.start + shift, tag_start + range.end + shift),
                value: value.clone(),
                is_array: false,
                static_access: None,
            })
            .collect();

        PhpDocTag {
            span,
            kind: AnnotationKind::Custom(parsed.name().to_string()),
            description: parsed.description().to_string(),
            body: if types.is_empty() { TagBody::Plain } else { TagBody::Type { types } },
        }
    }
}

/// Trimmed lines of a comment body with their offsets into the body. The
/// first line also loses one leading `*` (from `/***`).
fn lines(body: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut line_start = 0;
    let mut first = true;
    let mut push = |from: usize, to: usize, first: bool| {
        let raw = &body[from..to];
        let mut trimmed = raw.trim_start();
        if first {
            if let Some(rest) = trimmed.strip_prefix('*') {
                trimmed = rest.trim_start();
            }
        }
        let offset = from + (raw.len() - trimmed.len());
        out.push((offset, trimmed.trim_end()));
    };
    for m in LINE_BREAK.find_iter(body) {
        push(line_start, m.start(), first);
        first = false;
        line_start = m.end();
    }
    push(line_start, body.len(), first);
    out
}

/// `param` for a line starting with `@param`.
fn tag_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('@')?;
    let first = rest.chars().next()?;
    if !(first.is_alphabetic() || first == '_' || first == '\\') {
        return None;
    }
    let len = rest
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '\\' | ':')))
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

/// `&$x` and `...$x` name the variable `$x`.
fn strip_variable_prefix(token: &str) -> &str {
    token.trim_start_matches('&').trim_start_matches("...").trim_start_matches('&')
}

fn is_variable(token: &str) -> bool {
    token.len() > 1 && token.starts_with('$')
}

/// Body of `@param`-like tags. Without a variable only `@param` survives, with
/// an empty variable at the point the search stopped.
fn var_type_body(description: &str, locator: &mut Locator<'_>, keep_without_variable: bool) -> Option<TagBody> {
    let tokens = types::split_words(description);
    let (expression, candidate) = match tokens.first() {
        Some(first) if strip_variable_prefix(first).starts_with('$') => (None, Some(*first)),
        Some(first) => (Some(*first), tokens.get(1).copied()),
        None => (None, None),
    };

    let types = expression.map(|e| types::split_types(e, &mut *locator)).unwrap_or_default();
    let variable = candidate
        .map(strip_variable_prefix)
        .filter(|v| is_variable(v))
        .and_then(|v| locator.node(v));

    match variable {
        Some(variable) => Some(TagBody::VarType { types, variable }),
        None if keep_without_variable => Some(TagBody::VarType {
            types,
            variable: PhpDocNode { span: Span::empty_at(locator.position()), value: String::new() },
        }),
        None => None,
    }
}

fn method_body(description: &str, locator: &mut Locator<'_>) -> TagBody {
    let mut text = description;
    let mut is_static = false;
    if let Some(rest) = text.strip_prefix("static") {
        if rest.starts_with(char::is_whitespace) && !rest.trim().is_empty() {
            is_static = true;
            text = rest.trim_start();
            locator.find("static");
        }
    }

    let paren = types::find_parameter_start(text);
    let head = paren.map_or(text, |p| &text[..p]).trim_end();
    let (return_type, name) = match head.rfind(char::is_whitespace) {
        Some(i) => (head[..i].trim(), &head[i + 1..]),
        None => ("", head),
    };

    let mut types = Vec::new();
    for expression in return_type.split_whitespace() {
        types.extend(types::split_types(expression, locator));
    }
    let name = locator
        .node(name)
        .unwrap_or_else(|| PhpDocNode { span: Span::empty_at(locator.position()), value: name.to_string() });
    if return_type.is_empty() {
        types.push(PhpDocTypeNode {
            span: Span::empty_at(name.span.start),
            value: "void".to_string(),
            is_array: false,
            static_access: None,
        });
    }

    let mut params = Vec::new();
    if let Some(open) = paren {
        let close = types::matching_paren(text, open).unwrap_or(text.len());
        let inner = &text[(open + 1).min(close)..close];
        for param in types::split_top_level_commas(inner) {
            params.push(method_param(param, locator));
        }
    }

    TagBody::Method { types, name, params, is_static }
}

/// One `@method` parameter, shaped like a `@param` tag.
fn method_param(param: &str, locator: &mut Locator<'_>) -> PhpDocTag {
    let span = locator.find_start(param).unwrap_or_else(|| Span::empty_at(locator.position()));
    let body = var_type_body(param, locator, true).unwrap_or(TagBody::Plain);
    PhpDocTag { span, kind: AnnotationKind::Builtin(TagKind::Param), description: param.to_string(), body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn parse(start: usize, comment: &str) -> PhpDocBlock {
        PhpDocParser::with_line_parsers(Arc::from(Vec::new())).parse(start, start + comment.len(), comment)
    }

    fn slice(comment: &str, start: usize, span: Span) -> &str {
        &comment[span.start - start..span.end - start]
    }

    #[test]
    fn param_offsets_point_into_the_comment() {
        let comment = "/** @param int $x description */";
        let block = parse(100, comment);
        assert_eq!(block.tags.len(), 1);

        let tag = &block.tags[0];
        assert_eq!(tag.kind, AnnotationKind::Builtin(TagKind::Param));
        assert_eq!(tag.span.start, 104);
        let variable = tag.variable().unwrap();
        assert_eq!(variable.value, "$x");
        assert_eq!(slice(comment, 100, variable.span), "$x");
        let types: Vec<_> = tag.types().iter().map(|t| slice(comment, 100, t.span)).collect();
        assert_eq!(types, ["int"]);
    }

    #[test]
    fn description_and_multiline_tags() {
        let comment = "/**\n * Finds a user.\n *\n * @param int $id the key\n *        used for lookup\n * @return User\n */";
        let block = parse(0, comment);
        assert_eq!(block.description, "Finds a user.");
        assert_eq!(block.tags.len(), 2);
        assert_eq!(block.tags[0].description, "int $id the key\nused for lookup");
        assert_eq!(slice(comment, 0, block.tags[0].span), "@param int $id the key\n *        used for lookup");
        assert_eq!(block.tags[1].types()[0].value, "User");
    }

    #[test]
    fn union_return_types_increase() {
        let comment = "/** @return int|string|null */";
        let block = parse(7, comment);
        let types = block.tags[0].types();
        let values: Vec<_> = types.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, ["int", "string", "null"]);
        assert!(types.windows(2).all(|w| w[0].span.end <= w[1].span.start));
        for t in types {
            assert_eq!(slice(comment, 7, t.span), t.value);
        }
    }

    #[test]
    fn magic_method_with_parameters() {
        let comment = "/** @method static Foo create(int $id, string $name = 'x') */";
        let block = parse(0, comment);
        let TagBody::Method { types, name, params, is_static } = &block.tags[0].body else {
            panic!("expected a method tag");
        };
        assert!(*is_static);
        assert_eq!(name.value, "create");
        assert_eq!(slice(comment, 0, name.span), "create");
        assert_eq!(types[0].value, "Foo");
        let vars: Vec<_> = params.iter().map(|p| p.variable().unwrap().value.as_str()).collect();
        assert_eq!(vars, ["$id", "$name"]);
        assert_eq!(params[1].types()[0].value, "string");
        assert_eq!(slice(comment, 0, params[1].span), "string $name = 'x'");
    }

    #[test]
    fn method_without_return_type_is_void() {
        let comment = "/** @method static() */";
        let block = parse(0, comment);
        let TagBody::Method { types, name, is_static, params } = &block.tags[0].body else {
            panic!("expected a method tag");
        };
        assert!(!*is_static);
        assert_eq!(name.value, "static");
        assert!(params.is_empty());
        assert_eq!(types[0].value, "void");
        assert!(types[0].span.is_empty());
        assert_eq!(types[0].span.start, name.span.start);
    }

    #[test]
    fn dnf_param_resolves_each_occurrence() {
        let comment = "/** @param (X&Y)|(X&Z) $p */";
        let block = parse(50, comment);
        let xs: Vec<_> = block.tags[0].types().iter().filter(|t| t.value == "X").map(|t| t.span.start).collect();
        assert_eq!(xs.len(), 2);
        assert!(xs[0] < xs[1]);
        assert_eq!(block.tags[0].variable().unwrap().value, "$p");
    }

    #[test]
    fn generic_and_shape_unions_yield_whole_types() {
        let values = |comment: &str| -> Vec<String> {
            parse(0, comment).tags[0].types().iter().map(|t| t.value.clone()).collect()
        };
        assert_eq!(values("/** @return array<int|string, Foo> */"), ["array"]);
        assert_eq!(values("/** @return array{a: int|string} */"), ["array"]);
    }

    #[test]
    fn callable_param_keeps_its_variable() {
        let comment = "/** @param Closure(int|string): void $cb handler */";
        let block = parse(0, comment);
        let tag = &block.tags[0];
        let types: Vec<_> = tag.types().iter().map(|t| t.value.as_str()).collect();
        assert_eq!(types, ["Closure"]);
        assert_eq!(slice(comment, 0, tag.variable().unwrap().span), "$cb");
    }

    #[test]
    fn var_type_tags_without_variable() {
        let block = parse(0, "/**\n * @param int\n * @property string\n */");
        assert_eq!(block.tags.len(), 1);
        let variable = block.tags[0].variable().unwrap();
        assert_eq!(variable.value, "");
        assert!(variable.span.is_empty());
    }

    #[test]
    fn by_reference_and_variadic_parameters() {
        let block = parse(0, "/**\n * @param array &$list\n * @param mixed ...$rest\n */");
        let vars: Vec<_> = block.tags.iter().map(|t| t.variable().unwrap().value.as_str()).collect();
        assert_eq!(vars, ["$list", "$rest"]);
    }

    #[test]
    fn unknown_tags_keep_their_text() {
        let block = parse(0, "/** @customTag some text */");
        assert_eq!(block.tags[0].kind, AnnotationKind::Unknown("customTag".to_string()));
        assert_eq!(block.tags[0].description, "some text");
        assert_eq!(block.tags[0].body, TagBody::Plain);
    }

    struct RouteParser;

    impl AnnotationLineParser for RouteParser {
        fn parse(&self, line: &str) -> Option<Box<dyn AnnotationParsedLine>> {
            let rest = line.strip_prefix("Route")?;
            let open = rest.find('"')?;
            let close = open + 1 + rest[open + 1..].find('"')?;
            Some(Box::new(ParsedLine {
                name: "Route".to_string(),
                description: rest.to_string(),
                types: vec![(5 + open + 1..5 + close, rest[open + 1..close].to_string())],
                starts_with_annotation: true,
            }))
        }
    }

    #[test]
    fn registered_parsers_supply_type_ranges() {
        let comment = "/** @Route(\"/home\") */";
        let parser = PhpDocParser::with_line_parsers(Arc::from(vec![Arc::new(RouteParser) as Arc<dyn AnnotationLineParser>]));
        let block = parser.parse(10, 10 + comment.len(), comment);
        let tag = &block.tags[0];
        assert_eq!(tag.kind, AnnotationKind::Custom("Route".to_string()));
        assert_eq!(slice(comment, 10, tag.types()[0].span), "/home");
    }

    #[test]
    fn degenerate_comments() {
        let empty = parse(0, "/**/");
        assert!(empty.tags.is_empty());
        assert_eq!(empty.description, "");
        assert_eq!(parse(0, "/***/").description, "");
        assert_eq!(parse(0, "/** */").description, "");
        assert_eq!(parse(0, "/***  Title */").description, "Title");
    }
}
