use serde::Serialize;

use crate::span::Span;

/// A single patch over the base source: `span` is replaced by `replacement`.
/// An empty span inserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedPart {
    span: Span,
    replacement: String,
}

impl SanitizedPart {
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Self { span, replacement: replacement.into() }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(Span::empty_at(offset), text)
    }

    /// Same-length blanking. Line breaks survive so line numbers stay put.
    pub fn blank(source: &str, span: Span) -> Self {
        let bytes = &source.as_bytes()[span.start.min(source.len())..span.end.min(source.len())];
        let replacement: String = bytes
            .iter()
            .map(|&b| if b == b'\n' || b == b'\r' { b as char } else { ' ' })
            .collect();
        Self::new(span, replacement)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn apply(&self, base: &str) -> String {
        let bytes = base.as_bytes();
        let end = self.span.end.min(bytes.len());
        let start = self.span.start.min(end);

        let mut out = Vec::with_capacity(bytes.len() + self.replacement.len());
        out.extend_from_slice(&bytes[..start]);
        out.extend_from_slice(self.replacement.as_bytes());
        out.extend_from_slice(&bytes[end..]);
        match String::from_utf8(out) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        }
    }
}

/// State shared by every round of one recovering parse.
#[derive(Debug)]
pub struct Context<'a> {
    base: &'a str,
    caret: Option<usize>,
    part: Option<SanitizedPart>,
    sanitized: Option<String>,
}

impl<'a> Context<'a> {
    pub fn new(base: &'a str, caret: Option<usize>) -> Self {
        Self { base, caret, part: None, sanitized: None }
    }

    pub fn base(&self) -> &'a str {
        self.base
    }

    pub fn caret_offset(&self) -> Option<usize> {
        self.caret
    }

    pub fn sanitized_part(&self) -> Option<&SanitizedPart> {
        self.part.as_ref()
    }

    /// Replaces the active patch. Patches never stack.
    pub fn set_sanitized_part(&mut self, part: SanitizedPart) {
        self.sanitized = Some(part.apply(self.base));
        self.part = Some(part);
    }

    /// Text the next parse runs on.
    pub fn source(&self) -> &str {
        self.sanitized.as_deref().unwrap_or(self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_patch_replaces_earlier_one() {
        let mut ctx = Context::new("<?php foo(; bar();", None);
        assert_eq!(ctx.source(), "<?php foo(; bar();");

        ctx.set_sanitized_part(SanitizedPart::blank(ctx.base(), Span::new(6, 10)));
        assert_eq!(ctx.source(), "<?php     ; bar();");

        ctx.set_sanitized_part(SanitizedPart::insert(18, "}"));
        assert_eq!(ctx.source(), "<?php foo(; bar();}");
        assert_eq!(ctx.sanitized_part().map(|p| p.span()), Some(Span::empty_at(18)));
    }

    #[test]
    fn blanking_keeps_line_breaks() {
        let part = SanitizedPart::blank("a{\r\nb}", Span::new(1, 6));
        assert_eq!(part.replacement(), " \r\n  ");
        assert_eq!(part.apply("a{\r\nb}"), "a \r\n  ");
    }
}
