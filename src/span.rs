use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self { Self { start, end } }

    pub fn empty_at(offset: usize) -> Self { Self { start: offset, end: offset } }

    pub fn len(&self) -> usize { self.end.saturating_sub(self.start) }

    pub fn is_empty(&self) -> bool { self.start == self.end }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Span covering both `self` and `other`.
    pub fn to(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Slice the source. Callers hand in the text the span was produced from.
    pub fn as_str<'src>(&self, source: &'src [u8]) -> &'src [u8] {
        &source[self.start..self.end]
    }

    /// Lossy text view of the span, clamped to the source length.
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        let end = self.end.min(source.len());
        let start = self.start.min(end);
        source.get(start..end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_clamped_to_source() {
        let source = "<?php echo 1;";
        assert_eq!(Span::new(6, 10).text(source), "echo");
        assert_eq!(Span::new(10, 99).text(source), " 1;");
        assert_eq!(Span::new(50, 60).text(source), "");
    }

    #[test]
    fn inverted_span_has_no_length() {
        let inverted = Span::new(9, 4);
        assert_eq!(inverted.len(), 0);
        assert_eq!(inverted.text("<?php echo 1;"), "");
    }

    #[test]
    fn to_covers_both_spans() {
        let joined = Span::new(4, 6).to(Span::new(1, 3));
        assert_eq!(joined, Span::new(1, 6));
        assert!(joined.contains(5));
        assert!(!joined.contains(6));
    }
}
