//! Collects the syntax errors raised during one parse and turns them into
//! diagnostics.

use serde::Serialize;

use crate::lexer::display::join_expected;
use crate::lexer::token::{Token, TokenKind};
use crate::parser::{ErrorType, ParserErrorHandler};
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyntaxErrorKind {
    /// First error of a parse. Everything after it may be a consequence.
    FirstValid,
    Possible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxError {
    pub current: Token,
    pub previous: Token,
    pub expected: Vec<TokenKind>,
    pub kind: SyntaxErrorKind,
}

impl SyntaxError {
    /// Range a diagnostic for this error points at. End-of-file errors point
    /// at the last real token instead of an empty range.
    pub fn span(&self) -> Span {
        if self.current.span.is_empty() && !self.previous.span.is_empty() {
            self.previous.span
        } else {
            self.current.span
        }
    }

    pub fn message(&self, source: &str) -> String {
        let prefix = match self.kind {
            SyntaxErrorKind::FirstValid => "Syntax error",
            SyntaxErrorKind::Possible => "Possible syntax error",
        };
        let unexpected = if self.current.span.is_empty() {
            self.current.kind.text()
        } else {
            self.current.text(source)
        };
        if self.expected.is_empty() {
            format!("{prefix}: unexpected '{unexpected}'")
        } else {
            format!("{prefix}: unexpected '{unexpected}', expected: {}", join_expected(&self.expected))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<SyntaxError>,
}

impl Diagnostic {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    /// One-based line and byte column of `start` in `source`, which must be
    /// the text the diagnostic was reported against.
    pub fn line_column(&self, source: &str) -> (usize, usize) {
        let bytes = &source.as_bytes()[..self.start.min(source.len())];
        let line = memchr::memchr_iter(b'\n', bytes).count() + 1;
        let column = bytes.len() - memchr::memrchr(b'\n', bytes).map_or(0, |i| i + 1) + 1;
        (line, column)
    }
}

/// `ParserErrorHandler` that records syntax errors. A disabled handler still
/// records (the recovery heuristics may look at them) but never reports.
#[derive(Debug, Default)]
pub struct ErrorHandler {
    errors: Vec<SyntaxError>,
    disabled: bool,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self { errors: Vec::new(), disabled: true }
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn syntax_errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn first_error(&self) -> Option<&SyntaxError> {
        self.errors.first()
    }

    /// First error as ERROR, the rest as WARNING. Empty when disabled.
    pub fn diagnostics(&self, source: &str) -> Vec<Diagnostic> {
        if self.disabled {
            return Vec::new();
        }
        self.errors
            .iter()
            .map(|error| {
                let span = error.span();
                Diagnostic {
                    severity: match error.kind {
                        SyntaxErrorKind::FirstValid => Severity::Error,
                        SyntaxErrorKind::Possible => Severity::Warning,
                    },
                    message: error.message(source),
                    start: span.start,
                    end: span.end,
                    payload: Some(error.clone()),
                }
            })
            .collect()
    }
}

impl ParserErrorHandler for ErrorHandler {
    fn handle_error(&mut self, ty: ErrorType, expected: &[TokenKind], current: Token, previous: Token) {
        if ty != ErrorType::SyntaxError {
            return;
        }
        let kind = if self.errors.is_empty() { SyntaxErrorKind::FirstValid } else { SyntaxErrorKind::Possible };
        self.errors.push(SyntaxError { current, previous, expected: expected.to_vec(), kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn token(kind: TokenKind, start: usize, end: usize) -> Token {
        Token::new(kind, Span::new(start, end))
    }

    #[test]
    fn first_error_is_error_rest_are_warnings() {
        let source = "<?php $a = ; }";
        let mut handler = ErrorHandler::new();
        handler.handle_error(
            ErrorType::SyntaxError,
            &[TokenKind::Variable, TokenKind::Identifier],
            token(TokenKind::SemiColon, 11, 12),
            token(TokenKind::Eq, 9, 10),
        );
        handler.handle_error(ErrorType::FatalParserError, &[], token(TokenKind::Eof, 14, 14), token(TokenKind::CloseBrace, 13, 14));
        handler.handle_error(ErrorType::SyntaxError, &[TokenKind::Eof], token(TokenKind::CloseBrace, 13, 14), token(TokenKind::SemiColon, 11, 12));

        let diagnostics = handler.diagnostics(source);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[0].span(), Span::new(11, 12));
        assert_snapshot!(diagnostics[0].message, @"Syntax error: unexpected ';', expected: 'variable', 'identifier'");
        assert_eq!(diagnostics[1].severity, Severity::Warning);
        assert_snapshot!(diagnostics[1].message, @"Possible syntax error: unexpected '}', expected: 'end of file'");
    }

    #[test]
    fn eof_errors_point_at_the_previous_token() {
        let source = "<?php foo(";
        let mut handler = ErrorHandler::new();
        handler.handle_error(ErrorType::SyntaxError, &[TokenKind::CloseParen], token(TokenKind::Eof, 10, 10), token(TokenKind::OpenParen, 9, 10));

        let diagnostics = handler.diagnostics(source);
        assert_eq!(diagnostics[0].span(), Span::new(9, 10));
        assert_snapshot!(diagnostics[0].message, @"Syntax error: unexpected 'end of file', expected: ')'");
    }

    #[test]
    fn line_column_counts_from_one() {
        let source = "<?php\n$a = 1\nfoo();";
        let diagnostic = |start| Diagnostic { severity: Severity::Error, message: String::new(), start, end: start, payload: None };
        assert_eq!(diagnostic(0).line_column(source), (1, 1));
        assert_eq!(diagnostic(6).line_column(source), (2, 1));
        assert_eq!(diagnostic(16).line_column(source), (3, 4));
        assert_eq!(diagnostic(99).line_column(source), (3, 7));
    }

    #[test]
    fn disabled_handler_records_but_does_not_report() {
        let mut handler = ErrorHandler::disabled();
        handler.handle_error(ErrorType::SyntaxError, &[], token(TokenKind::SemiColon, 6, 7), Token::none());
        assert_eq!(handler.syntax_errors().len(), 1);
        assert!(handler.diagnostics("<?php ;").is_empty());
    }
}
