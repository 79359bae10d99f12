//! Patch computation for each sanitize state. Every function works on the
//! base source and returns `None` when it has nothing to offer.

use std::sync::LazyLock;

use regex::Regex;

use crate::error_handler::SyntaxError;
use crate::lexer::token::TokenKind;
use crate::lexer::{Lexer, LexerOptions};
use crate::recovery::context::SanitizedPart;
use crate::span::Span;

static INCLUDE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(require_once|require|include_once|include)\b").expect("valid include regex")
});

fn is_line_break(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn line_start(bytes: &[u8], offset: usize) -> usize {
    let offset = offset.min(bytes.len());
    memchr::memrchr2(b'\n', b'\r', &bytes[..offset]).map_or(0, |i| i + 1)
}

fn line_end(bytes: &[u8], offset: usize) -> usize {
    let offset = offset.min(bytes.len());
    memchr::memchr2(b'\n', b'\r', &bytes[offset..]).map_or(bytes.len(), |i| offset + i)
}

fn skip_blanks(bytes: &[u8], mut i: usize, limit: usize) -> usize {
    while i < limit && is_blank(bytes[i]) {
        i += 1;
    }
    i
}

/// Append the `}` the source is missing. Goes right after the last
/// meaningful token when a close tag or comment trails it, at EOF otherwise.
pub fn missing_curly(base: &str, options: LexerOptions) -> Option<SanitizedPart> {
    let tokens = Lexer::with_options(base.as_bytes(), options).tokenize();

    let mut depth = 0usize;
    for token in &tokens {
        match token.kind {
            kind if kind.opens_curly() => depth += 1,
            TokenKind::CloseBrace => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if depth == 0 {
        return None;
    }

    let trailing = |kind: TokenKind| {
        kind.is_trivia() || matches!(kind, TokenKind::CloseTag | TokenKind::InlineHtml | TokenKind::Eof)
    };
    let significant = tokens.iter().rev().find(|t| !trailing(t.kind));
    let last = tokens.iter().rev().find(|t| t.kind != TokenKind::Eof);

    let offset = match (significant, last) {
        (Some(significant), Some(last)) if trailing(last.kind) => significant.span.end,
        _ => base.len(),
    };
    Some(SanitizedPart::insert(offset, "}".repeat(depth)))
}

/// Terminate an unfinished `require`/`include` near the first error.
pub fn require_function_incomplete(base: &str, error: &SyntaxError) -> Option<SanitizedPart> {
    let bytes = base.as_bytes();
    let from = line_start(bytes, error.previous.span.start.min(error.current.span.start));
    let to = line_end(bytes, error.current.span.start.max(error.previous.span.start));

    let keyword = INCLUDE_KEYWORD.find_iter(&base[from..to]).last()?;
    let keyword_end = from + keyword.end();
    let limit = line_end(bytes, keyword_end);

    let mut i = skip_blanks(bytes, keyword_end, limit);
    let paren = i < limit && bytes[i] == b'(';
    if paren {
        i = skip_blanks(bytes, i + 1, limit);
    }
    let arg_start = i;

    let mut missing_quote = None;
    let mut depth = 0usize;
    while i < limit {
        match bytes[i] {
            quote @ (b'\'' | b'"') => match closing_quote(bytes, i + 1, limit, quote) {
                Some(close) => i = close,
                None => {
                    missing_quote = Some(quote as char);
                    i = limit;
                    break;
                }
            },
            b'(' => depth += 1,
            b')' if depth == 0 => break,
            b')' => depth -= 1,
            b';' => break,
            _ => {}
        }
        i += 1;
    }

    let mut arg_end = i;
    while arg_end > arg_start && is_blank(bytes[arg_end - 1]) {
        arg_end -= 1;
    }
    if arg_end == arg_start {
        return None;
    }

    let mut insert_at = arg_end;
    let mut suffix = String::new();
    if let Some(quote) = missing_quote {
        suffix.push(quote);
    }
    let mut j = skip_blanks(bytes, i, limit);
    if paren {
        if missing_quote.is_none() && j < limit && bytes[j] == b')' {
            j += 1;
            insert_at = j;
            j = skip_blanks(bytes, j, limit);
        } else {
            suffix.push(')');
        }
    }
    if missing_quote.is_some() || j >= limit || bytes[j] != b';' {
        suffix.push(';');
    }

    if suffix.is_empty() {
        return None;
    }
    Some(SanitizedPart::insert(insert_at, suffix))
}

/// Index just past the closing `quote`, or `None` if the line ends first.
fn closing_quote(bytes: &[u8], mut i: usize, limit: usize, quote: u8) -> Option<usize> {
    while i < limit {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Blank the token the parser choked on. A `}` is never blanked.
pub fn syntax_error_current(base: &str, error: &SyntaxError) -> Option<SanitizedPart> {
    let current = error.current;
    if current.kind == TokenKind::CloseBrace || current.span.is_empty() {
        return None;
    }
    Some(SanitizedPart::blank(base, current.span))
}

/// Blank the token before the error, together with the nullable marker,
/// trailing comma or type continuation that belongs to it.
pub fn syntax_error_previous(base: &str, error: &SyntaxError) -> Option<SanitizedPart> {
    let previous = error.previous;
    if previous.span.is_empty() {
        return None;
    }
    let bytes = base.as_bytes();
    let mut start = previous.span.start.min(bytes.len());
    let mut end = previous.span.end.min(bytes.len());

    match dnf_group_start(bytes, previous.kind, start) {
        Some(group_start) => start = group_start,
        None => {
            let mut k = start;
            while k > 0 && is_blank(bytes[k - 1]) {
                k -= 1;
            }
            if k > 0 && bytes[k - 1] == b'?' {
                start = k - 1;
            }
        }
    }

    let k = skip_blanks(bytes, end, bytes.len());
    if k < bytes.len() {
        match bytes[k] {
            b',' => end = k + 1,
            b'|' | b'&' | b'\\' => end = type_continuation_end(bytes, k),
            _ => {}
        }
    }

    Some(SanitizedPart::blank(base, Span::new(start, end)))
}

/// `)` closing an intersection group in `: (A&B)` or `|(A&B)`: the start of
/// the group, or of the `|` in front of it.
fn dnf_group_start(bytes: &[u8], kind: TokenKind, close: usize) -> Option<usize> {
    if kind != TokenKind::CloseParen {
        return None;
    }
    let mut depth = 0usize;
    let mut open = None;
    for i in (0..close).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' if depth == 0 => {
                open = Some(i);
                break;
            }
            b'(' => depth -= 1,
            _ => {}
        }
    }
    let open = open?;
    if !bytes[open + 1..close].contains(&b'&') {
        return None;
    }

    let mut k = open;
    while k > 0 && is_blank(bytes[k - 1]) {
        k -= 1;
    }
    match k.checked_sub(1).map(|i| bytes[i]) {
        Some(b'|') => Some(k - 1),
        Some(b':') => Some(open),
        _ => None,
    }
}

/// End of a `|A&B\C` run, with balanced groups, trailing blanks excluded.
fn type_continuation_end(bytes: &[u8], mut k: usize) -> usize {
    while k < bytes.len() {
        let b = bytes[k];
        if is_ident_byte(b) || matches!(b, b'\\' | b'|' | b'&' | b'?') || is_blank(b) {
            k += 1;
        } else if b == b'(' {
            match matching_paren(bytes, k) {
                Some(close) => k = close + 1,
                None => break,
            }
        } else {
            break;
        }
    }
    while k > 0 && is_blank(bytes[k - 1]) {
        k -= 1;
    }
    k
}

fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            b'\n' | b'\r' => return None,
            _ => {}
        }
    }
    None
}

/// Blank the line of the previous token, keeping `}` and whitespace.
pub fn syntax_error_previous_line(base: &str, error: &SyntaxError) -> Option<SanitizedPart> {
    let token = if error.previous.span.is_empty() { error.current } else { error.previous };
    let bytes = base.as_bytes();
    let start = line_start(bytes, token.span.start);
    let end = line_end(bytes, token.span.start);

    let line = &bytes[start..end];
    let replacement: String = line
        .iter()
        .map(|&b| if b == b'}' || is_blank(b) { b as char } else { ' ' })
        .collect();
    if replacement.as_bytes() == line {
        return None;
    }
    Some(SanitizedPart::new(Span::new(start, end), replacement))
}

/// Blank the stretch around the caret, between the nearest line breaks or
/// braces on either side.
pub fn edited_line(base: &str, caret: Option<usize>) -> Option<SanitizedPart> {
    let bytes = base.as_bytes();
    let caret = caret?.min(bytes.len());
    let is_stop = |b: u8| is_line_break(b) || b == b'{' || b == b'}';

    let start = bytes[..caret].iter().rposition(|&b| is_stop(b)).map_or(0, |i| i + 1);
    let end = bytes[caret..].iter().position(|&b| is_stop(b)).map_or(bytes.len(), |i| caret + i);
    if start >= end {
        return None;
    }
    Some(SanitizedPart::blank(base, Span::new(start, end)))
}

/// Blank the inside of the innermost `{ ... }` around the error.
pub fn syntax_error_block(base: &str, options: LexerOptions, error: &SyntaxError) -> Option<SanitizedPart> {
    let position = error.current.span.start;
    let tokens = Lexer::with_options(base.as_bytes(), options).tokenize();

    let mut opened: Vec<Span> = Vec::new();
    let mut block = None;
    for token in &tokens {
        match token.kind {
            kind if kind.opens_curly() => opened.push(token.span),
            TokenKind::CloseBrace => {
                let Some(open) = opened.pop() else { continue };
                // Pairs around the position nest, so the first to close is innermost
                if open.start < position && token.span.start >= position {
                    block = Some(Span::new(open.end, token.span.start));
                    break;
                }
            }
            _ => {}
        }
    }

    let interior = block?;
    let text = &base.as_bytes()[interior.start..interior.end];
    if text.iter().all(|b| b.is_ascii_whitespace()) {
        return None;
    }
    Some(SanitizedPart::blank(base, interior))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::SyntaxErrorKind;
    use crate::lexer::token::Token;

    fn error(current: (TokenKind, usize, usize), previous: (TokenKind, usize, usize)) -> SyntaxError {
        SyntaxError {
            current: Token::new(current.0, Span::new(current.1, current.2)),
            previous: Token::new(previous.0, Span::new(previous.1, previous.2)),
            expected: vec![],
            kind: SyntaxErrorKind::FirstValid,
        }
    }

    fn patched(base: &str, part: Option<SanitizedPart>) -> Option<String> {
        part.map(|p| p.apply(base))
    }

    #[test]
    fn missing_curly_appends_at_eof() {
        let base = "<?php function f() { if (1) { echo 1;";
        let part = missing_curly(base, LexerOptions::default()).unwrap();
        assert_eq!(part.span(), Span::empty_at(base.len()));
        assert_eq!(part.replacement(), "}}");
    }

    #[test]
    fn missing_curly_goes_before_close_tag() {
        let base = "<?php if ($a) { echo 1; ?>\n<p>html</p>";
        let part = missing_curly(base, LexerOptions::default()).unwrap();
        assert_eq!(part.apply(base), "<?php if ($a) { echo 1;} ?>\n<p>html</p>");
    }

    #[test]
    fn balanced_source_needs_no_curly() {
        assert!(missing_curly("<?php function f() { }", LexerOptions::default()).is_none());
        assert!(missing_curly("<?php } }", LexerOptions::default()).is_none());
    }

    #[test]
    fn require_gets_missing_quote_and_semicolon() {
        let base = "<?php\nrequire 'config.php\n$a = 1;";
        let err = error((TokenKind::Variable, 26, 28), (TokenKind::Require, 6, 13));
        assert_eq!(
            patched(base, require_function_incomplete(base, &err)).as_deref(),
            Some("<?php\nrequire 'config.php';\n$a = 1;")
        );
    }

    #[test]
    fn require_gets_missing_paren() {
        let base = "<?php require_once(__DIR__ . '/a.php'\nfoo();";
        let err = error((TokenKind::Identifier, 38, 41), (TokenKind::StringLiteral, 29, 37));
        assert_eq!(
            patched(base, require_function_incomplete(base, &err)).as_deref(),
            Some("<?php require_once(__DIR__ . '/a.php');\nfoo();")
        );
    }

    #[test]
    fn require_semicolon_goes_after_closing_paren() {
        let base = "<?php include('a.php')\nfoo();";
        let err = error((TokenKind::Identifier, 23, 26), (TokenKind::CloseParen, 21, 22));
        assert_eq!(
            patched(base, require_function_incomplete(base, &err)).as_deref(),
            Some("<?php include('a.php');\nfoo();")
        );
    }

    #[test]
    fn complete_require_is_left_alone() {
        let base = "<?php require 'a.php'; foo(";
        let err = error((TokenKind::Eof, 27, 27), (TokenKind::OpenParen, 26, 27));
        assert!(require_function_incomplete(base, &err).is_none());
    }

    #[test]
    fn current_token_blanking_skips_close_brace() {
        let base = "<?php function f() { $a = }";
        let err = error((TokenKind::CloseBrace, 26, 27), (TokenKind::Eq, 24, 25));
        assert!(syntax_error_current(base, &err).is_none());

        let eof = error((TokenKind::Eof, 27, 27), (TokenKind::CloseBrace, 26, 27));
        assert!(syntax_error_current(base, &eof).is_none());
    }

    #[test]
    fn current_token_is_blanked_in_place() {
        let base = "<?php $a = ; echo 1;";
        let err = error((TokenKind::SemiColon, 11, 12), (TokenKind::Eq, 9, 10));
        assert_eq!(patched(base, syntax_error_current(base, &err)).as_deref(), Some("<?php $a =   echo 1;"));
    }

    #[test]
    fn previous_token_takes_nullable_marker() {
        let base = "<?php function f(? Foo) {}";
        let err = error((TokenKind::CloseParen, 22, 23), (TokenKind::Identifier, 19, 22));
        let part = syntax_error_previous(base, &err).unwrap();
        assert_eq!(part.span(), Span::new(17, 22));
        assert_eq!(part.apply(base), format!("<?php function f({}) {{}}", " ".repeat(5)));
    }

    #[test]
    fn previous_token_takes_trailing_comma() {
        let base = "<?php foo($a $b, $c);";
        let err = error((TokenKind::Variable, 13, 15), (TokenKind::Variable, 10, 12));
        let part = syntax_error_previous(base, &err).unwrap();
        assert_eq!(part.span(), Span::new(10, 12));

        let base = "<?php foo($a , );";
        let err = error((TokenKind::CloseParen, 15, 16), (TokenKind::Variable, 10, 12));
        assert_eq!(syntax_error_previous(base, &err).unwrap().span(), Span::new(10, 14));
    }

    #[test]
    fn previous_token_takes_union_continuation() {
        let base = "<?php function f(): A|B\\C|(D&E) {}";
        let err = error((TokenKind::Pipe, 21, 22), (TokenKind::Identifier, 20, 21));
        assert_eq!(syntax_error_previous(base, &err).unwrap().span(), Span::new(20, 31));
    }

    #[test]
    fn previous_dnf_group_covers_leading_pipe() {
        let base = "<?php function f(): A|(B&C) x {}";
        let err = error((TokenKind::Identifier, 28, 29), (TokenKind::CloseParen, 26, 27));
        assert_eq!(syntax_error_previous(base, &err).unwrap().span(), Span::new(21, 27));

        let base = "<?php function f(): (B&C) x {}";
        let err = error((TokenKind::Identifier, 26, 27), (TokenKind::CloseParen, 24, 25));
        assert_eq!(syntax_error_previous(base, &err).unwrap().span(), Span::new(20, 25));
    }

    #[test]
    fn previous_line_keeps_braces() {
        let base = "<?php\nif ($a) { foo( }\necho 1;";
        let err = error((TokenKind::CloseBrace, 21, 22), (TokenKind::OpenParen, 19, 20));
        assert_eq!(
            patched(base, syntax_error_previous_line(base, &err)).as_deref(),
            Some(format!("<?php\n{}}}\necho 1;", " ".repeat(15)).as_str())
        );
    }

    #[test]
    fn previous_line_declines_when_nothing_changes() {
        let base = "<?php\n  }  \n";
        let err = error((TokenKind::Eof, 12, 12), (TokenKind::CloseBrace, 8, 9));
        assert!(syntax_error_previous_line(base, &err).is_none());
    }

    #[test]
    fn edited_line_stops_at_braces_and_breaks() {
        let base = "<?php function f() {\n  $a->\n}";
        assert_eq!(
            patched(base, edited_line(base, Some(26))),
            Some(format!("<?php function f() {{\n{}\n}}", " ".repeat(6)))
        );
        assert_eq!(
            patched(base, edited_line(base, Some(19))),
            Some(format!("{}{{\n  $a->\n}}", " ".repeat(19)))
        );
        assert!(edited_line(base, None).is_none());
        assert!(edited_line("{}", Some(1)).is_none());
    }

    #[test]
    fn block_interior_is_blanked() {
        let base = "<?php class A { function f() { $a = ; } }";
        let err = error((TokenKind::SemiColon, 36, 37), (TokenKind::Eq, 34, 35));
        assert_eq!(
            patched(base, syntax_error_block(base, LexerOptions::default(), &err)).as_deref(),
            Some(format!("<?php class A {{ function f() {{{}}} }}", " ".repeat(8)).as_str())
        );
    }

    #[test]
    fn block_declines_without_enclosing_pair() {
        let base = "<?php $a = ; { }";
        let err = error((TokenKind::SemiColon, 11, 12), (TokenKind::Eq, 9, 10));
        assert!(syntax_error_block(base, LexerOptions::default(), &err).is_none());
    }
}
