pub mod display;
pub mod token;

use token::{Token, TokenKind};
use crate::span::Span;

/// Open-tag flavours accepted besides `<?php` and `<?=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LexerOptions {
    /// `<?` opens PHP code.
    pub short_tags: bool,
    /// `<%` / `<%=` open and `%>` closes PHP code.
    pub asp_tags: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum LexerState {
    Initial,
    Scripting,
    DoubleQuotes,
    Backquote,
    Heredoc(Vec<u8>),
    Nowdoc(Vec<u8>),
    HaltCompiler,
    RawData,
    VarOffset,
}

pub struct Lexer<'src> {
    input: &'src [u8],
    cursor: usize,
    state_stack: Vec<LexerState>,
    options: LexerOptions,
    last_significant: TokenKind,
    curly_balance: isize,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src [u8]) -> Self {
        Self::with_options(input, LexerOptions::default())
    }

    pub fn with_options(input: &'src [u8], options: LexerOptions) -> Self {
        Self {
            input,
            cursor: 0,
            state_stack: vec![LexerState::Initial],
            options,
            last_significant: TokenKind::Eof,
            curly_balance: 0,
        }
    }

    /// Unmatched `{` (positive) or `}` (negative) seen so far.
    pub fn curly_balance(&self) -> isize {
        self.curly_balance
    }

    /// Lex the whole input. The returned vector always ends with `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next() {
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    pub fn source(&self) -> &'src [u8] {
        self.input
    }

    pub fn slice(&self, span: Span) -> &'src [u8] {
        &self.input[span.start.min(self.input.len())..span.end.min(self.input.len())]
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.cursor).copied()
    }

    fn advance(&mut self) {
        self.cursor += 1;
    }

    fn advance_n(&mut self, n: usize) {
        self.cursor += n;
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) {
        while let Some(c) = self.peek() {
            // PHP allows extended ASCII in identifiers
            if c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80 {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn starts_with_ignore_case(&self, at: usize, needle: &[u8]) -> bool {
        self.input
            .get(at..at + needle.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(needle))
    }

    fn read_number(&mut self) -> TokenKind {
        let mut is_float = false;

        // Check for hex/binary/octal
        if self.peek() == Some(b'0') {
            self.advance();
            match self.peek() {
                Some(b'x' | b'X') => {
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_hexdigit() || c == b'_' {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    return TokenKind::LNumber;
                }
                Some(b'b' | b'B') => {
                    self.advance();
                    while let Some(b'0' | b'1' | b'_') = self.peek() {
                        self.advance();
                    }
                    return TokenKind::LNumber;
                }
                Some(b'o' | b'O') => {
                    self.advance();
                    while let Some(b'0'..=b'7' | b'_') = self.peek() {
                        self.advance();
                    }
                    return TokenKind::LNumber;
                }
                _ => {}
            }
        }

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == b'_' {
                self.advance();
            } else if c == b'.' {
                if is_float {
                    break;
                }
                is_float = true;
                self.advance();
            } else if c == b'e' || c == b'E' {
                is_float = true;
                self.advance();
                if let Some(b'+' | b'-') = self.peek() {
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float { TokenKind::DNumber } else { TokenKind::LNumber }
    }

    fn consume_single_line_comment(&mut self) -> TokenKind {
        while let Some(c) = self.peek() {
            if c == b'\n' || c == b'\r' {
                break;
            }
            // Don't consume closing tag
            if c == b'?' && self.input.get(self.cursor + 1) == Some(&b'>') {
                break;
            }
            if self.options.asp_tags && c == b'%' && self.input.get(self.cursor + 1) == Some(&b'>') {
                break;
            }
            self.advance();
        }
        TokenKind::Comment
    }

    fn consume_multi_line_comment(&mut self) -> TokenKind {
        let is_doc = if self.peek() == Some(b'*') && self.input.get(self.cursor + 1) != Some(&b'/') {
            self.advance();
            true
        } else {
            false
        };

        while let Some(c) = self.peek() {
            self.advance();
            if c == b'*' && self.peek() == Some(b'/') {
                self.advance();
                return if is_doc { TokenKind::DocComment } else { TokenKind::Comment };
            }
        }

        TokenKind::Error // Unterminated comment
    }

    fn next_in_var_offset(&mut self) -> Option<Token> {
        let start = self.cursor;
        let Some(&c) = self.input.get(self.cursor) else {
            return Some(Token::new(TokenKind::Eof, Span::new(start, start)));
        };

        if c == b'[' {
            self.advance();
            return Some(Token::new(TokenKind::OpenBracket, Span::new(start, self.cursor)));
        }

        if c == b']' {
            self.advance();
            self.state_stack.pop();
            return Some(Token::new(TokenKind::CloseBracket, Span::new(start, self.cursor)));
        }

        if c == b'$' {
            self.advance();
            if let Some(next) = self.peek() {
                if next.is_ascii_alphabetic() || next == b'_' {
                    self.read_identifier();
                    return Some(Token::new(TokenKind::Variable, Span::new(start, self.cursor)));
                }
            }
            return Some(Token::new(TokenKind::Error, Span::new(start, self.cursor)));
        }

        // Only decimal digits form a T_NUM_STRING inside an offset.
        if c.is_ascii_digit() {
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
            return Some(Token::new(TokenKind::NumString, Span::new(start, self.cursor)));
        }

        if c.is_ascii_alphabetic() || c == b'_' || c >= 0x80 {
            self.read_identifier();
            return Some(Token::new(TokenKind::Identifier, Span::new(start, self.cursor)));
        }

        self.advance();
        let kind = if c == b'-' { TokenKind::Minus } else { TokenKind::Error };
        Some(Token::new(kind, Span::new(start, self.cursor)))
    }

    fn next_in_double_quotes(&mut self) -> Option<Token> {
        let start = self.cursor;
        let Some(&char) = self.input.get(self.cursor) else {
            return Some(Token::new(TokenKind::Eof, Span::new(start, start)));
        };

        match char {
            b'"' if matches!(self.state_stack.last(), Some(LexerState::DoubleQuotes)) => {
                self.advance();
                self.state_stack.pop();
                return Some(Token::new(TokenKind::DoubleQuote, Span::new(start, self.cursor)));
            }
            b'`' if matches!(self.state_stack.last(), Some(LexerState::Backquote)) => {
                self.advance();
                self.state_stack.pop();
                return Some(Token::new(TokenKind::Backtick, Span::new(start, self.cursor)));
            }
            b'$' | b'{' => {
                if let Some(token) = self.interpolation_start() {
                    return Some(token);
                }
            }
            _ => {}
        }

        // EncapsedAndWhitespace
        while let Some(c) = self.peek() {
            if c == b'"' && matches!(self.state_stack.last(), Some(LexerState::DoubleQuotes)) {
                break;
            }
            if c == b'`' && matches!(self.state_stack.last(), Some(LexerState::Backquote)) {
                break;
            }
            if self.at_interpolation() {
                break;
            }

            self.advance();
            if c == b'\\' && self.peek().is_some() {
                self.advance();
            }
        }

        if self.cursor == start {
            // A lone `$` or `{` that does not start an interpolation.
            self.advance();
        }
        Some(Token::new(TokenKind::EncapsedAndWhitespace, Span::new(start, self.cursor)))
    }

    fn at_interpolation(&self) -> bool {
        match self.peek() {
            Some(b'$') => self
                .input
                .get(self.cursor + 1)
                .is_some_and(|next| next.is_ascii_alphabetic() || *next == b'_' || *next == b'{'),
            Some(b'{') => self.input.get(self.cursor + 1) == Some(&b'$'),
            _ => false,
        }
    }

    /// `$var`, `${` or `{$` inside an interpolated string.
    fn interpolation_start(&mut self) -> Option<Token> {
        let start = self.cursor;
        match self.peek()? {
            b'$' => {
                let next = *self.input.get(self.cursor + 1)?;
                if next.is_ascii_alphabetic() || next == b'_' {
                    self.advance();
                    self.read_identifier();
                    if self.peek() == Some(b'[') {
                        self.state_stack.push(LexerState::VarOffset);
                    }
                    Some(Token::new(TokenKind::Variable, Span::new(start, self.cursor)))
                } else if next == b'{' {
                    self.advance_n(2);
                    self.state_stack.push(LexerState::Scripting);
                    Some(Token::new(TokenKind::DollarOpenCurlyBraces, Span::new(start, self.cursor)))
                } else {
                    None
                }
            }
            b'{' if self.input.get(self.cursor + 1) == Some(&b'$') => {
                // Do NOT consume $
                self.advance();
                self.state_stack.push(LexerState::Scripting);
                Some(Token::new(TokenKind::CurlyOpen, Span::new(start, self.cursor)))
            }
            _ => None,
        }
    }

    fn read_single_quoted(&mut self) -> TokenKind {
        while let Some(c) = self.peek() {
            self.advance();
            if c == b'\'' {
                return TokenKind::StringLiteral;
            }
            if c == b'\\' && self.peek().is_some() {
                self.advance(); // Skip escaped char
            }
        }
        TokenKind::Error
    }

    fn read_double_quoted(&mut self, quote: u8, start_pos: usize) -> TokenKind {
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                return TokenKind::StringLiteral;
            } else if c == b'\\' {
                self.advance();
                if self.peek().is_some() {
                    self.advance();
                }
            } else if self.at_interpolation() {
                // Restart right after the opening quote in interpolation mode.
                self.cursor = start_pos + 1;
                self.state_stack.push(if quote == b'"' { LexerState::DoubleQuotes } else { LexerState::Backquote });
                return if quote == b'"' { TokenKind::DoubleQuote } else { TokenKind::Backtick };
            } else {
                self.advance();
            }
        }
        TokenKind::Error
    }

    fn read_heredoc_start(&mut self, start: usize) -> Token {
        while let Some(b' ' | b'\t') = self.peek() {
            self.advance();
        }

        let quote = self.peek();
        let is_quoted = quote == Some(b'\'') || quote == Some(b'"');
        let is_nowdoc = quote == Some(b'\'');

        if is_quoted {
            self.advance();
        }

        let label_start = self.cursor;
        self.read_identifier();
        let label = self.input[label_start..self.cursor].to_vec();

        if is_quoted && self.peek() == quote {
            self.advance();
        }

        // Consume newline after label
        match self.peek() {
            Some(b'\n') => self.advance(),
            Some(b'\r') => {
                self.advance();
                if self.peek() == Some(b'\n') {
                    self.advance();
                }
            }
            _ => {}
        }

        if is_nowdoc {
            self.state_stack.push(LexerState::Nowdoc(label));
        } else {
            self.state_stack.push(LexerState::Heredoc(label));
        }

        Token::new(TokenKind::StartHeredoc, Span::new(start, self.cursor))
    }

    fn check_heredoc_end(&self, label: &[u8]) -> Option<usize> {
        let mut current = self.cursor;
        while let Some(b' ' | b'\t') = self.input.get(current) {
            current += 1;
        }

        if current + label.len() > self.input.len() || label.is_empty() {
            return None;
        }

        if &self.input[current..current + label.len()] == label {
            // Must not be followed by a label character.
            let after = current + label.len();
            match self.input.get(after) {
                None => return Some(after - self.cursor),
                Some(&c) if !c.is_ascii_alphanumeric() && c != b'_' && c < 0x80 => {
                    return Some(after - self.cursor);
                }
                _ => {}
            }
        }
        None
    }

    fn is_followed_by_var_or_vararg(&self) -> bool {
        let mut cursor = self.cursor;
        while cursor < self.input.len() {
            let c = self.input[cursor];
            if c.is_ascii_whitespace() {
                cursor += 1;
                continue;
            }
            if c == b'$' {
                return self
                    .input
                    .get(cursor + 1)
                    .is_some_and(|next| next.is_ascii_alphabetic() || *next == b'_' || *next >= 0x80);
            }
            return c == b'.' && self.input.get(cursor + 1..cursor + 3) == Some(b"..".as_slice());
        }
        false
    }

    fn next_in_nowdoc(&mut self) -> Option<Token> {
        let label = match self.state_stack.last() {
            Some(LexerState::Nowdoc(label)) => label.clone(),
            _ => return None,
        };

        if self.cursor >= self.input.len() {
            return Some(Token::new(TokenKind::Eof, Span::new(self.cursor, self.cursor)));
        }

        let start = self.cursor;
        if let Some(len) = self.check_heredoc_end(&label) {
            self.advance_n(len);
            self.state_stack.pop();
            return Some(Token::new(TokenKind::EndHeredoc, Span::new(start, self.cursor)));
        }

        // Consume content until newline (inclusive)
        while let Some(c) = self.peek() {
            self.advance();
            if c == b'\n' && self.check_heredoc_end(&label).is_some() {
                break;
            }
        }

        Some(Token::new(TokenKind::EncapsedAndWhitespace, Span::new(start, self.cursor)))
    }

    fn next_in_heredoc(&mut self) -> Option<Token> {
        let label = match self.state_stack.last() {
            Some(LexerState::Heredoc(label)) => label.clone(),
            _ => return None,
        };

        if self.cursor >= self.input.len() {
            return Some(Token::new(TokenKind::Eof, Span::new(self.cursor, self.cursor)));
        }

        let start = self.cursor;
        if let Some(len) = self.check_heredoc_end(&label) {
            self.advance_n(len);
            self.state_stack.pop();
            return Some(Token::new(TokenKind::EndHeredoc, Span::new(start, self.cursor)));
        }

        if let Some(token) = self.interpolation_start() {
            return Some(token);
        }

        while let Some(c) = self.peek() {
            if self.at_interpolation() && self.cursor > start {
                break;
            }
            self.advance();
            if c == b'\n' && self.check_heredoc_end(&label).is_some() {
                break;
            }
            if c == b'\\' && self.peek().is_some() {
                self.advance();
            }
        }

        Some(Token::new(TokenKind::EncapsedAndWhitespace, Span::new(start, self.cursor)))
    }

    fn next_in_halt_compiler(&mut self) -> Option<Token> {
        self.skip_whitespace();

        if self.cursor >= self.input.len() {
            return Some(Token::new(TokenKind::Eof, Span::new(self.cursor, self.cursor)));
        }

        let start = self.cursor;
        let c = self.input[self.cursor];
        self.advance();

        let kind = match c {
            b'(' => TokenKind::OpenParen,
            b')' => TokenKind::CloseParen,
            b';' => {
                self.state_stack.pop();
                self.state_stack.push(LexerState::RawData);
                TokenKind::SemiColon
            }
            _ => TokenKind::Error,
        };

        Some(Token::new(kind, Span::new(start, self.cursor)))
    }

    /// Looks for the next open tag while in inline HTML.
    fn next_in_initial(&mut self) -> Token {
        let start = self.cursor;
        while self.cursor < self.input.len() {
            if let Some((kind, len)) = self.open_tag_at(self.cursor) {
                if self.cursor > start {
                    return Token::new(TokenKind::InlineHtml, Span::new(start, self.cursor));
                }
                let tag_start = self.cursor;
                self.state_stack.pop();
                self.state_stack.push(LexerState::Scripting);
                self.advance_n(len);

                // <?php swallows one whitespace character
                if len == 5 && self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                    self.advance();
                }
                return Token::new(kind, Span::new(tag_start, self.cursor));
            }
            self.advance();
        }

        if self.cursor > start {
            return Token::new(TokenKind::InlineHtml, Span::new(start, self.cursor));
        }
        Token::new(TokenKind::Eof, Span::new(self.cursor, self.cursor))
    }

    fn open_tag_at(&self, at: usize) -> Option<(TokenKind, usize)> {
        let rest = &self.input[at..];
        if rest.starts_with(b"<?") {
            if self.starts_with_ignore_case(at, b"<?php") {
                let after = self.input.get(at + 5);
                if after.is_none() || after.is_some_and(|c| c.is_ascii_whitespace()) {
                    return Some((TokenKind::OpenTag, 5));
                }
            }
            if rest.starts_with(b"<?=") {
                return Some((TokenKind::OpenTagEcho, 3));
            }
            if self.options.short_tags {
                return Some((TokenKind::OpenTag, 2));
            }
        } else if self.options.asp_tags && rest.starts_with(b"<%") {
            if rest.starts_with(b"<%=") {
                return Some((TokenKind::OpenTagEcho, 3));
            }
            return Some((TokenKind::OpenTag, 2));
        }
        None
    }

    fn keyword(&mut self, start: usize) -> TokenKind {
        // Member names after -> are never keywords.
        if matches!(self.last_significant, TokenKind::Arrow | TokenKind::NullSafeArrow) {
            return TokenKind::Identifier;
        }

        let text = &self.input[start..self.cursor];
        match text.to_ascii_lowercase().as_slice() {
            b"or" => TokenKind::LogicalOr,
            b"and" => TokenKind::LogicalAnd,
            b"xor" => TokenKind::LogicalXor,
            b"exit" | b"die" => TokenKind::Exit,
            b"function" => TokenKind::Function,
            b"fn" => TokenKind::Fn,
            b"const" => TokenKind::Const,
            b"return" => TokenKind::Return,
            b"yield" => {
                let mut lookahead = self.cursor;
                while self.input.get(lookahead).is_some_and(|c| c.is_ascii_whitespace()) {
                    lookahead += 1;
                }
                let follows_from = lookahead > self.cursor
                    && self.starts_with_ignore_case(lookahead, b"from")
                    && !self
                        .input
                        .get(lookahead + 4)
                        .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_');
                if follows_from {
                    self.cursor = lookahead + 4;
                    TokenKind::YieldFrom
                } else {
                    TokenKind::Yield
                }
            }
            b"try" => TokenKind::Try,
            b"catch" => TokenKind::Catch,
            b"finally" => TokenKind::Finally,
            b"throw" => TokenKind::Throw,
            b"if" => TokenKind::If,
            b"elseif" => TokenKind::ElseIf,
            b"endif" => TokenKind::EndIf,
            b"else" => TokenKind::Else,
            b"while" => TokenKind::While,
            b"endwhile" => TokenKind::EndWhile,
            b"do" => TokenKind::Do,
            b"for" => TokenKind::For,
            b"endfor" => TokenKind::EndFor,
            b"foreach" => TokenKind::Foreach,
            b"endforeach" => TokenKind::EndForeach,
            b"declare" => TokenKind::Declare,
            b"enddeclare" => TokenKind::EndDeclare,
            b"instanceof" => TokenKind::InstanceOf,
            b"as" => TokenKind::As,
            b"switch" => TokenKind::Switch,
            b"endswitch" => TokenKind::EndSwitch,
            b"case" => TokenKind::Case,
            b"default" => TokenKind::Default,
            b"break" => TokenKind::Break,
            b"continue" => TokenKind::Continue,
            b"goto" => TokenKind::Goto,
            b"echo" => TokenKind::Echo,
            b"print" => TokenKind::Print,
            b"enum" => TokenKind::Enum,
            b"class" => TokenKind::Class,
            b"interface" => TokenKind::Interface,
            b"trait" => TokenKind::Trait,
            b"extends" => TokenKind::Extends,
            b"implements" => TokenKind::Implements,
            b"new" => TokenKind::New,
            b"clone" => TokenKind::Clone,
            b"var" => TokenKind::Var,
            b"public" => TokenKind::Public,
            b"protected" => TokenKind::Protected,
            b"private" => TokenKind::Private,
            b"final" => TokenKind::Final,
            b"abstract" => TokenKind::Abstract,
            b"static" => TokenKind::Static,
            b"readonly" => TokenKind::Readonly,
            b"namespace" => TokenKind::Namespace,
            b"use" => TokenKind::Use,
            b"insteadof" => TokenKind::Insteadof,
            b"global" => TokenKind::Global,
            b"isset" => TokenKind::Isset,
            b"empty" => TokenKind::Empty,
            b"__halt_compiler" => {
                self.state_stack.pop();
                self.state_stack.push(LexerState::HaltCompiler);
                TokenKind::HaltCompiler
            }
            b"__class__" => TokenKind::ClassC,
            b"__trait__" => TokenKind::TraitC,
            b"__function__" => TokenKind::FuncC,
            b"__method__" => TokenKind::MethodC,
            b"__line__" => TokenKind::Line,
            b"__file__" => TokenKind::File,
            b"__dir__" => TokenKind::Dir,
            b"__namespace__" => TokenKind::NsC,
            b"__property__" => TokenKind::PropertyC,
            b"array" => TokenKind::Array,
            b"match" => TokenKind::Match,
            b"list" => TokenKind::List,
            b"include" => TokenKind::Include,
            b"include_once" => TokenKind::IncludeOnce,
            b"require" => TokenKind::Require,
            b"require_once" => TokenKind::RequireOnce,
            b"eval" => TokenKind::Eval,
            b"unset" => TokenKind::Unset,
            _ => TokenKind::Identifier,
        }
    }

    fn cast_or_paren(&mut self) -> TokenKind {
        let saved_cursor = self.cursor;
        while let Some(b' ' | b'\t') = self.peek() {
            self.advance();
        }

        let start_ident = self.cursor;
        self.read_identifier();
        if self.cursor > start_ident {
            let ident = self.input[start_ident..self.cursor].to_ascii_lowercase();
            while let Some(b' ' | b'\t') = self.peek() {
                self.advance();
            }
            if self.peek() == Some(b')') {
                let cast_kind = match ident.as_slice() {
                    b"int" | b"integer" => Some(TokenKind::IntCast),
                    b"bool" | b"boolean" => Some(TokenKind::BoolCast),
                    b"float" | b"double" | b"real" => Some(TokenKind::FloatCast),
                    b"string" | b"binary" => Some(TokenKind::StringCast),
                    b"array" => Some(TokenKind::ArrayCast),
                    b"object" => Some(TokenKind::ObjectCast),
                    b"unset" => Some(TokenKind::UnsetCast),
                    _ => None,
                };
                if let Some(kind) = cast_kind {
                    self.advance(); // Eat ')'
                    return kind;
                }
            }
        }
        self.cursor = saved_cursor;
        TokenKind::OpenParen
    }

    fn next_token(&mut self) -> Token {
        match self.state_stack.last() {
            Some(LexerState::Initial) | None => return self.next_in_initial(),
            Some(LexerState::DoubleQuotes | LexerState::Backquote) => {
                if let Some(token) = self.next_in_double_quotes() {
                    return token;
                }
            }
            Some(LexerState::Heredoc(_)) => {
                if let Some(token) = self.next_in_heredoc() {
                    return token;
                }
            }
            Some(LexerState::Nowdoc(_)) => {
                if let Some(token) = self.next_in_nowdoc() {
                    return token;
                }
            }
            Some(LexerState::HaltCompiler) => {
                if let Some(token) = self.next_in_halt_compiler() {
                    return token;
                }
            }
            Some(LexerState::VarOffset) => {
                if let Some(token) = self.next_in_var_offset() {
                    return token;
                }
            }
            Some(LexerState::RawData) => {
                let start = self.cursor;
                if start >= self.input.len() {
                    return Token::new(TokenKind::Eof, Span::new(start, start));
                }
                self.cursor = self.input.len(); // Consume all
                return Token::new(TokenKind::InlineHtml, Span::new(start, self.cursor));
            }
            Some(LexerState::Scripting) => {}
        }

        self.skip_whitespace();

        if self.cursor >= self.input.len() {
            return Token::new(TokenKind::Eof, Span::new(self.cursor, self.cursor));
        }

        let start = self.cursor;
        let char = self.input[self.cursor];
        self.advance();

        let kind = match char {
            b'$' => match self.peek() {
                Some(c) if c.is_ascii_alphabetic() || c == b'_' || c >= 0x80 => {
                    self.read_identifier();
                    TokenKind::Variable
                }
                _ => TokenKind::Dollar,
            },
            b'\\' => TokenKind::NsSeparator,
            b'\'' => self.read_single_quoted(),
            b'"' => self.read_double_quoted(b'"', start),
            b'`' => self.read_double_quoted(b'`', start),
            b'#' => {
                if self.peek() == Some(b'[') {
                    self.advance();
                    TokenKind::Attribute
                } else {
                    self.consume_single_line_comment()
                }
            }
            b';' => TokenKind::SemiColon,
            b':' => {
                if self.peek() == Some(b':') {
                    self.advance();
                    TokenKind::DoubleColon
                } else {
                    TokenKind::Colon
                }
            }
            b',' => TokenKind::Comma,
            b'{' => {
                self.state_stack.push(LexerState::Scripting);
                TokenKind::OpenBrace
            }
            b'}' => {
                if self.state_stack.len() > 1 {
                    self.state_stack.pop();
                }
                TokenKind::CloseBrace
            }
            b'(' => self.cast_or_paren(),
            b')' => TokenKind::CloseParen,
            b'[' => TokenKind::OpenBracket,
            b']' => TokenKind::CloseBracket,
            b'+' => match self.peek() {
                Some(b'+') => { self.advance(); TokenKind::Inc }
                Some(b'=') => { self.advance(); TokenKind::PlusEq }
                _ => TokenKind::Plus,
            },
            b'-' => match self.peek() {
                Some(b'>') => { self.advance(); TokenKind::Arrow }
                Some(b'-') => { self.advance(); TokenKind::Dec }
                Some(b'=') => { self.advance(); TokenKind::MinusEq }
                _ => TokenKind::Minus,
            },
            b'*' => {
                if self.peek() == Some(b'*') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::PowEq
                    } else {
                        TokenKind::Pow
                    }
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::MulEq
                } else {
                    TokenKind::Asterisk
                }
            }
            b'/' => match self.peek() {
                Some(b'/') => { self.advance(); self.consume_single_line_comment() }
                Some(b'*') => { self.advance(); self.consume_multi_line_comment() }
                Some(b'=') => { self.advance(); TokenKind::DivEq }
                _ => TokenKind::Slash,
            },
            b'%' => match self.peek() {
                Some(b'=') => { self.advance(); TokenKind::ModEq }
                Some(b'>') if self.options.asp_tags => {
                    self.advance();
                    self.state_stack.pop();
                    self.state_stack.push(LexerState::Initial);
                    TokenKind::CloseTag
                }
                _ => TokenKind::Percent,
            },
            b'.' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::ConcatEq
                } else if self.peek() == Some(b'.') && self.input.get(self.cursor + 1) == Some(&b'.') {
                    self.advance_n(2);
                    TokenKind::Ellipsis
                } else if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.cursor -= 1;
                    self.read_number()
                } else {
                    TokenKind::Dot
                }
            }
            b'=' => match self.peek() {
                Some(b'=') => {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                }
                Some(b'>') => { self.advance(); TokenKind::DoubleArrow }
                _ => TokenKind::Eq,
            },
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::BangEqEq
                    } else {
                        TokenKind::BangEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.peek() == Some(b'<') && self.input.get(self.cursor + 1) == Some(&b'<') {
                    self.advance_n(2);
                    return self.read_heredoc_start(start);
                }
                match self.peek() {
                    Some(b'=') => {
                        self.advance();
                        if self.peek() == Some(b'>') {
                            self.advance();
                            TokenKind::Spaceship
                        } else {
                            TokenKind::LtEq
                        }
                    }
                    Some(b'<') => {
                        self.advance();
                        if self.peek() == Some(b'=') {
                            self.advance();
                            TokenKind::SlEq
                        } else {
                            TokenKind::Sl
                        }
                    }
                    Some(b'>') => { self.advance(); TokenKind::BangEq }
                    _ => TokenKind::Lt,
                }
            }
            b'>' => match self.peek() {
                Some(b'=') => { self.advance(); TokenKind::GtEq }
                Some(b'>') => {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::SrEq
                    } else {
                        TokenKind::Sr
                    }
                }
                _ => TokenKind::Gt,
            },
            b'&' => match self.peek() {
                Some(b'&') => { self.advance(); TokenKind::AmpersandAmpersand }
                Some(b'=') => { self.advance(); TokenKind::AndEq }
                _ if self.is_followed_by_var_or_vararg() => TokenKind::AmpersandFollowedByVarOrVararg,
                _ => TokenKind::AmpersandNotFollowedByVarOrVararg,
            },
            b'|' => match self.peek() {
                Some(b'|') => { self.advance(); TokenKind::PipePipe }
                Some(b'=') => { self.advance(); TokenKind::OrEq }
                _ => TokenKind::Pipe,
            },
            b'^' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::XorEq
                } else {
                    TokenKind::Caret
                }
            }
            b'~' => TokenKind::BitNot,
            b'@' => TokenKind::At,
            b'?' => {
                if self.peek() == Some(b'>') {
                    self.advance();
                    self.state_stack.pop();
                    self.state_stack.push(LexerState::Initial);
                    TokenKind::CloseTag
                } else if self.peek() == Some(b'?') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::CoalesceEq
                    } else {
                        TokenKind::Coalesce
                    }
                } else if self.peek() == Some(b'-') && self.input.get(self.cursor + 1) == Some(&b'>') {
                    self.advance_n(2);
                    TokenKind::NullSafeArrow
                } else {
                    TokenKind::Question
                }
            }
            c if c.is_ascii_digit() => {
                self.cursor -= 1;
                self.read_number()
            }
            c if c.is_ascii_alphabetic() || c == b'_' || c >= 0x80 => {
                // Binary string prefix
                if c == b'b' || c == b'B' {
                    match self.peek() {
                        Some(b'\'') => {
                            self.advance();
                            let kind = self.read_single_quoted();
                            return Token::new(kind, Span::new(start, self.cursor));
                        }
                        Some(b'"') => {
                            let quote_pos = self.cursor;
                            self.advance();
                            let kind = self.read_double_quoted(b'"', quote_pos);
                            return Token::new(kind, Span::new(start, self.cursor));
                        }
                        _ => {}
                    }
                }

                self.read_identifier();
                self.keyword(start)
            }
            _ => TokenKind::Error,
        };

        Token::new(kind, Span::new(start, self.cursor))
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        match token.kind {
            kind if kind.opens_curly() => self.curly_balance += 1,
            TokenKind::CloseBrace => self.curly_balance -= 1,
            _ => {}
        }
        if !token.kind.is_trivia() {
            self.last_significant = token.kind;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str, options: LexerOptions) -> Vec<TokenKind> {
        Lexer::with_options(source.as_bytes(), options)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn short_tags_open_php_only_when_enabled() {
        let source = "<? echo 1; ?>";
        let plain = kinds(source, LexerOptions::default());
        assert_eq!(plain, vec![TokenKind::InlineHtml, TokenKind::Eof]);

        let short = kinds(source, LexerOptions { short_tags: true, asp_tags: false });
        assert_eq!(
            short,
            vec![
                TokenKind::OpenTag,
                TokenKind::Echo,
                TokenKind::LNumber,
                TokenKind::SemiColon,
                TokenKind::CloseTag,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn asp_tags_open_and_close() {
        let source = "<% echo 1 %>x";
        let asp = kinds(source, LexerOptions { short_tags: false, asp_tags: true });
        assert_eq!(
            asp,
            vec![
                TokenKind::OpenTag,
                TokenKind::Echo,
                TokenKind::LNumber,
                TokenKind::CloseTag,
                TokenKind::InlineHtml,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn curly_balance_counts_interpolation_braces() {
        let source = "<?php function f() { echo \"{$a} ${b}\"; ";
        let mut lexer = Lexer::new(source.as_bytes());
        while let Some(token) = lexer.next() {
            if token.kind == TokenKind::Eof {
                break;
            }
        }
        assert_eq!(lexer.curly_balance(), 1);
    }

    #[test]
    fn keywords_after_arrow_are_identifiers() {
        let ks = kinds("<?php $a->list->class;", LexerOptions::default());
        assert_eq!(
            ks,
            vec![
                TokenKind::OpenTag,
                TokenKind::Variable,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::SemiColon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn alternative_syntax_end_keywords() {
        let ks = kinds("<?php endif; endwhile; endforeach;", LexerOptions::default());
        assert!(ks.contains(&TokenKind::EndIf));
        assert!(ks.contains(&TokenKind::EndWhile));
        assert!(ks.contains(&TokenKind::EndForeach));
    }
}
