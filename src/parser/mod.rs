mod expr;

use bumpalo::Bump;

use crate::ast::{
    Case, Catch, ClassKind, ClassMember, ConstItem, DeclareItem, Expr, ExprId, Name, Param,
    Program, StaticVar, Stmt, StmtId, Type, UseItem, UseKind,
};
use crate::lexer::Lexer;
use crate::lexer::token::{Token, TokenKind};
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// A token did not match the grammar. The parser unwinds to the
    /// nearest statement list and keeps going.
    SyntaxError,
    /// The parser gave up; no tree is produced.
    FatalParserError,
}

/// Receives every error the parser raises.
pub trait ParserErrorHandler {
    fn handle_error(&mut self, ty: ErrorType, expected: &[TokenKind], current: Token, previous: Token);
}

/// Why a production stopped. The error has already been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Abort {
    Syntax,
    Fatal,
}

pub(crate) type PResult<T> = Result<T, Abort>;

pub struct Parser<'src, 'ast, 'h> {
    lexer: Lexer<'src>,
    arena: &'ast Bump,
    handler: &'h mut dyn ParserErrorHandler,
    current_token: Token,
    next_token: Token,
    previous_token: Token,
    brace_depth: usize,
}

impl<'src, 'ast, 'h> Parser<'src, 'ast, 'h> {
    pub fn new(lexer: Lexer<'src>, arena: &'ast Bump, handler: &'h mut dyn ParserErrorHandler) -> Self {
        let mut parser = Self {
            lexer,
            arena,
            handler,
            current_token: Token::none(),
            next_token: Token::none(),
            previous_token: Token::none(),
            brace_depth: 0,
        };
        parser.fill();
        parser.current_token = parser.next_token;
        parser.fill();
        parser
    }

    /// Unmatched `{` minus unmatched `}` over everything lexed so far.
    /// After `parse_program` this covers the whole input.
    pub fn curly_balance(&self) -> isize {
        self.lexer.curly_balance()
    }

    /// Parse the whole input. `None` means the parser hit a fatal error
    /// (end of file inside an unclosed block).
    pub fn parse_program(&mut self) -> Option<Program<'ast>> {
        match self.parse_top_statements(false) {
            Ok(statements) => Some(Program {
                statements,
                span: Span::new(0, self.lexer.source().len()),
            }),
            Err(_) => {
                self.handler.handle_error(
                    ErrorType::FatalParserError,
                    &[],
                    self.current_token,
                    self.previous_token,
                );
                // Drain so the curly balance covers the whole input
                while self.current_token.kind != TokenKind::Eof {
                    self.bump();
                }
                None
            }
        }
    }

    fn fill(&mut self) {
        loop {
            let token = self.lexer.next().unwrap_or_else(|| {
                let end = self.lexer.source().len();
                Token::new(TokenKind::Eof, Span::empty_at(end))
            });
            if !token.kind.is_trivia() {
                self.next_token = token;
                break;
            }
        }
    }

    fn bump(&mut self) {
        if self.current_token.kind == TokenKind::Eof {
            return;
        }
        match self.current_token.kind {
            kind if kind.opens_curly() => self.brace_depth += 1,
            TokenKind::CloseBrace => self.brace_depth = self.brace_depth.saturating_sub(1),
            _ => {}
        }
        self.previous_token = self.current_token;
        self.current_token = self.next_token;
        if self.current_token.kind != TokenKind::Eof {
            self.fill();
        }
    }

    pub(crate) fn syntax_error(&mut self, expected: &[TokenKind]) -> Abort {
        self.handler.handle_error(
            ErrorType::SyntaxError,
            expected,
            self.current_token,
            self.previous_token,
        );
        Abort::Syntax
    }

    fn unclosed_block(&mut self) -> Abort {
        self.syntax_error(&[TokenKind::CloseBrace]);
        Abort::Fatal
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_token.kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.at(kind) {
            let token = self.current_token;
            self.bump();
            Ok(token)
        } else {
            Err(self.syntax_error(&[kind]))
        }
    }

    fn expect_identifier(&mut self) -> PResult<&'ast Token> {
        if self.at(TokenKind::Identifier) {
            let token = self.arena.alloc(self.current_token);
            self.bump();
            Ok(token)
        } else {
            Err(self.syntax_error(&[TokenKind::Identifier]))
        }
    }

    /// Member names may reuse most keywords: `function list()`, `const CLASS`.
    fn expect_member_name(&mut self) -> PResult<&'ast Token> {
        if self.at(TokenKind::Identifier) || self.current_token.kind.is_semi_reserved() {
            let token = self.arena.alloc(self.current_token);
            self.bump();
            Ok(token)
        } else {
            Err(self.syntax_error(&[TokenKind::Identifier]))
        }
    }

    fn expect_semicolon(&mut self) -> PResult<()> {
        match self.current_token.kind {
            TokenKind::SemiColon => {
                self.bump();
                Ok(())
            }
            // Implicit semicolon at close tag
            TokenKind::CloseTag => Ok(()),
            _ => Err(self.syntax_error(&[TokenKind::SemiColon])),
        }
    }

    fn eat_ampersand(&mut self) -> bool {
        if self.current_token.kind.is_ampersand() {
            self.bump();
            true
        } else {
            false
        }
    }

    /// End offset of the last consumed token.
    fn last_end(&self) -> usize {
        self.previous_token.span.end
    }

    fn stmt(&self, stmt: Stmt<'ast>) -> StmtId<'ast> {
        self.arena.alloc(stmt)
    }

    fn expr(&self, expr: Expr<'ast>) -> ExprId<'ast> {
        self.arena.alloc(expr)
    }

    fn parse_name(&mut self) -> PResult<Name<'ast>> {
        let start = self.current_token.span.start;
        let mut parts = std::vec::Vec::new();

        if self.at(TokenKind::Namespace) {
            parts.push(self.current_token);
            self.bump();
        }
        if self.at(TokenKind::NsSeparator) {
            parts.push(self.current_token);
            self.bump();
        }

        loop {
            let is_part = self.at(TokenKind::Identifier)
                || (!parts.is_empty() && self.current_token.kind.is_semi_reserved());
            if !is_part {
                break;
            }
            parts.push(self.current_token);
            self.bump();

            if self.at(TokenKind::NsSeparator) {
                parts.push(self.current_token);
                self.bump();
            } else {
                break;
            }
        }

        let has_segment = parts
            .iter()
            .any(|t| !matches!(t.kind, TokenKind::Namespace | TokenKind::NsSeparator));
        match parts.last() {
            Some(last) if has_segment => {
                let end = last.span.end;
                Ok(Name {
                    parts: self.arena.alloc_slice_copy(&parts),
                    span: Span::new(start, end),
                })
            }
            _ => Err(self.syntax_error(&[TokenKind::Identifier])),
        }
    }

    /// Top-level statements, or the body of an unbraced namespace.
    fn parse_top_statements(&mut self, in_namespace: bool) -> PResult<&'ast [StmtId<'ast>]> {
        let mut statements: std::vec::Vec<StmtId<'ast>> = std::vec::Vec::new();
        loop {
            match self.current_token.kind {
                TokenKind::Eof => break,
                TokenKind::Namespace
                    if in_namespace && self.next_token.kind != TokenKind::NsSeparator =>
                {
                    break;
                }
                TokenKind::CloseBrace => {
                    let span = self.current_token.span;
                    self.syntax_error(&[TokenKind::Eof]);
                    self.bump();
                    statements.push(self.stmt(Stmt::Error { span }));
                }
                _ => statements.push(self.parse_stmt_recovering(&[])?),
            }
        }
        Ok(self.arena.alloc_slice_copy(&statements))
    }

    /// Statements inside `{ ... }`, up to (not including) the closing brace.
    fn parse_block_statements(&mut self) -> PResult<&'ast [StmtId<'ast>]> {
        let mut statements: std::vec::Vec<StmtId<'ast>> = std::vec::Vec::new();
        loop {
            match self.current_token.kind {
                TokenKind::CloseBrace => break,
                TokenKind::Eof => return Err(self.unclosed_block()),
                _ => statements.push(self.parse_stmt_recovering(&[])?),
            }
        }
        Ok(self.arena.alloc_slice_copy(&statements))
    }

    /// Statements of an alternative-syntax body (`if (...): ... endif;`).
    fn parse_alt_statements(&mut self, terminators: &[TokenKind]) -> PResult<&'ast [StmtId<'ast>]> {
        let mut statements: std::vec::Vec<StmtId<'ast>> = std::vec::Vec::new();
        loop {
            let kind = self.current_token.kind;
            if terminators.contains(&kind) || kind == TokenKind::Eof || kind == TokenKind::CloseBrace {
                break;
            }
            statements.push(self.parse_stmt_recovering(terminators)?);
        }
        Ok(self.arena.alloc_slice_copy(&statements))
    }

    fn parse_stmt_recovering(&mut self, stop: &[TokenKind]) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        let depth = self.brace_depth;
        match self.parse_stmt() {
            Ok(stmt) => Ok(stmt),
            Err(Abort::Fatal) => Err(Abort::Fatal),
            Err(Abort::Syntax) => {
                let span = self.synchronize(start, depth, stop);
                Ok(self.stmt(Stmt::Error { span }))
            }
        }
    }

    /// Skip the rest of a broken statement: through the next `;` at depth 0,
    /// or up to an unmatched `}`, a close tag, a `stop` token or EOF.
    fn synchronize(&mut self, start: usize, depth_at_start: usize, stop: &[TokenKind]) -> Span {
        let mut depth = self.brace_depth.saturating_sub(depth_at_start);
        let mut end = self.last_end().max(start);
        loop {
            let token = self.current_token;
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::CloseTag | TokenKind::CloseBrace if depth == 0 => break,
                TokenKind::CloseBrace => depth -= 1,
                kind if kind.opens_curly() => depth += 1,
                TokenKind::SemiColon if depth == 0 => {
                    end = token.span.end;
                    self.bump();
                    break;
                }
                kind if depth == 0 && stop.contains(&kind) => break,
                _ => {}
            }
            end = token.span.end;
            self.bump();
        }
        Span::new(start, end)
    }

    fn parse_stmt(&mut self) -> PResult<StmtId<'ast>> {
        if self.at(TokenKind::Identifier) && self.next_token.kind == TokenKind::Colon {
            let name = self.arena.alloc(self.current_token);
            self.bump(); // identifier
            self.bump(); // colon
            let span = Span::new(name.span.start, self.last_end());
            return Ok(self.stmt(Stmt::Label { name, span }));
        }

        let start = self.current_token.span.start;
        if self.at(TokenKind::Attribute) {
            self.skip_attributes()?;
            return match self.current_token.kind {
                TokenKind::Function if self.is_function_declaration() => self.parse_function(start),
                TokenKind::Class | TokenKind::Interface | TokenKind::Trait | TokenKind::Enum
                | TokenKind::Abstract | TokenKind::Final | TokenKind::Readonly => {
                    self.parse_class_declaration(start)
                }
                _ => self.parse_expression_stmt(start),
            };
        }

        match self.current_token.kind {
            TokenKind::Abstract | TokenKind::Final => self.parse_class_declaration(start),
            TokenKind::Readonly if matches!(self.next_token.kind, TokenKind::Class | TokenKind::Final | TokenKind::Abstract) => {
                self.parse_class_declaration(start)
            }
            TokenKind::Class | TokenKind::Interface | TokenKind::Trait
                if self.next_token.kind == TokenKind::Identifier =>
            {
                self.parse_class_declaration(start)
            }
            TokenKind::Enum if self.next_token.kind == TokenKind::Identifier => {
                self.parse_class_declaration(start)
            }
            TokenKind::Function if self.is_function_declaration() => self.parse_function(start),
            TokenKind::HaltCompiler => self.parse_halt_compiler(),
            TokenKind::Echo | TokenKind::OpenTagEcho => self.parse_echo(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Throw => {
                self.bump();
                let expr = self.parse_expr(0)?;
                self.expect_semicolon()?;
                Ok(self.stmt(Stmt::Throw { expr, span: Span::new(start, self.last_end()) }))
            }
            TokenKind::Namespace if self.next_token.kind != TokenKind::NsSeparator => {
                self.parse_namespace()
            }
            TokenKind::Use => self.parse_use(),
            TokenKind::Const => self.parse_const_stmt(),
            TokenKind::Goto => {
                self.bump();
                let label = self.expect_identifier()?;
                self.expect_semicolon()?;
                Ok(self.stmt(Stmt::Goto { label, span: Span::new(start, self.last_end()) }))
            }
            TokenKind::Break | TokenKind::Continue => self.parse_break_continue(),
            TokenKind::Declare => self.parse_declare(),
            TokenKind::Global => self.parse_global(),
            TokenKind::Static if self.next_token.kind == TokenKind::Variable => self.parse_static(),
            TokenKind::Unset => self.parse_unset(),
            TokenKind::OpenBrace => self.parse_block(),
            TokenKind::SemiColon | TokenKind::CloseTag | TokenKind::OpenTag => {
                let span = self.current_token.span;
                self.bump();
                Ok(self.stmt(Stmt::Nop { span }))
            }
            TokenKind::InlineHtml => {
                let span = self.current_token.span;
                let value = self.arena.alloc_slice_copy(self.lexer.slice(span));
                self.bump();
                Ok(self.stmt(Stmt::InlineHtml { value, span }))
            }
            _ => self.parse_expression_stmt(start),
        }
    }

    fn is_function_declaration(&self) -> bool {
        self.next_token.kind == TokenKind::Identifier
            || (self.next_token.kind.is_ampersand() && !self.lexer_peek_is_paren())
    }

    // `function &(...)` is a by-ref closure, `function &name(...)` a declaration.
    // Only one token of lookahead is buffered, so look at the raw source.
    fn lexer_peek_is_paren(&self) -> bool {
        let source = self.lexer.source();
        source
            .get(self.next_token.span.end..)
            .and_then(|rest| rest.iter().find(|c| !c.is_ascii_whitespace()))
            == Some(&b'(')
    }

    fn parse_expression_stmt(&mut self, start: usize) -> PResult<StmtId<'ast>> {
        let expr = self.parse_expr(0)?;
        self.expect_semicolon()?;
        Ok(self.stmt(Stmt::Expression { expr, span: Span::new(start, self.last_end()) }))
    }

    /// `#[...]` groups. Attribute contents are not kept in the tree.
    fn skip_attributes(&mut self) -> PResult<()> {
        while self.at(TokenKind::Attribute) {
            self.bump();
            let mut depth = 1usize;
            while depth > 0 {
                match self.current_token.kind {
                    TokenKind::Eof => return Err(self.syntax_error(&[TokenKind::CloseBracket])),
                    TokenKind::OpenBracket | TokenKind::Attribute => depth += 1,
                    TokenKind::CloseBracket => depth -= 1,
                    _ => {}
                }
                self.bump();
            }
        }
        Ok(())
    }

    fn parse_halt_compiler(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        self.expect(TokenKind::OpenParen)?;
        self.expect(TokenKind::CloseParen)?;
        self.expect_semicolon()?;
        let span = Span::new(start, self.last_end());
        // Everything after is raw data
        while !self.at(TokenKind::Eof) {
            self.bump();
        }
        Ok(self.stmt(Stmt::HaltCompiler { span }))
    }

    fn parse_echo(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();

        let mut exprs = std::vec::Vec::new();
        exprs.push(self.parse_expr(0)?);
        while self.eat(TokenKind::Comma) {
            exprs.push(self.parse_expr(0)?);
        }
        self.expect_semicolon()?;

        Ok(self.stmt(Stmt::Echo {
            exprs: self.arena.alloc_slice_copy(&exprs),
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_return(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();

        let expr = if matches!(self.current_token.kind, TokenKind::SemiColon | TokenKind::CloseTag) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        self.expect_semicolon()?;

        Ok(self.stmt(Stmt::Return { expr, span: Span::new(start, self.last_end()) }))
    }

    fn parse_block(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        let statements = self.parse_braced_statements()?;
        Ok(self.stmt(Stmt::Block { statements, span: Span::new(start, self.last_end()) }))
    }

    /// `{ statements }`
    fn parse_braced_statements(&mut self) -> PResult<&'ast [StmtId<'ast>]> {
        self.expect(TokenKind::OpenBrace)?;
        let statements = self.parse_block_statements()?;
        self.expect(TokenKind::CloseBrace)?;
        Ok(statements)
    }

    /// Body of a braced control structure: a block is flattened.
    fn parse_embedded_stmt(&mut self) -> PResult<&'ast [StmtId<'ast>]> {
        let stmt = self.parse_stmt()?;
        Ok(match stmt {
            Stmt::Block { statements, .. } => statements,
            _ => self.arena.alloc_slice_copy(&[stmt]),
        })
    }

    fn parse_paren_expr(&mut self) -> PResult<ExprId<'ast>> {
        self.expect(TokenKind::OpenParen)?;
        let expr = self.parse_expr(0)?;
        self.expect(TokenKind::CloseParen)?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump(); // Eat if
        let condition = self.parse_paren_expr()?;

        if self.eat(TokenKind::Colon) {
            return self.parse_alt_if(start, condition);
        }

        let then_block = self.parse_embedded_stmt()?;
        let else_block = match self.current_token.kind {
            TokenKind::ElseIf => {
                let nested = self.parse_if()?;
                Some(self.arena.alloc_slice_copy(&[nested]) as &'ast [StmtId<'ast>])
            }
            TokenKind::Else => {
                self.bump();
                Some(self.parse_embedded_stmt()?)
            }
            _ => None,
        };

        Ok(self.stmt(Stmt::If {
            condition,
            then_block,
            else_block,
            span: Span::new(start, self.last_end()),
        }))
    }

    /// `if (...): ... elseif (...): ... else: ... endif;`
    fn parse_alt_if(&mut self, start: usize, condition: ExprId<'ast>) -> PResult<StmtId<'ast>> {
        const TERMINATORS: &[TokenKind] = &[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf];
        let then_block = self.parse_alt_statements(TERMINATORS)?;

        let else_block = match self.current_token.kind {
            TokenKind::ElseIf => {
                let elseif_start = self.current_token.span.start;
                self.bump();
                let condition = self.parse_paren_expr()?;
                self.expect(TokenKind::Colon)?;
                let nested = self.parse_alt_if(elseif_start, condition)?;
                return Ok(self.stmt(Stmt::If {
                    condition,
                    then_block,
                    else_block: Some(self.arena.alloc_slice_copy(&[nested])),
                    span: Span::new(start, self.last_end()),
                }));
            }
            TokenKind::Else => {
                self.bump();
                self.expect(TokenKind::Colon)?;
                Some(self.parse_alt_statements(&[TokenKind::EndIf])?)
            }
            _ => None,
        };

        self.expect(TokenKind::EndIf)?;
        self.expect_semicolon()?;

        Ok(self.stmt(Stmt::If {
            condition,
            then_block,
            else_block,
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_while(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        let condition = self.parse_paren_expr()?;

        let body = if self.eat(TokenKind::Colon) {
            let body = self.parse_alt_statements(&[TokenKind::EndWhile])?;
            self.expect(TokenKind::EndWhile)?;
            self.expect_semicolon()?;
            body
        } else {
            self.parse_embedded_stmt()?
        };

        Ok(self.stmt(Stmt::While { condition, body, span: Span::new(start, self.last_end()) }))
    }

    fn parse_do_while(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        let body = self.parse_embedded_stmt()?;
        self.expect(TokenKind::While)?;
        let condition = self.parse_paren_expr()?;
        self.expect_semicolon()?;

        Ok(self.stmt(Stmt::DoWhile { body, condition, span: Span::new(start, self.last_end()) }))
    }

    fn parse_for_exprs(&mut self, terminator: TokenKind) -> PResult<&'ast [ExprId<'ast>]> {
        let mut exprs = std::vec::Vec::new();
        if !self.at(terminator) {
            exprs.push(self.parse_expr(0)?);
            while self.eat(TokenKind::Comma) {
                exprs.push(self.parse_expr(0)?);
            }
        }
        self.expect(terminator)?;
        Ok(self.arena.alloc_slice_copy(&exprs))
    }

    fn parse_for(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        self.expect(TokenKind::OpenParen)?;
        let init = self.parse_for_exprs(TokenKind::SemiColon)?;
        let condition = self.parse_for_exprs(TokenKind::SemiColon)?;
        let step = self.parse_for_exprs(TokenKind::CloseParen)?;

        let body = if self.eat(TokenKind::Colon) {
            let body = self.parse_alt_statements(&[TokenKind::EndFor])?;
            self.expect(TokenKind::EndFor)?;
            self.expect_semicolon()?;
            body
        } else {
            self.parse_embedded_stmt()?
        };

        Ok(self.stmt(Stmt::For { init, condition, step, body, span: Span::new(start, self.last_end()) }))
    }

    fn parse_foreach(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        self.expect(TokenKind::OpenParen)?;
        let expr = self.parse_expr(0)?;
        self.expect(TokenKind::As)?;

        let mut by_ref = self.eat_ampersand();
        let mut value_var = self.parse_expr(0)?;
        let mut key_var = None;
        if self.eat(TokenKind::DoubleArrow) {
            key_var = Some(value_var);
            by_ref = self.eat_ampersand();
            value_var = self.parse_expr(0)?;
        }
        self.expect(TokenKind::CloseParen)?;

        let body = if self.eat(TokenKind::Colon) {
            let body = self.parse_alt_statements(&[TokenKind::EndForeach])?;
            self.expect(TokenKind::EndForeach)?;
            self.expect_semicolon()?;
            body
        } else {
            self.parse_embedded_stmt()?
        };

        Ok(self.stmt(Stmt::Foreach {
            expr,
            key_var,
            value_var,
            by_ref,
            body,
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_switch(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        let condition = self.parse_paren_expr()?;

        let alternative = if self.eat(TokenKind::Colon) {
            true
        } else {
            self.expect(TokenKind::OpenBrace)?;
            false
        };
        let close = if alternative { TokenKind::EndSwitch } else { TokenKind::CloseBrace };
        // Stray `;` after the opening brace is allowed
        self.eat(TokenKind::SemiColon);

        let mut cases = std::vec::Vec::new();
        loop {
            let case_start = self.current_token.span.start;
            let case_condition = match self.current_token.kind {
                kind if kind == close => break,
                TokenKind::Eof if !alternative => return Err(self.unclosed_block()),
                TokenKind::Case => {
                    self.bump();
                    Some(self.parse_expr(0)?)
                }
                TokenKind::Default => {
                    self.bump();
                    None
                }
                _ => {
                    return Err(self.syntax_error(&[TokenKind::Case, TokenKind::Default, close]));
                }
            };
            if !self.eat(TokenKind::Colon) {
                self.expect(TokenKind::SemiColon)?;
            }

            let mut body: std::vec::Vec<StmtId<'ast>> = std::vec::Vec::new();
            loop {
                match self.current_token.kind {
                    kind if kind == close => break,
                    TokenKind::Case | TokenKind::Default | TokenKind::CloseBrace => break,
                    TokenKind::Eof if !alternative => return Err(self.unclosed_block()),
                    TokenKind::Eof => break,
                    _ => body.push(self.parse_stmt_recovering(&[TokenKind::Case, TokenKind::Default, close])?),
                }
            }

            cases.push(Case {
                condition: case_condition,
                body: self.arena.alloc_slice_copy(&body),
                span: Span::new(case_start, self.last_end()),
            });
        }

        self.expect(close)?;
        if alternative {
            self.expect_semicolon()?;
        }

        Ok(self.stmt(Stmt::Switch {
            condition,
            cases: self.arena.alloc_slice_copy(&cases),
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_try(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        let body = self.parse_braced_statements()?;

        let mut catches = std::vec::Vec::new();
        while self.at(TokenKind::Catch) {
            let catch_start = self.current_token.span.start;
            self.bump();
            self.expect(TokenKind::OpenParen)?;

            let mut types = std::vec::Vec::new();
            types.push(self.parse_name()?);
            while self.eat(TokenKind::Pipe) {
                types.push(self.parse_name()?);
            }

            let var = if self.at(TokenKind::Variable) {
                let token = self.arena.alloc(self.current_token);
                self.bump();
                Some(&*token)
            } else {
                None
            };
            self.expect(TokenKind::CloseParen)?;
            let catch_body = self.parse_braced_statements()?;

            catches.push(Catch {
                types: self.arena.alloc_slice_copy(&types),
                var,
                body: catch_body,
                span: Span::new(catch_start, self.last_end()),
            });
        }

        let finally = if self.eat(TokenKind::Finally) {
            Some(self.parse_braced_statements()?)
        } else {
            None
        };

        if catches.is_empty() && finally.is_none() {
            return Err(self.syntax_error(&[TokenKind::Catch, TokenKind::Finally]));
        }

        Ok(self.stmt(Stmt::Try {
            body,
            catches: self.arena.alloc_slice_copy(&catches),
            finally,
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_namespace(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();

        let name = if self.at(TokenKind::OpenBrace) { None } else { Some(self.parse_name()?) };

        if self.at(TokenKind::OpenBrace) {
            let body = self.parse_braced_statements()?;
            return Ok(self.stmt(Stmt::Namespace {
                name,
                body,
                braced: true,
                span: Span::new(start, self.last_end()),
            }));
        }

        self.expect_semicolon()?;
        let body = self.parse_top_statements(true)?;
        Ok(self.stmt(Stmt::Namespace {
            name,
            body,
            braced: false,
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_use_kind(&mut self) -> UseKind {
        match self.current_token.kind {
            TokenKind::Function => {
                self.bump();
                UseKind::Function
            }
            TokenKind::Const => {
                self.bump();
                UseKind::Const
            }
            _ => UseKind::Normal,
        }
    }

    fn parse_use_alias(&mut self) -> PResult<Option<&'ast Token>> {
        if self.eat(TokenKind::As) {
            Ok(Some(self.expect_identifier()?))
        } else {
            Ok(None)
        }
    }

    fn parse_use(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        let kind = self.parse_use_kind();

        let mut uses = std::vec::Vec::new();
        loop {
            let prefix = self.parse_name()?;
            let ends_with_separator = prefix.parts.last().is_some_and(|t| t.kind == TokenKind::NsSeparator);

            if ends_with_separator && self.at(TokenKind::OpenBrace) {
                // Group use: `use A\{B, C as D};`
                self.bump();
                while !self.at(TokenKind::CloseBrace) {
                    self.parse_use_kind();
                    let item = self.parse_name()?;
                    let alias = self.parse_use_alias()?;

                    let mut parts = prefix.parts.to_vec();
                    parts.extend_from_slice(item.parts);
                    uses.push(UseItem {
                        name: Name {
                            parts: self.arena.alloc_slice_copy(&parts),
                            span: Span::new(prefix.span.start, item.span.end),
                        },
                        alias,
                        span: Span::new(item.span.start, self.last_end()),
                    });

                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseBrace)?;
            } else {
                if ends_with_separator {
                    return Err(self.syntax_error(&[TokenKind::Identifier, TokenKind::OpenBrace]));
                }
                let alias = self.parse_use_alias()?;
                uses.push(UseItem { name: prefix, alias, span: Span::new(prefix.span.start, self.last_end()) });
            }

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_semicolon()?;

        Ok(self.stmt(Stmt::Use {
            kind,
            uses: self.arena.alloc_slice_copy(&uses),
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_const_items(&mut self) -> PResult<&'ast [ConstItem<'ast>]> {
        let mut consts = std::vec::Vec::new();
        loop {
            let name = self.expect_member_name()?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_expr(0)?;
            consts.push(ConstItem { name, value, span: Span::new(name.span.start, value.span().end) });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&consts))
    }

    fn parse_const_stmt(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        let consts = self.parse_const_items()?;
        self.expect_semicolon()?;
        Ok(self.stmt(Stmt::Const { consts, span: Span::new(start, self.last_end()) }))
    }

    fn parse_break_continue(&mut self) -> PResult<StmtId<'ast>> {
        let is_break = self.at(TokenKind::Break);
        let start = self.current_token.span.start;
        self.bump();

        let level = if matches!(self.current_token.kind, TokenKind::SemiColon | TokenKind::CloseTag) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        self.expect_semicolon()?;

        let span = Span::new(start, self.last_end());
        Ok(if is_break {
            self.stmt(Stmt::Break { level, span })
        } else {
            self.stmt(Stmt::Continue { level, span })
        })
    }

    fn parse_declare(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        self.expect(TokenKind::OpenParen)?;

        let mut declares = std::vec::Vec::new();
        loop {
            let key = self.expect_identifier()?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_expr(0)?;
            declares.push(DeclareItem { key, value, span: Span::new(key.span.start, value.span().end) });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;

        let body: &'ast [StmtId<'ast>] = if self.at(TokenKind::SemiColon) || self.at(TokenKind::CloseTag) {
            self.expect_semicolon()?;
            &[]
        } else if self.eat(TokenKind::Colon) {
            let body = self.parse_alt_statements(&[TokenKind::EndDeclare])?;
            self.expect(TokenKind::EndDeclare)?;
            self.expect_semicolon()?;
            body
        } else {
            self.parse_embedded_stmt()?
        };

        Ok(self.stmt(Stmt::Declare {
            declares: self.arena.alloc_slice_copy(&declares),
            body,
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_global(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();

        let mut vars = std::vec::Vec::new();
        loop {
            vars.push(self.parse_simple_variable()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_semicolon()?;

        Ok(self.stmt(Stmt::Global {
            vars: self.arena.alloc_slice_copy(&vars),
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_static(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();

        let mut vars = std::vec::Vec::new();
        loop {
            let var = self.expect(TokenKind::Variable)?;
            let var = self.arena.alloc(var);
            let default = if self.eat(TokenKind::Eq) { Some(self.parse_expr(0)?) } else { None };
            vars.push(StaticVar { var, default, span: Span::new(var.span.start, self.last_end()) });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_semicolon()?;

        Ok(self.stmt(Stmt::Static {
            vars: self.arena.alloc_slice_copy(&vars),
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_unset(&mut self) -> PResult<StmtId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        self.expect(TokenKind::OpenParen)?;

        let mut vars = std::vec::Vec::new();
        while !self.at(TokenKind::CloseParen) {
            vars.push(self.parse_expr(0)?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;
        self.expect_semicolon()?;

        Ok(self.stmt(Stmt::Unset {
            vars: self.arena.alloc_slice_copy(&vars),
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_function(&mut self, start: usize) -> PResult<StmtId<'ast>> {
        self.bump(); // Eat function
        let by_ref = self.eat_ampersand();
        let name = self.expect_identifier()?;
        let params = self.parse_parameter_list()?;
        let return_type = self.parse_return_type()?;
        let body = self.parse_braced_statements()?;

        Ok(self.stmt(Stmt::Function {
            name,
            by_ref,
            params,
            return_type,
            body,
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_return_type(&mut self) -> PResult<Option<&'ast Type<'ast>>> {
        if self.eat(TokenKind::Colon) {
            let ty = self.parse_required_type()?;
            Ok(Some(self.arena.alloc(ty)))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn parse_parameter_list(&mut self) -> PResult<&'ast [Param<'ast>]> {
        self.expect(TokenKind::OpenParen)?;
        let mut params = std::vec::Vec::new();
        while !self.at(TokenKind::CloseParen) {
            params.push(self.parse_param()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;
        Ok(self.arena.alloc_slice_copy(&params))
    }

    fn parse_param(&mut self) -> PResult<Param<'ast>> {
        self.skip_attributes()?;
        let start = self.current_token.span.start;

        let mut modifiers = std::vec::Vec::new();
        while matches!(
            self.current_token.kind,
            TokenKind::Public | TokenKind::Protected | TokenKind::Private | TokenKind::Readonly
        ) {
            modifiers.push(self.current_token);
            self.bump();
        }

        let ty = match self.parse_type()? {
            Some(ty) => Some(&*self.arena.alloc(ty)),
            None => None,
        };
        let by_ref = self.eat_ampersand();
        let variadic = self.eat(TokenKind::Ellipsis);
        let name = self.expect(TokenKind::Variable)?;
        let name = self.arena.alloc(name);
        let default = if self.eat(TokenKind::Eq) { Some(self.parse_expr(0)?) } else { None };

        Ok(Param {
            modifiers: self.arena.alloc_slice_copy(&modifiers),
            ty,
            name,
            default,
            by_ref,
            variadic,
            span: Span::new(start, self.last_end()),
        })
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.current_token.kind,
            TokenKind::Question
                | TokenKind::OpenParen
                | TokenKind::Identifier
                | TokenKind::NsSeparator
                | TokenKind::Namespace
                | TokenKind::Array
                | TokenKind::Static
        )
    }

    fn parse_required_type(&mut self) -> PResult<Type<'ast>> {
        match self.parse_type()? {
            Some(ty) => Ok(ty),
            None => Err(self.syntax_error(&[TokenKind::Identifier])),
        }
    }

    fn parse_type_atomic(&mut self) -> PResult<Type<'ast>> {
        match self.current_token.kind {
            TokenKind::Question => {
                self.bump();
                let ty = self.parse_type_atomic()?;
                Ok(Type::Nullable(self.arena.alloc(ty)))
            }
            TokenKind::OpenParen => {
                // DNF group: (A&B)
                self.bump();
                let ty = self.parse_type_intersection()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(ty)
            }
            TokenKind::Array | TokenKind::Static => {
                let token = self.arena.alloc(self.current_token);
                self.bump();
                Ok(Type::Simple(token))
            }
            TokenKind::Identifier | TokenKind::NsSeparator | TokenKind::Namespace => {
                Ok(Type::Name(self.parse_name()?))
            }
            _ => Err(self.syntax_error(&[TokenKind::Identifier])),
        }
    }

    fn parse_type_intersection(&mut self) -> PResult<Type<'ast>> {
        let first = self.parse_type_atomic()?;
        // `&` followed by a variable is a by-ref marker, not an intersection
        if self.current_token.kind != TokenKind::AmpersandNotFollowedByVarOrVararg {
            return Ok(first);
        }

        let mut types = std::vec::Vec::new();
        types.push(first);
        while self.eat(TokenKind::AmpersandNotFollowedByVarOrVararg) {
            types.push(self.parse_type_atomic()?);
        }
        Ok(Type::Intersection(self.arena.alloc_slice_copy(&types)))
    }

    fn parse_type(&mut self) -> PResult<Option<Type<'ast>>> {
        if !self.starts_type() {
            return Ok(None);
        }
        let first = self.parse_type_intersection()?;
        if !self.at(TokenKind::Pipe) {
            return Ok(Some(first));
        }

        let mut types = std::vec::Vec::new();
        types.push(first);
        while self.eat(TokenKind::Pipe) {
            types.push(self.parse_type_intersection()?);
        }
        Ok(Some(Type::Union(self.arena.alloc_slice_copy(&types))))
    }

    fn parse_class_declaration(&mut self, start: usize) -> PResult<StmtId<'ast>> {
        let mut modifiers = std::vec::Vec::new();
        while matches!(self.current_token.kind, TokenKind::Abstract | TokenKind::Final | TokenKind::Readonly) {
            modifiers.push(self.current_token);
            self.bump();
        }

        let kind = match self.current_token.kind {
            TokenKind::Class => ClassKind::Class,
            TokenKind::Interface if modifiers.is_empty() => ClassKind::Interface,
            TokenKind::Trait if modifiers.is_empty() => ClassKind::Trait,
            TokenKind::Enum if modifiers.is_empty() => ClassKind::Enum,
            _ => return Err(self.syntax_error(&[TokenKind::Class])),
        };
        self.bump();
        let name = self.expect_identifier()?;

        let backing_type = if kind == ClassKind::Enum && self.eat(TokenKind::Colon) {
            let ty = self.parse_required_type()?;
            Some(&*self.arena.alloc(ty))
        } else {
            None
        };

        let mut extends = std::vec::Vec::new();
        if matches!(kind, ClassKind::Class | ClassKind::Interface) && self.eat(TokenKind::Extends) {
            extends.push(self.parse_name()?);
            while kind == ClassKind::Interface && self.eat(TokenKind::Comma) {
                extends.push(self.parse_name()?);
            }
        }

        let mut implements = std::vec::Vec::new();
        if matches!(kind, ClassKind::Class | ClassKind::Enum) && self.eat(TokenKind::Implements) {
            implements.push(self.parse_name()?);
            while self.eat(TokenKind::Comma) {
                implements.push(self.parse_name()?);
            }
        }

        let members = self.parse_class_body()?;

        Ok(self.stmt(Stmt::Class {
            kind,
            modifiers: self.arena.alloc_slice_copy(&modifiers),
            name,
            backing_type,
            extends: self.arena.alloc_slice_copy(&extends),
            implements: self.arena.alloc_slice_copy(&implements),
            members,
            span: Span::new(start, self.last_end()),
        }))
    }

    pub(crate) fn parse_class_body(&mut self) -> PResult<&'ast [ClassMember<'ast>]> {
        self.expect(TokenKind::OpenBrace)?;
        let mut members = std::vec::Vec::new();
        loop {
            match self.current_token.kind {
                TokenKind::CloseBrace => break,
                TokenKind::Eof => return Err(self.unclosed_block()),
                _ => {
                    let start = self.current_token.span.start;
                    let depth = self.brace_depth;
                    match self.parse_class_member(&mut members) {
                        Ok(()) => {}
                        Err(Abort::Fatal) => return Err(Abort::Fatal),
                        Err(Abort::Syntax) => {
                            let span = self.synchronize(start, depth, &[]);
                            members.push(ClassMember::Error { span });
                        }
                    }
                }
            }
        }
        self.expect(TokenKind::CloseBrace)?;
        Ok(self.arena.alloc_slice_copy(&members))
    }

    fn parse_class_member(&mut self, members: &mut std::vec::Vec<ClassMember<'ast>>) -> PResult<()> {
        self.skip_attributes()?;
        let start = self.current_token.span.start;

        match self.current_token.kind {
            TokenKind::Use => {
                self.bump();
                let mut traits = std::vec::Vec::new();
                traits.push(self.parse_name()?);
                while self.eat(TokenKind::Comma) {
                    traits.push(self.parse_name()?);
                }
                if self.at(TokenKind::OpenBrace) {
                    self.skip_trait_adaptations()?;
                } else {
                    self.expect_semicolon()?;
                }
                members.push(ClassMember::TraitUse {
                    traits: self.arena.alloc_slice_copy(&traits),
                    span: Span::new(start, self.last_end()),
                });
                return Ok(());
            }
            TokenKind::Case => {
                self.bump();
                let name = self.expect_member_name()?;
                let value = if self.eat(TokenKind::Eq) { Some(self.parse_expr(0)?) } else { None };
                self.expect_semicolon()?;
                members.push(ClassMember::Case { name, value, span: Span::new(start, self.last_end()) });
                return Ok(());
            }
            _ => {}
        }

        let mut modifiers = std::vec::Vec::new();
        while self.current_token.kind.is_modifier() {
            modifiers.push(self.current_token);
            self.bump();
        }
        let modifiers = self.arena.alloc_slice_copy(&modifiers);

        match self.current_token.kind {
            TokenKind::Const => {
                self.bump();
                // Typed class constant: `const int X = 1;`
                if self.at(TokenKind::Identifier)
                    && matches!(self.next_token.kind, TokenKind::Identifier | TokenKind::Pipe | TokenKind::Question)
                {
                    self.parse_required_type()?;
                }
                let consts = self.parse_const_items()?;
                self.expect_semicolon()?;
                members.push(ClassMember::Const { modifiers, consts, span: Span::new(start, self.last_end()) });
            }
            TokenKind::Function => {
                self.bump();
                let by_ref = self.eat_ampersand();
                let name = self.expect_member_name()?;
                let params = self.parse_parameter_list()?;
                let return_type = self.parse_return_type()?;
                let body = if self.at(TokenKind::OpenBrace) {
                    Some(self.parse_braced_statements()?)
                } else {
                    self.expect_semicolon()?;
                    None
                };
                members.push(ClassMember::Method {
                    modifiers,
                    by_ref,
                    name,
                    params,
                    return_type,
                    body,
                    span: Span::new(start, self.last_end()),
                });
            }
            _ if !modifiers.is_empty() => {
                let ty = match self.parse_type()? {
                    Some(ty) => Some(&*self.arena.alloc(ty)),
                    None => None,
                };
                loop {
                    let name = self.expect(TokenKind::Variable)?;
                    let name = self.arena.alloc(name);
                    let default = if self.eat(TokenKind::Eq) { Some(self.parse_expr(0)?) } else { None };
                    members.push(ClassMember::Property {
                        modifiers,
                        ty,
                        name,
                        default,
                        span: Span::new(start, self.last_end()),
                    });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect_semicolon()?;
            }
            _ => {
                return Err(self.syntax_error(&[
                    TokenKind::Function,
                    TokenKind::Const,
                    TokenKind::Use,
                    TokenKind::Public,
                    TokenKind::Protected,
                    TokenKind::Private,
                    TokenKind::CloseBrace,
                ]));
            }
        }
        Ok(())
    }

    /// `use A, B { A::foo insteadof B; B::foo as bar; }`. The adaptation
    /// rules are skipped.
    fn skip_trait_adaptations(&mut self) -> PResult<()> {
        self.expect(TokenKind::OpenBrace)?;
        loop {
            match self.current_token.kind {
                TokenKind::CloseBrace => break,
                TokenKind::Eof => return Err(self.unclosed_block()),
                TokenKind::OpenBrace => return Err(self.syntax_error(&[TokenKind::CloseBrace])),
                _ => self.bump(),
            }
        }
        self.expect(TokenKind::CloseBrace)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    #[derive(Default)]
    struct Recorder {
        errors: std::vec::Vec<(ErrorType, TokenKind)>,
    }

    impl ParserErrorHandler for Recorder {
        fn handle_error(&mut self, ty: ErrorType, _expected: &[TokenKind], current: Token, _previous: Token) {
            self.errors.push((ty, current.kind));
        }
    }

    fn parse(source: &str) -> (bool, std::vec::Vec<(ErrorType, TokenKind)>, isize) {
        let arena = Bump::new();
        let mut recorder = Recorder::default();
        let mut parser = Parser::new(Lexer::new(source.as_bytes()), &arena, &mut recorder);
        let program = parser.parse_program();
        let balance = parser.curly_balance();
        (program.is_some(), recorder.errors, balance)
    }

    #[test]
    fn clean_source_has_no_errors() {
        let (ok, errors, balance) = parse(
            "<?php\nnamespace App;\nuse Foo\\{Bar, Baz as Q};\nfinal class A extends B implements C {\n    public function __construct(private readonly int|string $id = 1) {}\n    public static function list(): ?static { return new static(); }\n}\nif ($a): echo 1; elseif ($b): echo 2; else: echo 3; endif;\n",
        );
        assert!(ok);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(balance, 0);
    }

    #[test]
    fn broken_statement_is_synchronized() {
        let (ok, errors, _) = parse("<?php $a = ; echo 1;");
        assert!(ok);
        assert_eq!(errors, vec![(ErrorType::SyntaxError, TokenKind::SemiColon)]);
    }

    #[test]
    fn eof_inside_block_is_fatal() {
        let (ok, errors, balance) = parse("<?php function f() { echo 1;");
        assert!(!ok);
        assert_eq!(
            errors,
            vec![(ErrorType::SyntaxError, TokenKind::Eof), (ErrorType::FatalParserError, TokenKind::Eof)]
        );
        assert_eq!(balance, 1);
    }

    #[test]
    fn stray_close_brace_becomes_error_statement() {
        let (ok, errors, balance) = parse("<?php echo 1; } echo 2;");
        assert!(ok);
        assert_eq!(errors, vec![(ErrorType::SyntaxError, TokenKind::CloseBrace)]);
        assert_eq!(balance, -1);
    }
}
