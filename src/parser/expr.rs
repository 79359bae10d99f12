use crate::ast::{
    Arg, ArrayItem, AssignOp, BinaryOp, CastKind, ClosureUse, Expr, ExprId, IncludeKind,
    MagicConstKind, MatchArm, UnaryOp,
};
use crate::lexer::token::{Token, TokenKind};
use crate::parser::{PResult, Parser};
use crate::span::Span;

/// Reported when an operand is missing.
const EXPR_START: &[TokenKind] = &[
    TokenKind::Variable,
    TokenKind::Identifier,
    TokenKind::LNumber,
    TokenKind::StringLiteral,
    TokenKind::OpenParen,
];

const ASSIGN_BP: u8 = 35;
const UNARY_BP: u8 = 180;
/// `print`, `yield`, `include` bind looser than everything but `and`/`xor`/`or`.
const LOW_PREFIX_BP: u8 = 31;

impl<'src, 'ast, 'h> Parser<'src, 'ast, 'h> {
    pub(super) fn parse_call_arguments(&mut self) -> PResult<(&'ast [Arg<'ast>], Span)> {
        let start = self.expect(TokenKind::OpenParen)?.span.start;

        let mut args = std::vec::Vec::new();
        while !self.at(TokenKind::CloseParen) {
            let arg_start = self.current_token.span.start;

            // First-class callable syntax: foo(...)
            if self.at(TokenKind::Ellipsis) && self.next_token.kind == TokenKind::CloseParen {
                self.bump();
                break;
            }

            let mut name: Option<&'ast Token> = None;
            if (self.at(TokenKind::Identifier) || self.current_token.kind.is_semi_reserved())
                && self.next_token.kind == TokenKind::Colon
            {
                name = Some(self.arena.alloc(self.current_token));
                self.bump(); // Identifier
                self.bump(); // Colon
            }
            let unpack = self.eat(TokenKind::Ellipsis);
            let value = self.parse_expr(0)?;

            args.push(Arg { name, value, unpack, span: Span::new(arg_start, value.span().end) });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;
        Ok((self.arena.alloc_slice_copy(&args), Span::new(start, self.last_end())))
    }

    fn parse_closure_expr(&mut self, is_static: bool, start: usize) -> PResult<ExprId<'ast>> {
        self.bump(); // Eat function
        let by_ref = self.eat_ampersand();
        let params = self.parse_parameter_list()?;

        let mut uses = std::vec::Vec::new();
        if self.eat(TokenKind::Use) {
            self.expect(TokenKind::OpenParen)?;
            while !self.at(TokenKind::CloseParen) {
                let use_start = self.current_token.span.start;
                let by_ref = self.eat_ampersand();
                let var = self.expect(TokenKind::Variable)?;
                let var: &'ast Token = self.arena.alloc(var);
                uses.push(ClosureUse { var, by_ref, span: Span::new(use_start, var.span.end) });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::CloseParen)?;
        }

        let return_type = self.parse_return_type()?;
        let body = self.parse_braced_statements()?;

        Ok(self.expr(Expr::Closure {
            is_static,
            by_ref,
            params,
            uses: self.arena.alloc_slice_copy(&uses),
            return_type,
            body,
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_arrow_function(&mut self, is_static: bool, start: usize) -> PResult<ExprId<'ast>> {
        self.bump(); // Eat fn
        let by_ref = self.eat_ampersand();
        let params = self.parse_parameter_list()?;
        let return_type = self.parse_return_type()?;
        self.expect(TokenKind::DoubleArrow)?;
        let expr = self.parse_expr(0)?;

        Ok(self.expr(Expr::ArrowFunction {
            is_static,
            by_ref,
            params,
            return_type,
            expr,
            span: Span::new(start, expr.span().end),
        }))
    }

    pub(super) fn parse_expr(&mut self, min_bp: u8) -> PResult<ExprId<'ast>> {
        let mut left = self.parse_nud()?;

        loop {
            let op = match self.current_token.kind {
                TokenKind::Plus => BinaryOp::Plus,
                TokenKind::Minus => BinaryOp::Minus,
                TokenKind::Asterisk => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                TokenKind::Dot => BinaryOp::Concat,
                TokenKind::EqEq => BinaryOp::EqEq,
                TokenKind::EqEqEq => BinaryOp::EqEqEq,
                TokenKind::BangEq => BinaryOp::NotEq,
                TokenKind::BangEqEq => BinaryOp::NotEqEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                TokenKind::AmpersandAmpersand => BinaryOp::And,
                TokenKind::PipePipe => BinaryOp::Or,
                TokenKind::AmpersandFollowedByVarOrVararg
                | TokenKind::AmpersandNotFollowedByVarOrVararg => BinaryOp::BitAnd,
                TokenKind::Pipe => BinaryOp::BitOr,
                TokenKind::Caret => BinaryOp::BitXor,
                TokenKind::LogicalAnd => BinaryOp::LogicalAnd,
                TokenKind::LogicalOr => BinaryOp::LogicalOr,
                TokenKind::LogicalXor => BinaryOp::LogicalXor,
                TokenKind::Coalesce => BinaryOp::Coalesce,
                TokenKind::Spaceship => BinaryOp::Spaceship,
                TokenKind::Pow => BinaryOp::Pow,
                TokenKind::Sl => BinaryOp::ShiftLeft,
                TokenKind::Sr => BinaryOp::ShiftRight,
                TokenKind::InstanceOf => BinaryOp::Instanceof,
                TokenKind::Question => {
                    // Ternary: a ? b : c, a ?: c
                    let (l_bp, r_bp) = (40, 41);
                    if l_bp < min_bp {
                        break;
                    }
                    self.bump();

                    let if_true = if self.at(TokenKind::Colon) { None } else { Some(self.parse_expr(0)?) };
                    self.expect(TokenKind::Colon)?;
                    let if_false = self.parse_expr(r_bp)?;

                    let span = Span::new(left.span().start, if_false.span().end);
                    left = self.expr(Expr::Ternary { condition: left, if_true, if_false, span });
                    continue;
                }
                TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::MulEq
                | TokenKind::DivEq
                | TokenKind::ModEq
                | TokenKind::ConcatEq
                | TokenKind::AndEq
                | TokenKind::OrEq
                | TokenKind::XorEq
                | TokenKind::SlEq
                | TokenKind::SrEq
                | TokenKind::PowEq
                | TokenKind::CoalesceEq => {
                    let op = match self.current_token.kind {
                        TokenKind::PlusEq => AssignOp::Plus,
                        TokenKind::MinusEq => AssignOp::Minus,
                        TokenKind::MulEq => AssignOp::Mul,
                        TokenKind::DivEq => AssignOp::Div,
                        TokenKind::ModEq => AssignOp::Mod,
                        TokenKind::ConcatEq => AssignOp::Concat,
                        TokenKind::AndEq => AssignOp::BitAnd,
                        TokenKind::OrEq => AssignOp::BitOr,
                        TokenKind::XorEq => AssignOp::BitXor,
                        TokenKind::SlEq => AssignOp::ShiftLeft,
                        TokenKind::SrEq => AssignOp::ShiftRight,
                        TokenKind::PowEq => AssignOp::Pow,
                        _ => AssignOp::Coalesce,
                    };
                    if ASSIGN_BP < min_bp {
                        break;
                    }
                    self.bump();
                    let right = self.parse_expr(ASSIGN_BP - 1)?;
                    let span = Span::new(left.span().start, right.span().end);
                    left = self.expr(Expr::AssignOp { var: left, op, expr: right, span });
                    continue;
                }
                TokenKind::Eq => {
                    if ASSIGN_BP < min_bp {
                        break;
                    }
                    self.bump();

                    // Assignment by reference: $a = &$b
                    if self.eat_ampersand() {
                        let right = self.parse_expr(ASSIGN_BP - 1)?;
                        let span = Span::new(left.span().start, right.span().end);
                        left = self.expr(Expr::AssignRef { var: left, expr: right, span });
                        continue;
                    }

                    // Right associative
                    let right = self.parse_expr(ASSIGN_BP - 1)?;
                    let span = Span::new(left.span().start, right.span().end);
                    left = self.expr(Expr::Assign { var: left, expr: right, span });
                    continue;
                }
                TokenKind::OpenBracket => {
                    // Array Dimension Fetch: $a[1]
                    self.bump();
                    let dim = if self.at(TokenKind::CloseBracket) { None } else { Some(self.parse_expr(0)?) };
                    self.expect(TokenKind::CloseBracket)?;
                    let span = Span::new(left.span().start, self.last_end());
                    left = self.expr(Expr::ArrayDimFetch { array: left, dim, span });
                    continue;
                }
                TokenKind::Arrow | TokenKind::NullSafeArrow => {
                    let nullsafe = self.at(TokenKind::NullSafeArrow);
                    self.bump();
                    let member = self.parse_member_name()?;

                    if self.at(TokenKind::OpenParen) {
                        let (args, args_span) = self.parse_call_arguments()?;
                        let span = Span::new(left.span().start, args_span.end);
                        left = self.expr(Expr::MethodCall { target: left, method: member, args, nullsafe, span });
                    } else {
                        let span = Span::new(left.span().start, member.span().end);
                        left = self.expr(Expr::PropertyFetch { target: left, property: member, nullsafe, span });
                    }
                    continue;
                }
                TokenKind::DoubleColon => {
                    // Static Property/Method/Const: A::$b, A::b(), A::CONST
                    self.bump();
                    let is_property = self.at(TokenKind::Variable);
                    let member = self.parse_member_name()?;

                    if self.at(TokenKind::OpenParen) {
                        let (args, args_span) = self.parse_call_arguments()?;
                        let span = Span::new(left.span().start, args_span.end);
                        left = self.expr(Expr::StaticCall { class: left, method: member, args, span });
                    } else if is_property {
                        let span = Span::new(left.span().start, member.span().end);
                        left = self.expr(Expr::StaticPropertyFetch { class: left, property: member, span });
                    } else {
                        let span = Span::new(left.span().start, member.span().end);
                        left = self.expr(Expr::ClassConstFetch { class: left, constant: member, span });
                    }
                    continue;
                }
                TokenKind::OpenParen => {
                    // Function Call
                    let (args, args_span) = self.parse_call_arguments()?;
                    let span = Span::new(left.span().start, args_span.end);
                    left = self.expr(Expr::Call { func: left, args, span });
                    continue;
                }
                TokenKind::Inc | TokenKind::Dec => {
                    let is_inc = self.at(TokenKind::Inc);
                    let end = self.current_token.span.end;
                    self.bump();
                    let span = Span::new(left.span().start, end);
                    left = if is_inc {
                        self.expr(Expr::PostInc { var: left, span })
                    } else {
                        self.expr(Expr::PostDec { var: left, span })
                    };
                    continue;
                }
                _ => break,
            };

            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }

            self.bump();
            let right = self.parse_expr(r_bp)?;

            let span = Span::new(left.span().start, right.span().end);
            left = self.expr(Expr::Binary { left, op, right, span });
        }

        Ok(left)
    }

    /// Name after `->`, `?->` or `::`.
    fn parse_member_name(&mut self) -> PResult<ExprId<'ast>> {
        let token = self.current_token;
        match token.kind {
            TokenKind::Identifier => {
                self.bump();
                Ok(self.expr(Expr::Identifier { name: token.span, span: token.span }))
            }
            kind if kind.is_semi_reserved() => {
                self.bump();
                Ok(self.expr(Expr::Identifier { name: token.span, span: token.span }))
            }
            TokenKind::Variable | TokenKind::Dollar => self.parse_simple_variable(),
            TokenKind::OpenBrace => {
                self.bump();
                let expr = self.parse_expr(0)?;
                self.expect(TokenKind::CloseBrace)?;
                Ok(expr)
            }
            _ => Err(self.syntax_error(&[TokenKind::Identifier, TokenKind::Variable])),
        }
    }

    /// `$a`, `$$a`, `${expr}`
    pub(super) fn parse_simple_variable(&mut self) -> PResult<ExprId<'ast>> {
        let token = self.current_token;
        match token.kind {
            TokenKind::Variable => {
                self.bump();
                Ok(self.expr(Expr::Variable { name: token.span, span: token.span }))
            }
            TokenKind::Dollar => {
                self.bump();
                let name = if self.eat(TokenKind::OpenBrace) {
                    let expr = self.parse_expr(0)?;
                    self.expect(TokenKind::CloseBrace)?;
                    expr
                } else {
                    self.parse_simple_variable()?
                };
                let span = Span::new(token.span.start, self.last_end());
                Ok(self.expr(Expr::IndirectVariable { name, span }))
            }
            _ => Err(self.syntax_error(&[TokenKind::Variable])),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp, bp: u8) -> PResult<ExprId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        let expr = self.parse_expr(bp)?;
        Ok(self.expr(Expr::Unary { op, expr, span: Span::new(start, expr.span().end) }))
    }

    /// `isset(...)`, `empty(...)`, `eval(...)`: keyword plus parenthesized list.
    fn parse_paren_list(&mut self) -> PResult<&'ast [ExprId<'ast>]> {
        self.expect(TokenKind::OpenParen)?;
        let mut exprs = std::vec::Vec::new();
        while !self.at(TokenKind::CloseParen) {
            exprs.push(self.parse_expr(0)?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;
        if exprs.is_empty() {
            return Err(self.syntax_error(EXPR_START));
        }
        Ok(self.arena.alloc_slice_copy(&exprs))
    }

    fn parse_nud(&mut self) -> PResult<ExprId<'ast>> {
        if self.at(TokenKind::Attribute) {
            self.skip_attributes()?;
        }

        let token = self.current_token;
        let start = token.span.start;
        match token.kind {
            TokenKind::Variable | TokenKind::Dollar => self.parse_simple_variable(),
            TokenKind::LNumber => {
                self.bump();
                let value = self.arena.alloc_slice_copy(self.lexer.slice(token.span));
                Ok(self.expr(Expr::Integer { value, span: token.span }))
            }
            TokenKind::DNumber => {
                self.bump();
                let value = self.arena.alloc_slice_copy(self.lexer.slice(token.span));
                Ok(self.expr(Expr::Float { value, span: token.span }))
            }
            TokenKind::StringLiteral => {
                self.bump();
                let value = self.arena.alloc_slice_copy(self.lexer.slice(token.span));
                Ok(self.expr(Expr::String { value, span: token.span }))
            }
            TokenKind::DoubleQuote => self.parse_interpolated_string(TokenKind::DoubleQuote),
            TokenKind::Backtick => self.parse_interpolated_string(TokenKind::Backtick),
            TokenKind::StartHeredoc => self.parse_interpolated_string(TokenKind::EndHeredoc),
            TokenKind::Identifier | TokenKind::NsSeparator | TokenKind::Namespace => {
                let name = self.parse_name()?;
                Ok(self.expr(Expr::Name { name, span: name.span }))
            }
            TokenKind::Static => match self.next_token.kind {
                TokenKind::Function => {
                    self.bump();
                    self.parse_closure_expr(true, start)
                }
                TokenKind::Fn => {
                    self.bump();
                    self.parse_arrow_function(true, start)
                }
                _ => {
                    self.bump();
                    let name = crate::ast::Name { parts: self.arena.alloc_slice_copy(&[token]), span: token.span };
                    Ok(self.expr(Expr::Name { name, span: token.span }))
                }
            },
            TokenKind::Function => self.parse_closure_expr(false, start),
            TokenKind::Fn => self.parse_arrow_function(false, start),
            TokenKind::Array => {
                self.bump();
                self.expect(TokenKind::OpenParen)?;
                let items = self.parse_array_items(TokenKind::CloseParen)?;
                Ok(self.expr(Expr::Array { items, span: Span::new(start, self.last_end()) }))
            }
            TokenKind::OpenBracket => {
                self.bump();
                let items = self.parse_array_items(TokenKind::CloseBracket)?;
                Ok(self.expr(Expr::Array { items, span: Span::new(start, self.last_end()) }))
            }
            TokenKind::List => {
                self.bump();
                self.expect(TokenKind::OpenParen)?;
                let items = self.parse_array_items(TokenKind::CloseParen)?;
                Ok(self.expr(Expr::List { items, span: Span::new(start, self.last_end()) }))
            }
            TokenKind::OpenParen => {
                self.bump();
                let expr = self.parse_expr(0)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expr)
            }
            TokenKind::IntCast
            | TokenKind::FloatCast
            | TokenKind::StringCast
            | TokenKind::ArrayCast
            | TokenKind::ObjectCast
            | TokenKind::BoolCast
            | TokenKind::UnsetCast => {
                let kind = match token.kind {
                    TokenKind::IntCast => CastKind::Int,
                    TokenKind::FloatCast => CastKind::Float,
                    TokenKind::StringCast => CastKind::String,
                    TokenKind::ArrayCast => CastKind::Array,
                    TokenKind::ObjectCast => CastKind::Object,
                    TokenKind::BoolCast => CastKind::Bool,
                    _ => CastKind::Unset,
                };
                self.bump();
                let expr = self.parse_expr(UNARY_BP)?;
                Ok(self.expr(Expr::Cast { kind, expr, span: Span::new(start, expr.span().end) }))
            }
            TokenKind::Minus => self.parse_unary(UnaryOp::Minus, UNARY_BP),
            TokenKind::Plus => self.parse_unary(UnaryOp::Plus, UNARY_BP),
            TokenKind::BitNot => self.parse_unary(UnaryOp::BitNot, UNARY_BP),
            // `!` sits between instanceof and the arithmetic operators
            TokenKind::Bang => self.parse_unary(UnaryOp::Not, 160),
            TokenKind::AmpersandFollowedByVarOrVararg | TokenKind::AmpersandNotFollowedByVarOrVararg => {
                self.parse_unary(UnaryOp::Reference, UNARY_BP)
            }
            TokenKind::Inc | TokenKind::Dec => {
                self.bump();
                let var = self.parse_expr(UNARY_BP)?;
                let span = Span::new(start, var.span().end);
                Ok(if token.kind == TokenKind::Inc {
                    self.expr(Expr::PreInc { var, span })
                } else {
                    self.expr(Expr::PreDec { var, span })
                })
            }
            TokenKind::At => {
                self.bump();
                let expr = self.parse_expr(UNARY_BP)?;
                Ok(self.expr(Expr::Silence { expr, span: Span::new(start, expr.span().end) }))
            }
            TokenKind::New => self.parse_new(),
            TokenKind::Clone => {
                self.bump();
                let expr = self.parse_expr(200)?;
                Ok(self.expr(Expr::Clone { expr, span: Span::new(start, expr.span().end) }))
            }
            TokenKind::Match => self.parse_match(),
            TokenKind::Isset => {
                self.bump();
                let vars = self.parse_paren_list()?;
                Ok(self.expr(Expr::Isset { vars, span: Span::new(start, self.last_end()) }))
            }
            TokenKind::Empty => {
                self.bump();
                self.expect(TokenKind::OpenParen)?;
                let expr = self.parse_expr(0)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(self.expr(Expr::Empty { expr, span: Span::new(start, self.last_end()) }))
            }
            TokenKind::Eval => {
                self.bump();
                self.expect(TokenKind::OpenParen)?;
                let expr = self.parse_expr(0)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(self.expr(Expr::Eval { expr, span: Span::new(start, self.last_end()) }))
            }
            TokenKind::Include | TokenKind::IncludeOnce | TokenKind::Require | TokenKind::RequireOnce => {
                let kind = match token.kind {
                    TokenKind::Include => IncludeKind::Include,
                    TokenKind::IncludeOnce => IncludeKind::IncludeOnce,
                    TokenKind::Require => IncludeKind::Require,
                    _ => IncludeKind::RequireOnce,
                };
                self.bump();
                let expr = self.parse_expr(LOW_PREFIX_BP)?;
                Ok(self.expr(Expr::Include { kind, expr, span: Span::new(start, expr.span().end) }))
            }
            TokenKind::Exit => {
                self.bump();
                let mut expr = None;
                if self.eat(TokenKind::OpenParen) {
                    if !self.at(TokenKind::CloseParen) {
                        expr = Some(self.parse_expr(0)?);
                    }
                    self.expect(TokenKind::CloseParen)?;
                }
                Ok(self.expr(Expr::Exit { expr, span: Span::new(start, self.last_end()) }))
            }
            TokenKind::Print => {
                self.bump();
                let expr = self.parse_expr(LOW_PREFIX_BP)?;
                Ok(self.expr(Expr::Print { expr, span: Span::new(start, expr.span().end) }))
            }
            TokenKind::Yield => self.parse_yield(),
            TokenKind::YieldFrom => {
                self.bump();
                let expr = self.parse_expr(LOW_PREFIX_BP)?;
                Ok(self.expr(Expr::YieldFrom { expr, span: Span::new(start, expr.span().end) }))
            }
            TokenKind::Throw => {
                self.bump();
                let expr = self.parse_expr(0)?;
                Ok(self.expr(Expr::Throw { expr, span: Span::new(start, expr.span().end) }))
            }
            TokenKind::Line
            | TokenKind::File
            | TokenKind::Dir
            | TokenKind::ClassC
            | TokenKind::TraitC
            | TokenKind::MethodC
            | TokenKind::FuncC
            | TokenKind::NsC
            | TokenKind::PropertyC => {
                let kind = match token.kind {
                    TokenKind::Line => MagicConstKind::Line,
                    TokenKind::File => MagicConstKind::File,
                    TokenKind::Dir => MagicConstKind::Dir,
                    TokenKind::ClassC => MagicConstKind::Class,
                    TokenKind::TraitC => MagicConstKind::Trait,
                    TokenKind::MethodC => MagicConstKind::Method,
                    TokenKind::FuncC => MagicConstKind::Function,
                    TokenKind::NsC => MagicConstKind::Namespace,
                    _ => MagicConstKind::Property,
                };
                self.bump();
                Ok(self.expr(Expr::MagicConst { kind, span: token.span }))
            }
            _ => Err(self.syntax_error(EXPR_START)),
        }
    }

    fn parse_yield(&mut self) -> PResult<ExprId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();

        let bare = matches!(
            self.current_token.kind,
            TokenKind::SemiColon
                | TokenKind::CloseParen
                | TokenKind::CloseBracket
                | TokenKind::Comma
                | TokenKind::CloseTag
        );
        if bare {
            return Ok(self.expr(Expr::Yield { key: None, value: None, span: Span::new(start, self.last_end()) }));
        }

        let first = self.parse_expr(LOW_PREFIX_BP)?;
        let (key, value) = if self.eat(TokenKind::DoubleArrow) {
            (Some(first), self.parse_expr(LOW_PREFIX_BP)?)
        } else {
            (None, first)
        };
        Ok(self.expr(Expr::Yield { key, value: Some(value), span: Span::new(start, value.span().end) }))
    }

    fn parse_new(&mut self) -> PResult<ExprId<'ast>> {
        let start = self.current_token.span.start;
        self.bump(); // Eat new

        if self.at(TokenKind::Class) {
            return self.parse_anonymous_class(start);
        }

        let token = self.current_token;
        let class = match token.kind {
            TokenKind::Identifier | TokenKind::NsSeparator | TokenKind::Namespace => {
                let name = self.parse_name()?;
                self.expr(Expr::Name { name, span: name.span })
            }
            TokenKind::Static => {
                self.bump();
                let name = crate::ast::Name { parts: self.arena.alloc_slice_copy(&[token]), span: token.span };
                self.expr(Expr::Name { name, span: token.span })
            }
            TokenKind::Variable | TokenKind::Dollar => {
                let mut class = self.parse_simple_variable()?;
                // new $this->factory[0]()
                loop {
                    match self.current_token.kind {
                        TokenKind::Arrow | TokenKind::NullSafeArrow => {
                            let nullsafe = self.at(TokenKind::NullSafeArrow);
                            self.bump();
                            let property = self.parse_member_name()?;
                            let span = Span::new(class.span().start, property.span().end);
                            class = self.expr(Expr::PropertyFetch { target: class, property, nullsafe, span });
                        }
                        TokenKind::DoubleColon => {
                            self.bump();
                            let property = self.parse_simple_variable()?;
                            let span = Span::new(class.span().start, property.span().end);
                            class = self.expr(Expr::StaticPropertyFetch { class, property, span });
                        }
                        TokenKind::OpenBracket => {
                            self.bump();
                            let dim = self.parse_expr(0)?;
                            self.expect(TokenKind::CloseBracket)?;
                            let span = Span::new(class.span().start, self.last_end());
                            class = self.expr(Expr::ArrayDimFetch { array: class, dim: Some(dim), span });
                        }
                        _ => break,
                    }
                }
                class
            }
            TokenKind::OpenParen => {
                self.bump();
                let expr = self.parse_expr(0)?;
                self.expect(TokenKind::CloseParen)?;
                expr
            }
            _ => return Err(self.syntax_error(&[TokenKind::Identifier, TokenKind::Variable, TokenKind::Class])),
        };

        let args: &'ast [Arg<'ast>] = if self.at(TokenKind::OpenParen) { self.parse_call_arguments()?.0 } else { &[] };

        Ok(self.expr(Expr::New { class, args, span: Span::new(start, self.last_end()) }))
    }

    fn parse_anonymous_class(&mut self, start: usize) -> PResult<ExprId<'ast>> {
        self.bump(); // Eat class
        let args: &'ast [Arg<'ast>] = if self.at(TokenKind::OpenParen) { self.parse_call_arguments()?.0 } else { &[] };

        let extends = if self.eat(TokenKind::Extends) { Some(self.parse_name()?) } else { None };
        let mut implements = std::vec::Vec::new();
        if self.eat(TokenKind::Implements) {
            implements.push(self.parse_name()?);
            while self.eat(TokenKind::Comma) {
                implements.push(self.parse_name()?);
            }
        }
        let members = self.parse_class_body()?;

        Ok(self.expr(Expr::AnonymousClass {
            args,
            extends,
            implements: self.arena.alloc_slice_copy(&implements),
            members,
            span: Span::new(start, self.last_end()),
        }))
    }

    fn parse_match(&mut self) -> PResult<ExprId<'ast>> {
        let start = self.current_token.span.start;
        self.bump();
        self.expect(TokenKind::OpenParen)?;
        let condition = self.parse_expr(0)?;
        self.expect(TokenKind::CloseParen)?;
        self.expect(TokenKind::OpenBrace)?;

        let mut arms = std::vec::Vec::new();
        while !self.at(TokenKind::CloseBrace) {
            let arm_start = self.current_token.span.start;
            let conditions = if self.at(TokenKind::Default) {
                self.bump();
                self.eat(TokenKind::Comma);
                None
            } else {
                let mut conditions = std::vec::Vec::new();
                loop {
                    conditions.push(self.parse_expr(0)?);
                    if !self.eat(TokenKind::Comma) || self.at(TokenKind::DoubleArrow) {
                        break;
                    }
                }
                Some(&*self.arena.alloc_slice_copy(&conditions))
            };
            self.expect(TokenKind::DoubleArrow)?;
            let body = self.parse_expr(0)?;
            arms.push(MatchArm { conditions, body, span: Span::new(arm_start, body.span().end) });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseBrace)?;

        Ok(self.expr(Expr::Match {
            condition,
            arms: self.arena.alloc_slice_copy(&arms),
            span: Span::new(start, self.last_end()),
        }))
    }

    /// Items up to and including `close`. Empty slots are allowed for
    /// `list()` and `[]` destructuring.
    fn parse_array_items(&mut self, close: TokenKind) -> PResult<&'ast [ArrayItem<'ast>]> {
        let mut items = std::vec::Vec::new();
        while !self.at(close) {
            if self.at(TokenKind::Comma) {
                let span = Span::empty_at(self.current_token.span.start);
                self.bump();
                items.push(ArrayItem { key: None, value: None, by_ref: false, unpack: false, span });
                continue;
            }
            items.push(self.parse_array_item()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(self.arena.alloc_slice_copy(&items))
    }

    fn parse_array_item(&mut self) -> PResult<ArrayItem<'ast>> {
        let start = self.current_token.span.start;
        let unpack = self.eat(TokenKind::Ellipsis);
        let by_ref = self.eat_ampersand();
        let first = self.parse_expr(0)?;

        if !by_ref && !unpack && self.eat(TokenKind::DoubleArrow) {
            let value_by_ref = self.eat_ampersand();
            let value = self.parse_expr(0)?;
            return Ok(ArrayItem {
                key: Some(first),
                value: Some(value),
                by_ref: value_by_ref,
                unpack: false,
                span: Span::new(start, value.span().end),
            });
        }

        Ok(ArrayItem { key: None, value: Some(first), by_ref, unpack, span: Span::new(start, first.span().end) })
    }

    fn parse_interpolated_string(&mut self, end_token: TokenKind) -> PResult<ExprId<'ast>> {
        let start = self.current_token.span.start;
        let is_shell = self.at(TokenKind::Backtick);
        self.bump(); // Eat opening token

        let mut parts: std::vec::Vec<ExprId<'ast>> = std::vec::Vec::new();
        while !self.at(end_token) {
            let token = self.current_token;
            match token.kind {
                TokenKind::EncapsedAndWhitespace => {
                    self.bump();
                    let value = self.arena.alloc_slice_copy(self.lexer.slice(token.span));
                    parts.push(self.expr(Expr::String { value, span: token.span }));
                }
                TokenKind::Variable => {
                    self.bump();
                    let var = self.expr(Expr::Variable { name: token.span, span: token.span });
                    if self.eat(TokenKind::OpenBracket) {
                        let key = self.parse_offset_key()?;
                        self.expect(TokenKind::CloseBracket)?;
                        let span = Span::new(token.span.start, self.last_end());
                        parts.push(self.expr(Expr::ArrayDimFetch { array: var, dim: Some(key), span }));
                    } else {
                        parts.push(var);
                    }
                }
                TokenKind::CurlyOpen | TokenKind::DollarOpenCurlyBraces => {
                    self.bump();
                    let expr = self.parse_expr(0)?;
                    self.expect(TokenKind::CloseBrace)?;
                    parts.push(expr);
                }
                _ => return Err(self.syntax_error(&[end_token])),
            }
        }
        self.bump(); // Eat closing token

        let parts = self.arena.alloc_slice_copy(&parts);
        let span = Span::new(start, self.last_end());
        Ok(if is_shell {
            self.expr(Expr::ShellExec { parts, span })
        } else {
            self.expr(Expr::InterpolatedString { parts, span })
        })
    }

    /// Key of `"$a[key]"`.
    fn parse_offset_key(&mut self) -> PResult<ExprId<'ast>> {
        let token = self.current_token;
        match token.kind {
            TokenKind::Identifier => {
                self.bump();
                let value = self.arena.alloc_slice_copy(self.lexer.slice(token.span));
                Ok(self.expr(Expr::String { value, span: token.span }))
            }
            TokenKind::NumString => {
                self.bump();
                let value = self.arena.alloc_slice_copy(self.lexer.slice(token.span));
                Ok(self.expr(Expr::Integer { value, span: token.span }))
            }
            TokenKind::Variable => {
                self.bump();
                Ok(self.expr(Expr::Variable { name: token.span, span: token.span }))
            }
            TokenKind::Minus => {
                self.bump();
                let number = self.expect(TokenKind::NumString)?;
                let span = Span::new(token.span.start, number.span.end);
                let value = self.arena.alloc_slice_copy(self.lexer.slice(span));
                Ok(self.expr(Expr::Integer { value, span }))
            }
            _ => Err(self.syntax_error(&[TokenKind::Identifier, TokenKind::NumString, TokenKind::Variable])),
        }
    }
}

fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::LogicalOr => (10, 11),
        BinaryOp::LogicalXor => (20, 21),
        BinaryOp::LogicalAnd => (30, 31),

        BinaryOp::Coalesce => (51, 50), // Right associative

        BinaryOp::Or => (60, 61),  // ||
        BinaryOp::And => (70, 71), // &&

        BinaryOp::BitOr => (80, 81),
        BinaryOp::BitXor => (90, 91),
        BinaryOp::BitAnd => (100, 101),

        BinaryOp::EqEq | BinaryOp::NotEq | BinaryOp::EqEqEq | BinaryOp::NotEqEq | BinaryOp::Spaceship => (110, 111),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => (120, 121),

        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => (130, 131),

        BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Concat => (140, 141),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (150, 151),

        BinaryOp::Instanceof => (170, 171),

        BinaryOp::Pow => (191, 190), // Right associative
    }
}
