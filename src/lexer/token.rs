use serde::Serialize;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Placeholder used where no token has been seen yet.
    pub fn none() -> Self {
        Self { kind: TokenKind::Eof, span: Span::default() }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, Serialize)]
pub enum TokenKind {
    // Keywords
    Function, Fn, Class, Interface, Trait, Enum, Extends, Implements,
    If, Else, ElseIf, EndIf, Return, Echo, Print,
    While, EndWhile, Do, For, EndFor, Foreach, EndForeach, As,
    Switch, EndSwitch, Case, Default, Break, Continue, Goto,
    Try, Catch, Finally, Throw,
    Public, Protected, Private, Var, Static, Abstract, Final, Readonly,
    Namespace, Use, Insteadof, Global,
    New, Clone, InstanceOf,
    Array, List, Const,
    Include, IncludeOnce, Require, RequireOnce, Eval, Exit,
    Empty, Isset, Unset,
    Yield, YieldFrom,
    Declare, EndDeclare, Match,
    HaltCompiler, // __halt_compiler
    Attribute, // #[
    LogicalAnd, LogicalOr, LogicalXor,

    // Magic Constants
    Line, File, Dir, ClassC, TraitC, MethodC, FuncC, NsC, PropertyC,

    // Casts
    IntCast, FloatCast, StringCast, ArrayCast, ObjectCast, BoolCast, UnsetCast,

    // Identifiers & Literals
    Identifier,
    LNumber,
    DNumber,
    StringLiteral,
    NumString, // For array offset in string
    Variable,
    InlineHtml,
    EncapsedAndWhitespace,
    DollarOpenCurlyBraces, // ${
    CurlyOpen, // {$
    Backtick, // `
    DoubleQuote, // "
    StartHeredoc, // <<<
    EndHeredoc, // The closing identifier
    Dollar, // $ (for variable variables like $$a)
    NsSeparator, // \

    // Comments
    Comment,
    DocComment,

    // Symbols
    Arrow, // ->
    NullSafeArrow, // ?->
    DoubleArrow, // =>
    DoubleColon, // ::
    Ellipsis, // ...

    Plus, Minus, Asterisk, Slash, Percent, Dot,
    Pow, // **
    Inc, Dec, // ++, --

    Eq, // =
    PlusEq, MinusEq, MulEq, DivEq, ModEq, ConcatEq, PowEq,
    AndEq, OrEq, XorEq, SlEq, SrEq, CoalesceEq,

    EqEq, // ==
    EqEqEq, // ===
    Bang, // !
    BangEq, // != and <>
    BangEqEq, // !==
    Lt, // <
    LtEq, // <=
    Gt, // >
    GtEq, // >=
    Spaceship, // <=>

    AmpersandFollowedByVarOrVararg,
    AmpersandNotFollowedByVarOrVararg,
    Pipe, // |
    Caret, // ^
    BitNot, // ~
    Sl, // <<
    Sr, // >>

    AmpersandAmpersand, // &&
    PipePipe, // ||
    Question, // ?
    Coalesce, // ??
    At, // @

    SemiColon,
    Colon,
    Comma,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,

    OpenTag, // <?php, <? and <%
    OpenTagEcho, // <?= and <%=
    CloseTag, // ?> and %>

    Eof,

    // Error token for lexing failures
    Error,
}

impl TokenKind {
    pub fn is_ampersand(self) -> bool {
        matches!(
            self,
            TokenKind::AmpersandFollowedByVarOrVararg | TokenKind::AmpersandNotFollowedByVarOrVararg
        )
    }

    /// Keywords that may still be used as member names (`$a->list`, `Foo::class`,
    /// `public function print()`).
    pub fn is_semi_reserved(self) -> bool {
        matches!(
            self,
            TokenKind::Function | TokenKind::Fn | TokenKind::Class | TokenKind::Interface
                | TokenKind::Trait | TokenKind::Enum | TokenKind::Extends | TokenKind::Implements
                | TokenKind::If | TokenKind::Else | TokenKind::ElseIf | TokenKind::EndIf
                | TokenKind::Return | TokenKind::Echo | TokenKind::Print | TokenKind::While
                | TokenKind::EndWhile | TokenKind::Do | TokenKind::For | TokenKind::EndFor
                | TokenKind::Foreach | TokenKind::EndForeach | TokenKind::As | TokenKind::Switch
                | TokenKind::EndSwitch | TokenKind::Case | TokenKind::Default | TokenKind::Break
                | TokenKind::Continue | TokenKind::Goto | TokenKind::Try | TokenKind::Catch
                | TokenKind::Finally | TokenKind::Throw | TokenKind::Public | TokenKind::Protected
                | TokenKind::Private | TokenKind::Var | TokenKind::Static | TokenKind::Abstract
                | TokenKind::Final | TokenKind::Readonly | TokenKind::Namespace | TokenKind::Use
                | TokenKind::Insteadof | TokenKind::Global | TokenKind::New | TokenKind::Clone
                | TokenKind::InstanceOf | TokenKind::Array | TokenKind::List | TokenKind::Const
                | TokenKind::Include | TokenKind::IncludeOnce | TokenKind::Require
                | TokenKind::RequireOnce | TokenKind::Eval | TokenKind::Exit | TokenKind::Empty
                | TokenKind::Isset | TokenKind::Unset | TokenKind::Yield | TokenKind::Declare
                | TokenKind::EndDeclare | TokenKind::Match | TokenKind::HaltCompiler
                | TokenKind::LogicalAnd | TokenKind::LogicalOr | TokenKind::LogicalXor
                | TokenKind::Line | TokenKind::File | TokenKind::Dir | TokenKind::ClassC
                | TokenKind::TraitC | TokenKind::MethodC | TokenKind::FuncC | TokenKind::NsC
                | TokenKind::PropertyC
        )
    }

    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::DocComment)
    }

    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            TokenKind::Public | TokenKind::Protected | TokenKind::Private | TokenKind::Var
                | TokenKind::Static | TokenKind::Abstract | TokenKind::Final | TokenKind::Readonly
        )
    }

    /// `require`, `require_once`, `include`, `include_once`.
    pub fn is_include(self) -> bool {
        matches!(
            self,
            TokenKind::Include | TokenKind::IncludeOnce | TokenKind::Require | TokenKind::RequireOnce
        )
    }

    /// Tokens that open a curly-brace scope: `{`, `{$` and `${`.
    pub fn opens_curly(self) -> bool {
        matches!(
            self,
            TokenKind::OpenBrace | TokenKind::CurlyOpen | TokenKind::DollarOpenCurlyBraces
        )
    }
}
