//! Human-readable token tables used when rendering diagnostics.

use super::token::TokenKind;

impl TokenKind {
    /// Surface text of the token, or a short description for tokens whose
    /// text varies (identifiers, literals, variables...).
    pub fn text(self) -> &'static str {
        match self {
            TokenKind::Function => "function",
            TokenKind::Fn => "fn",
            TokenKind::Class => "class",
            TokenKind::Interface => "interface",
            TokenKind::Trait => "trait",
            TokenKind::Enum => "enum",
            TokenKind::Extends => "extends",
            TokenKind::Implements => "implements",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::ElseIf => "elseif",
            TokenKind::EndIf => "endif",
            TokenKind::Return => "return",
            TokenKind::Echo => "echo",
            TokenKind::Print => "print",
            TokenKind::While => "while",
            TokenKind::EndWhile => "endwhile",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::EndFor => "endfor",
            TokenKind::Foreach => "foreach",
            TokenKind::EndForeach => "endforeach",
            TokenKind::As => "as",
            TokenKind::Switch => "switch",
            TokenKind::EndSwitch => "endswitch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Goto => "goto",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Finally => "finally",
            TokenKind::Throw => "throw",
            TokenKind::Public => "public",
            TokenKind::Protected => "protected",
            TokenKind::Private => "private",
            TokenKind::Var => "var",
            TokenKind::Static => "static",
            TokenKind::Abstract => "abstract",
            TokenKind::Final => "final",
            TokenKind::Readonly => "readonly",
            TokenKind::Namespace => "namespace",
            TokenKind::Use => "use",
            TokenKind::Insteadof => "insteadof",
            TokenKind::Global => "global",
            TokenKind::New => "new",
            TokenKind::Clone => "clone",
            TokenKind::InstanceOf => "instanceof",
            TokenKind::Array => "array",
            TokenKind::List => "list",
            TokenKind::Const => "const",
            TokenKind::Include => "include",
            TokenKind::IncludeOnce => "include_once",
            TokenKind::Require => "require",
            TokenKind::RequireOnce => "require_once",
            TokenKind::Eval => "eval",
            TokenKind::Exit => "exit",
            TokenKind::Empty => "empty",
            TokenKind::Isset => "isset",
            TokenKind::Unset => "unset",
            TokenKind::Yield => "yield",
            TokenKind::YieldFrom => "yield from",
            TokenKind::Declare => "declare",
            TokenKind::EndDeclare => "enddeclare",
            TokenKind::Match => "match",
            TokenKind::HaltCompiler => "__halt_compiler",
            TokenKind::Attribute => "#[",
            TokenKind::LogicalAnd => "and",
            TokenKind::LogicalOr => "or",
            TokenKind::LogicalXor => "xor",

            TokenKind::Line => "__LINE__",
            TokenKind::File => "__FILE__",
            TokenKind::Dir => "__DIR__",
            TokenKind::ClassC => "__CLASS__",
            TokenKind::TraitC => "__TRAIT__",
            TokenKind::MethodC => "__METHOD__",
            TokenKind::FuncC => "__FUNCTION__",
            TokenKind::NsC => "__NAMESPACE__",
            TokenKind::PropertyC => "__PROPERTY__",

            TokenKind::IntCast => "(int)",
            TokenKind::FloatCast => "(float)",
            TokenKind::StringCast => "(string)",
            TokenKind::ArrayCast => "(array)",
            TokenKind::ObjectCast => "(object)",
            TokenKind::BoolCast => "(bool)",
            TokenKind::UnsetCast => "(unset)",

            TokenKind::Identifier => "identifier",
            TokenKind::LNumber => "integer number",
            TokenKind::DNumber => "floating-point number",
            TokenKind::StringLiteral => "string",
            TokenKind::NumString => "number",
            TokenKind::Variable => "variable",
            TokenKind::InlineHtml => "inline html",
            TokenKind::EncapsedAndWhitespace => "string content",
            TokenKind::DollarOpenCurlyBraces => "${",
            TokenKind::CurlyOpen => "{$",
            TokenKind::Backtick => "`",
            TokenKind::DoubleQuote => "\"",
            TokenKind::StartHeredoc => "<<<",
            TokenKind::EndHeredoc => "heredoc end",
            TokenKind::Dollar => "$",
            TokenKind::NsSeparator => "\\",

            TokenKind::Comment => "comment",
            TokenKind::DocComment => "doc comment",

            TokenKind::Arrow => "->",
            TokenKind::NullSafeArrow => "?->",
            TokenKind::DoubleArrow => "=>",
            TokenKind::DoubleColon => "::",
            TokenKind::Ellipsis => "...",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Asterisk => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Dot => ".",
            TokenKind::Pow => "**",
            TokenKind::Inc => "++",
            TokenKind::Dec => "--",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::MulEq => "*=",
            TokenKind::DivEq => "/=",
            TokenKind::ModEq => "%=",
            TokenKind::ConcatEq => ".=",
            TokenKind::PowEq => "**=",
            TokenKind::AndEq => "&=",
            TokenKind::OrEq => "|=",
            TokenKind::XorEq => "^=",
            TokenKind::SlEq => "<<=",
            TokenKind::SrEq => ">>=",
            TokenKind::CoalesceEq => "??=",
            TokenKind::EqEq => "==",
            TokenKind::EqEqEq => "===",
            TokenKind::Bang => "!",
            TokenKind::BangEq => "!=",
            TokenKind::BangEqEq => "!==",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Spaceship => "<=>",
            TokenKind::AmpersandFollowedByVarOrVararg
            | TokenKind::AmpersandNotFollowedByVarOrVararg => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::BitNot => "~",
            TokenKind::Sl => "<<",
            TokenKind::Sr => ">>",
            TokenKind::AmpersandAmpersand => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Question => "?",
            TokenKind::Coalesce => "??",
            TokenKind::At => "@",
            TokenKind::SemiColon => ";",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::OpenBrace => "{",
            TokenKind::CloseBrace => "}",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::OpenTag => "<?php",
            TokenKind::OpenTagEcho => "<?=",
            TokenKind::CloseTag => "?>",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "unrecognized input",
        }
    }

    /// Symbolic token name in the `T_*` style of the PHP tokenizer.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Function => "T_FUNCTION",
            TokenKind::Fn => "T_FN",
            TokenKind::Class => "T_CLASS",
            TokenKind::Interface => "T_INTERFACE",
            TokenKind::Trait => "T_TRAIT",
            TokenKind::Enum => "T_ENUM",
            TokenKind::Extends => "T_EXTENDS",
            TokenKind::Implements => "T_IMPLEMENTS",
            TokenKind::If => "T_IF",
            TokenKind::Else => "T_ELSE",
            TokenKind::ElseIf => "T_ELSEIF",
            TokenKind::EndIf => "T_ENDIF",
            TokenKind::Return => "T_RETURN",
            TokenKind::Echo => "T_ECHO",
            TokenKind::Print => "T_PRINT",
            TokenKind::While => "T_WHILE",
            TokenKind::EndWhile => "T_ENDWHILE",
            TokenKind::Do => "T_DO",
            TokenKind::For => "T_FOR",
            TokenKind::EndFor => "T_ENDFOR",
            TokenKind::Foreach => "T_FOREACH",
            TokenKind::EndForeach => "T_ENDFOREACH",
            TokenKind::As => "T_AS",
            TokenKind::Switch => "T_SWITCH",
            TokenKind::EndSwitch => "T_ENDSWITCH",
            TokenKind::Case => "T_CASE",
            TokenKind::Default => "T_DEFAULT",
            TokenKind::Break => "T_BREAK",
            TokenKind::Continue => "T_CONTINUE",
            TokenKind::Goto => "T_GOTO",
            TokenKind::Try => "T_TRY",
            TokenKind::Catch => "T_CATCH",
            TokenKind::Finally => "T_FINALLY",
            TokenKind::Throw => "T_THROW",
            TokenKind::Public => "T_PUBLIC",
            TokenKind::Protected => "T_PROTECTED",
            TokenKind::Private => "T_PRIVATE",
            TokenKind::Var => "T_VAR",
            TokenKind::Static => "T_STATIC",
            TokenKind::Abstract => "T_ABSTRACT",
            TokenKind::Final => "T_FINAL",
            TokenKind::Readonly => "T_READONLY",
            TokenKind::Namespace => "T_NAMESPACE",
            TokenKind::Use => "T_USE",
            TokenKind::Insteadof => "T_INSTEADOF",
            TokenKind::Global => "T_GLOBAL",
            TokenKind::New => "T_NEW",
            TokenKind::Clone => "T_CLONE",
            TokenKind::InstanceOf => "T_INSTANCEOF",
            TokenKind::Array => "T_ARRAY",
            TokenKind::List => "T_LIST",
            TokenKind::Const => "T_CONST",
            TokenKind::Include => "T_INCLUDE",
            TokenKind::IncludeOnce => "T_INCLUDE_ONCE",
            TokenKind::Require => "T_REQUIRE",
            TokenKind::RequireOnce => "T_REQUIRE_ONCE",
            TokenKind::Eval => "T_EVAL",
            TokenKind::Exit => "T_EXIT",
            TokenKind::Empty => "T_EMPTY",
            TokenKind::Isset => "T_ISSET",
            TokenKind::Unset => "T_UNSET",
            TokenKind::Yield => "T_YIELD",
            TokenKind::YieldFrom => "T_YIELD_FROM",
            TokenKind::Declare => "T_DECLARE",
            TokenKind::EndDeclare => "T_ENDDECLARE",
            TokenKind::Match => "T_MATCH",
            TokenKind::HaltCompiler => "T_HALT_COMPILER",
            TokenKind::Attribute => "T_ATTRIBUTE",
            TokenKind::LogicalAnd => "T_LOGICAL_AND",
            TokenKind::LogicalOr => "T_LOGICAL_OR",
            TokenKind::LogicalXor => "T_LOGICAL_XOR",
            TokenKind::Line => "T_LINE",
            TokenKind::File => "T_FILE",
            TokenKind::Dir => "T_DIR",
            TokenKind::ClassC => "T_CLASS_C",
            TokenKind::TraitC => "T_TRAIT_C",
            TokenKind::MethodC => "T_METHOD_C",
            TokenKind::FuncC => "T_FUNC_C",
            TokenKind::NsC => "T_NS_C",
            TokenKind::PropertyC => "T_PROPERTY_C",
            TokenKind::IntCast => "T_INT_CAST",
            TokenKind::FloatCast => "T_DOUBLE_CAST",
            TokenKind::StringCast => "T_STRING_CAST",
            TokenKind::ArrayCast => "T_ARRAY_CAST",
            TokenKind::ObjectCast => "T_OBJECT_CAST",
            TokenKind::BoolCast => "T_BOOL_CAST",
            TokenKind::UnsetCast => "T_UNSET_CAST",
            TokenKind::Identifier => "T_STRING",
            TokenKind::LNumber => "T_LNUMBER",
            TokenKind::DNumber => "T_DNUMBER",
            TokenKind::StringLiteral => "T_CONSTANT_ENCAPSED_STRING",
            TokenKind::NumString => "T_NUM_STRING",
            TokenKind::Variable => "T_VARIABLE",
            TokenKind::InlineHtml => "T_INLINE_HTML",
            TokenKind::EncapsedAndWhitespace => "T_ENCAPSED_AND_WHITESPACE",
            TokenKind::DollarOpenCurlyBraces => "T_DOLLAR_OPEN_CURLY_BRACES",
            TokenKind::CurlyOpen => "T_CURLY_OPEN",
            TokenKind::Backtick => "T_BACKQUOTE",
            TokenKind::DoubleQuote => "T_QUATE",
            TokenKind::StartHeredoc => "T_START_HEREDOC",
            TokenKind::EndHeredoc => "T_END_HEREDOC",
            TokenKind::Dollar => "T_DOLLAR",
            TokenKind::NsSeparator => "T_NS_SEPARATOR",
            TokenKind::Comment => "T_COMMENT",
            TokenKind::DocComment => "T_DOC_COMMENT",
            TokenKind::Arrow => "T_OBJECT_OPERATOR",
            TokenKind::NullSafeArrow => "T_NULLSAFE_OBJECT_OPERATOR",
            TokenKind::DoubleArrow => "T_DOUBLE_ARROW",
            TokenKind::DoubleColon => "T_PAAMAYIM_NEKUDOTAYIM",
            TokenKind::Ellipsis => "T_ELLIPSIS",
            TokenKind::Plus => "T_PLUS",
            TokenKind::Minus => "T_MINUS",
            TokenKind::Asterisk => "T_TIMES",
            TokenKind::Slash => "T_DIV",
            TokenKind::Percent => "T_MOD",
            TokenKind::Dot => "T_NEKUDA",
            TokenKind::Pow => "T_POW",
            TokenKind::Inc => "T_INC",
            TokenKind::Dec => "T_DEC",
            TokenKind::Eq => "T_EQUAL",
            TokenKind::PlusEq => "T_PLUS_EQUAL",
            TokenKind::MinusEq => "T_MINUS_EQUAL",
            TokenKind::MulEq => "T_MUL_EQUAL",
            TokenKind::DivEq => "T_DIV_EQUAL",
            TokenKind::ModEq => "T_MOD_EQUAL",
            TokenKind::ConcatEq => "T_CONCAT_EQUAL",
            TokenKind::PowEq => "T_POW_EQUAL",
            TokenKind::AndEq => "T_AND_EQUAL",
            TokenKind::OrEq => "T_OR_EQUAL",
            TokenKind::XorEq => "T_XOR_EQUAL",
            TokenKind::SlEq => "T_SL_EQUAL",
            TokenKind::SrEq => "T_SR_EQUAL",
            TokenKind::CoalesceEq => "T_COALESCE_EQUAL",
            TokenKind::EqEq => "T_IS_EQUAL",
            TokenKind::EqEqEq => "T_IS_IDENTICAL",
            TokenKind::Bang => "T_NOT",
            TokenKind::BangEq => "T_IS_NOT_EQUAL",
            TokenKind::BangEqEq => "T_IS_NOT_IDENTICAL",
            TokenKind::Lt => "T_RGREATER",
            TokenKind::LtEq => "T_IS_SMALLER_OR_EQUAL",
            TokenKind::Gt => "T_LGREATER",
            TokenKind::GtEq => "T_IS_GREATER_OR_EQUAL",
            TokenKind::Spaceship => "T_SPACESHIP",
            TokenKind::AmpersandFollowedByVarOrVararg => "T_AMPERSAND_FOLLOWED_BY_VAR_OR_VARARG",
            TokenKind::AmpersandNotFollowedByVarOrVararg => {
                "T_AMPERSAND_NOT_FOLLOWED_BY_VAR_OR_VARARG"
            }
            TokenKind::Pipe => "T_OR",
            TokenKind::Caret => "T_KOVA",
            TokenKind::BitNot => "T_TILDA",
            TokenKind::Sl => "T_SL",
            TokenKind::Sr => "T_SR",
            TokenKind::AmpersandAmpersand => "T_BOOLEAN_AND",
            TokenKind::PipePipe => "T_BOOLEAN_OR",
            TokenKind::Question => "T_QUESTION_MARK",
            TokenKind::Coalesce => "T_COALESCE",
            TokenKind::At => "T_AT",
            TokenKind::SemiColon => "T_SEMICOLON",
            TokenKind::Colon => "T_NEKUDOTAIM",
            TokenKind::Comma => "T_COMMA",
            TokenKind::OpenBrace => "T_CURLY_OPEN",
            TokenKind::CloseBrace => "T_CURLY_CLOSE",
            TokenKind::OpenParen => "T_OPEN_PARENTHESE",
            TokenKind::CloseParen => "T_CLOSE_PARENTHESE",
            TokenKind::OpenBracket => "T_OPEN_RECT",
            TokenKind::CloseBracket => "T_CLOSE_RECT",
            TokenKind::OpenTag => "T_OPEN_TAG",
            TokenKind::OpenTagEcho => "T_OPEN_TAG_WITH_ECHO",
            TokenKind::CloseTag => "T_CLOSE_TAG",
            TokenKind::Eof => "EOF",
            TokenKind::Error => "error",
        }
    }
}

/// Joins expected tokens for a diagnostic message: `'a', 'b', 'c'`.
pub fn join_expected(expected: &[TokenKind]) -> String {
    let mut out = String::new();
    for (i, kind) in expected.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('\'');
        out.push_str(kind.text());
        out.push('\'');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn renders_fixed_and_variable_tokens() {
        assert_eq!(TokenKind::Arrow.text(), "->");
        assert_eq!(TokenKind::Function.text(), "function");
        assert_eq!(TokenKind::Variable.text(), "variable");
        assert_eq!(TokenKind::CloseBrace.name(), "T_CURLY_CLOSE");
    }

    #[test]
    fn joins_expected_tokens() {
        let joined = join_expected(&[TokenKind::SemiColon, TokenKind::Comma, TokenKind::CloseParen]);
        assert_snapshot!(joined, @"';', ',', ')'");
    }
}
