use std::sync::atomic::{AtomicBool, Ordering};

use crate::ast::{Program, Stmt, StmtId};
use crate::lexer::token::TokenKind;
use crate::lexer::{Lexer, LexerOptions};

/// A tree is rejected when an error statement swallowed a declaration:
/// re-lexing its text finds `class`, `function`, `use` or an include.
/// A raised `cancel` flag stops the scan and accepts the tree.
pub fn is_acceptable(program: &Program<'_>, source: &str, options: LexerOptions, cancel: Option<&AtomicBool>) -> bool {
    statements_ok(program.statements, source, options, cancel)
}

fn statements_ok(statements: &[StmtId<'_>], source: &str, options: LexerOptions, cancel: Option<&AtomicBool>) -> bool {
    for stmt in statements {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return true;
        }
        let ok = match stmt {
            Stmt::Namespace { body, .. } => statements_ok(body, source, options, cancel),
            Stmt::Error { span } => !declares_anything(span.text(source), options),
            _ => true,
        };
        if !ok {
            return false;
        }
    }
    true
}

fn declares_anything(text: &str, options: LexerOptions) -> bool {
    let wrapped = format!("<?php {text} ?>");
    Lexer::with_options(wrapped.as_bytes(), options).tokenize().iter().any(|token| {
        matches!(
            token.kind,
            TokenKind::Class
                | TokenKind::Function
                | TokenKind::Use
                | TokenKind::Require
                | TokenKind::RequireOnce
                | TokenKind::Include
                | TokenKind::IncludeOnce
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::ErrorHandler;
    use crate::parser::Parser;
    use bumpalo::Bump;

    fn check(source: &str, cancel: Option<&AtomicBool>) -> bool {
        let arena = Bump::new();
        let mut handler = ErrorHandler::new();
        let lexer = Lexer::new(source.as_bytes());
        let mut parser = Parser::new(lexer, &arena, &mut handler);
        let program = parser.parse_program().unwrap();
        is_acceptable(&program, source, LexerOptions::default(), cancel)
    }

    #[test]
    fn plain_error_statement_is_acceptable() {
        assert!(check("<?php $a = ; echo 1;", None));
    }

    #[test]
    fn swallowed_declaration_is_rejected() {
        assert!(!check("<?php $a = = function f() {};", None));
        assert!(!check("<?php namespace App; $a = = require 'x.php';", None));
    }

    #[test]
    fn cancellation_accepts_as_is() {
        let cancel = AtomicBool::new(true);
        assert!(check("<?php $a = = function f() {};", Some(&cancel)));
    }
}
