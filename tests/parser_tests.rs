use bumpalo::Bump;
use php_recovery_parser::ast::sexpr::SExprFormatter;
use php_recovery_parser::ast::{Expr, MagicConstKind, Program, Stmt};
use php_recovery_parser::error_handler::ErrorHandler;
use php_recovery_parser::lexer::Lexer;
use php_recovery_parser::lexer::token::TokenKind;
use php_recovery_parser::parser::Parser;

fn parse<'ast>(code: &str, arena: &'ast Bump, handler: &mut ErrorHandler) -> Option<Program<'ast>> {
    let lexer = Lexer::new(code.as_bytes());
    let mut parser = Parser::new(lexer, arena, handler);
    parser.parse_program()
}

fn sexpr(code: &str) -> String {
    let arena = Bump::new();
    let mut handler = ErrorHandler::new();
    let program = parse(code, &arena, &mut handler).expect("program");
    let mut formatter = SExprFormatter::new(code.as_bytes());
    formatter.format_program(&program);
    formatter.finish()
}

#[test]
fn test_sexpr_basic() {
    assert_eq!(sexpr("<?php echo 1 + 2;"), "(program\n  (nop)\n  (echo (+ 1 2)))");
}

#[test]
fn test_sexpr_precedence() {
    assert_eq!(sexpr("<?php echo 1 + 2 * 3;"), "(program\n  (nop)\n  (echo (+ 1 (* 2 3))))");
}

#[test]
fn test_sexpr_function() {
    assert_eq!(
        sexpr("<?php function f($n) { return $n; }"),
        "(program\n  (nop)\n  (function f (params $n)\n    (body\n      (return $n))))"
    );
}

#[test]
fn test_sexpr_control_flow() {
    assert_eq!(
        sexpr("<?php if ($a) { echo 1; } else { echo 2; } while ($b) { echo $a; }"),
        "(program\n  (nop)\n  (if $a\n    (then\n      (echo 1))\n    (else\n      (echo 2)))\n  (while $b\n    (body\n      (echo $a))))"
    );
}

#[test]
fn test_sexpr_error_statement() {
    let code = "<?php $a = ; echo 1;";
    let arena = Bump::new();
    let mut handler = ErrorHandler::new();
    let program = parse(code, &arena, &mut handler).expect("program");
    let mut formatter = SExprFormatter::new(code.as_bytes());
    formatter.format_program(&program);

    assert_eq!(formatter.finish(), "(program\n  (nop)\n  (error 6..12)\n  (echo 1))");
    assert_eq!(handler.syntax_errors().len(), 1);
}

#[test]
fn parses_list_destructuring_with_by_ref_and_skips() {
    let code = "<?php list($a, &$b, , $c) = $value;";
    let arena = Bump::new();
    let mut handler = ErrorHandler::new();
    let program = parse(code, &arena, &mut handler).expect("program");

    let stmt = program
        .statements
        .iter()
        .find(|s| !matches!(***s, Stmt::Nop { .. }))
        .expect("expected assignment statement");

    let (lhs, rhs) = match *stmt {
        Stmt::Expression { expr: Expr::Assign { var, expr, .. }, .. } => (*var, *expr),
        other => panic!("expected assignment, got {other:?}"),
    };

    match lhs {
        Expr::List { items, .. } => {
            assert_eq!(items.len(), 4);
            assert!(!items[0].by_ref);
            assert!(items[1].by_ref);
            assert!(items[2].value.is_none());
            assert!(!items[3].by_ref);
        }
        other => panic!("expected list, got {other:?}"),
    }
    assert!(matches!(rhs, Expr::Variable { .. }));
}

#[test]
fn test_magic_constants() {
    let code = "<?php $a = __DIR__; $b = __LINE__; $c = __METHOD__; $d = __PROPERTY__;";
    let arena = Bump::new();
    let mut handler = ErrorHandler::new();
    let program = parse(code, &arena, &mut handler).expect("program");

    let kinds: Vec<MagicConstKind> = program
        .statements
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::Expression { expr: Expr::Assign { expr: Expr::MagicConst { kind, .. }, .. }, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        [MagicConstKind::Dir, MagicConstKind::Line, MagicConstKind::Method, MagicConstKind::Property]
    );
}

#[test]
fn lexes_yield_from_as_single_token() {
    let kinds: Vec<TokenKind> = Lexer::new(b"<?php yield from foo(); yield 1;")
        .tokenize()
        .into_iter()
        .map(|tok| tok.kind)
        .collect();

    assert!(kinds.contains(&TokenKind::YieldFrom), "expected YieldFrom token");
    assert!(kinds.contains(&TokenKind::Yield), "expected Yield token");
}

#[test]
fn unclosed_block_yields_no_program() {
    let arena = Bump::new();
    let mut handler = ErrorHandler::new();
    assert!(parse("<?php class A { function f() {", &arena, &mut handler).is_none());
    assert_eq!(handler.syntax_errors()[0].current.kind, TokenKind::Eof);
}
