use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use bumpalo::Bump;
use php_recovery_parser::ast::Stmt;
use php_recovery_parser::error_handler::Severity;
use php_recovery_parser::recovery::FATAL_ERROR_MESSAGE;
use php_recovery_parser::{ParserConfig, RecoveringParser, Sanitize, StringSource};

fn parser() -> RecoveringParser {
    RecoveringParser::new(ParserConfig::default())
}

#[test]
fn test_clean_source() {
    let arena = Bump::new();
    let result = parser().parse("<?php\nclass A { public function f(): int { return 1; } }\n", None, &arena);

    assert!(result.is_clean());
    assert_eq!(result.sanitize, Sanitize::None);
    assert_eq!(result.rounds, 1);
    assert!(result.sanitized_part.is_none());
}

#[test]
fn test_recoverable_error_is_reported_on_the_original_tree() {
    let code = "<?php $a = ; echo 1;";
    let arena = Bump::new();
    let result = parser().parse(code, None, &arena);

    assert_eq!(result.sanitize, Sanitize::None);
    assert_eq!(result.source, code);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].severity, Severity::Error);
    assert!(result.diagnostics[0].message.starts_with("Syntax error: unexpected ';'"));
}

#[test]
fn test_missing_brace() {
    let code = "<?php function f() { echo 1;";
    let arena = Bump::new();
    let result = parser().parse(code, None, &arena);

    assert_eq!(result.sanitize, Sanitize::MissingCurly);
    assert_eq!(result.source, "<?php function f() { echo 1;}");
    assert_eq!(result.rounds, 2);
    assert!(matches!(result.program.statements[1], Stmt::Function { .. }));
    assert!(!result.diagnostics.is_empty());
}

#[test]
fn test_missing_brace_before_close_tag() {
    let code = "<?php if ($a) { echo 1; ?>\n<p>tail</p>\n";
    let arena = Bump::new();
    let result = parser().parse(code, None, &arena);

    assert_eq!(result.sanitize, Sanitize::MissingCurly);
    assert_eq!(result.source, "<?php if ($a) { echo 1;} ?>\n<p>tail</p>\n");
}

#[test]
fn test_swallowed_declaration_is_repaired() {
    let code = "<?php ) class A {}";
    let arena = Bump::new();
    let result = parser().parse(code, None, &arena);

    assert_eq!(result.sanitize, Sanitize::SyntaxErrorCurrent);
    assert_eq!(result.source, "<?php   class A {}");
    assert_eq!(result.rounds, 2);
    assert!(result.program.statements.iter().any(|s| matches!(s, Stmt::Class { .. })));
    // Diagnostics describe the text the user wrote
    assert_eq!(result.diagnostics[0].span().start, 6);
}

#[test]
fn test_require_before_function_gets_a_semicolon() {
    let code = "<?php\nrequire 'a.php'\nfunction f() {}\n";
    let arena = Bump::new();
    let result = parser().parse(code, None, &arena);

    assert_eq!(result.sanitize, Sanitize::RequireFunctionIncomplete);
    assert_eq!(result.source, "<?php\nrequire 'a.php';\nfunction f() {}\n");
    assert_eq!(result.rounds, 2);
    assert!(result.program.statements.iter().any(|s| matches!(s, Stmt::Function { .. })));
    // Positions refer to the text as written, not the patched one
    assert_eq!(result.diagnostics[0].line_column(code), (3, 1));
}

#[test]
fn test_previous_token_is_blanked() {
    let code = "<?php\nfunction f(): A| {}\nclass B {}\n";
    let arena = Bump::new();
    let result = parser().parse(code, None, &arena);

    assert_eq!(result.sanitize, Sanitize::SyntaxErrorPrevious);
    assert_eq!(result.source, "<?php\nfunction f(): A  {}\nclass B {}\n");
    assert_eq!(result.rounds, 3);
}

#[test]
fn test_previous_line_is_blanked() {
    let code = "<?php\nfoo(}) class A {}\n";
    let arena = Bump::new();
    let result = parser().parse(code, None, &arena);

    assert_eq!(result.sanitize, Sanitize::SyntaxErrorPreviousLine);
    assert_eq!(result.source, format!("<?php\n{}}}{}}}\n", " ".repeat(4), " ".repeat(11)));
    assert_eq!(result.rounds, 3);
}

#[test]
fn test_enclosing_block_is_blanked() {
    let code = "<?php\nnamespace A {\n$a = )\n) function f() {}\n}\n";
    let open = code.find('{').unwrap() + 1;
    let close = code.rfind('}').unwrap();
    let blanked: String = code[open..close].chars().map(|c| if c == '\n' { c } else { ' ' }).collect();
    let expected = format!("{}{blanked}{}", &code[..open], &code[close..]);

    let arena = Bump::new();
    let result = parser().parse(code, None, &arena);

    assert_eq!(result.sanitize, Sanitize::SyntaxErrorBlock);
    assert_eq!(result.source, expected);
    assert_eq!(result.rounds, 5);
}

#[test]
fn test_fatal_fallback() {
    let code = "<?php\n$a = )\n) class A {}";
    let arena = Bump::new();
    let result = parser().parse(code, None, &arena);

    assert_eq!(result.sanitize, Sanitize::Fatal);
    assert_eq!(result.program.statements.len(), 1);
    assert!(matches!(result.program.statements[0], Stmt::Error { span } if span.start == 0 && span.end == code.len()));
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, FATAL_ERROR_MESSAGE);
    assert!(result.rounds <= 9);
}

#[test]
fn test_edited_line_uses_the_caret() {
    let code = "<?php\n$a = )\n) class A {}";
    let caret = code.find(')').unwrap();
    let arena = Bump::new();
    let result = parser().parse(code, Some(caret), &arena);

    // The second `)` is not on the caret line, so this still fails
    assert_eq!(result.sanitize, Sanitize::Fatal);

    let caret = code.rfind(')').unwrap();
    let result = parser().parse(code, Some(caret), &arena);
    assert_eq!(result.sanitize, Sanitize::EditedLine);
    assert_eq!(result.source, "<?php\n$a = )\n          {}");
    assert_eq!(result.rounds, 5);
}

#[test]
fn test_recovery_terminates() {
    let inputs = [
        "",
        "{",
        "}",
        "<?php {{{{",
        "<?php }}}}",
        "<?php function (",
        "<?php class { function",
        "<?php require 'a.php",
        "<?php \"unterminated",
        "<?php /* open comment",
        "<?php $$$",
    ];
    let parser = parser();
    for input in inputs {
        let arena = Bump::new();
        let result = parser.parse(input, None, &arena);
        assert!(result.rounds <= 9, "{input:?} took {} rounds", result.rounds);
    }
}

#[test]
fn test_unregistered_extension_is_skipped() {
    let arena = Bump::new();
    let source = StringSource::new("<?php ) class A {}").with_extension(Some("txt"));
    let result = parser().parse_source(&source, &arena);

    assert_eq!(result.rounds, 0);
    assert!(result.program.statements.is_empty());
    assert!(result.diagnostics.is_empty());

    let source = StringSource::new("<?php echo 1;").with_extension(None);
    assert_eq!(parser().parse_source(&source, &arena).rounds, 0);
}

#[test]
fn test_registered_extension_is_case_insensitive() {
    let arena = Bump::new();
    let source = StringSource::new("<?php echo 1;").with_extension(Some("PHP"));
    let result = parser().parse_source(&source, &arena);
    assert_eq!(result.rounds, 1);
    assert!(result.is_clean());
}

#[test]
fn test_cancellation_accepts_the_first_tree() {
    let flag = Arc::new(AtomicBool::new(true));
    let parser = parser().with_cancellation(flag);
    let arena = Bump::new();
    let result = parser.parse("<?php ) class A {}", None, &arena);

    assert_eq!(result.sanitize, Sanitize::None);
    assert_eq!(result.rounds, 1);
    assert!(matches!(result.program.statements[1], Stmt::Error { .. }));
}

#[test]
fn test_result_serializes_without_the_tree() {
    let arena = Bump::new();
    let result = parser().parse("<?php function f() { echo 1;", None, &arena);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["sanitize"], "MissingCurly");
    assert!(json.get("program").is_none());
    assert_eq!(json["sanitized_part"]["replacement"], "}");
}
