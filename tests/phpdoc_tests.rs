use std::sync::Arc;

use php_recovery_parser::lexer::Lexer;
use php_recovery_parser::lexer::token::TokenKind;
use php_recovery_parser::phpdoc::{AnnotationKind, PhpDocBlock, PhpDocParser, TagBody, TagKind};

const SOURCE: &str = r#"<?php
namespace App;

/**
 * Repository of users.
 *
 * @method static User create(int $id, string $name = 'x')
 * @method find(array{id: int, tags: list<string>} $filter, ?callable $cb = null)
 * @property-read (Countable&Traversable)|null $items
 * @mixin \App\Query\Builder
 */
class Users
{
    /**
     * @param int|string $key the lookup key
     * @param Status::ACTIVE $status
     * @return User[]|null
     * @throws \RuntimeException
     */
    public function get($key, $status) {}
}
"#;

fn doc_blocks(source: &str) -> Vec<PhpDocBlock> {
    let parser = PhpDocParser::with_line_parsers(Arc::from(Vec::new()));
    Lexer::new(source.as_bytes())
        .tokenize()
        .into_iter()
        .filter(|token| token.kind == TokenKind::DocComment)
        .map(|token| parser.parse(token.span.start, token.span.end, token.span.text(source)))
        .collect()
}

fn at(span: php_recovery_parser::Span) -> &'static str {
    &SOURCE[span.start..span.end]
}

#[test]
fn class_doc_block() {
    let blocks = doc_blocks(SOURCE);
    assert_eq!(blocks.len(), 2);

    let class = &blocks[0];
    assert_eq!(class.description, "Repository of users.");
    let names: Vec<&str> = class.tags.iter().map(|t| t.kind.name()).collect();
    assert_eq!(names, ["method", "method", "property-read", "mixin"]);

    let TagBody::Method { types, name, params, is_static } = &class.tags[0].body else {
        panic!("expected method");
    };
    assert!(*is_static);
    assert_eq!(at(name.span), "create");
    assert_eq!(at(types[0].span), "User");
    assert_eq!(params.len(), 2);
    assert_eq!(at(params[0].variable().unwrap().span), "$id");
    assert_eq!(at(params[1].types()[0].span), "string");
}

#[test]
fn method_parameters_keep_nested_commas() {
    let blocks = doc_blocks(SOURCE);
    let TagBody::Method { types, name, params, is_static } = &blocks[0].tags[1].body else {
        panic!("expected method");
    };
    assert!(!*is_static);
    assert_eq!(name.value, "find");
    assert_eq!(types[0].value, "void");
    assert!(types[0].span.is_empty());

    let vars: Vec<&str> = params.iter().map(|p| p.variable().unwrap().value.as_str()).collect();
    assert_eq!(vars, ["$filter", "$cb"]);
    assert_eq!(params[0].types()[0].value, "array");
    assert_eq!(params[1].types()[0].value, "?callable");
}

#[test]
fn intersection_groups_and_mixins() {
    let blocks = doc_blocks(SOURCE);
    let property = &blocks[0].tags[2];
    let values: Vec<&str> = property.types().iter().map(|t| t.value.as_str()).collect();
    assert_eq!(values, ["Countable", "Traversable", "null"]);
    assert_eq!(at(property.variable().unwrap().span), "$items");

    let mixin = &blocks[0].tags[3];
    assert_eq!(mixin.kind, AnnotationKind::Builtin(TagKind::Mixin));
    assert_eq!(at(mixin.types()[0].span), "\\App\\Query\\Builder");
}

#[test]
fn method_doc_block() {
    let blocks = doc_blocks(SOURCE);
    let method = &blocks[1];
    assert_eq!(method.description, "");
    assert_eq!(at(method.span), method_comment());

    let key = &method.tags[0];
    assert_eq!(key.description, "int|string $key the lookup key");
    let values: Vec<&str> = key.types().iter().map(|t| at(t.span)).collect();
    assert_eq!(values, ["int", "string"]);

    let status = &method.tags[1];
    let (class, constant) = status.types()[0].static_access.clone().unwrap();
    assert_eq!((at(class.span), at(constant.span)), ("Status", "ACTIVE"));

    let returns = method.tags[2].types();
    assert!(returns[0].is_array);
    assert_eq!(at(returns[0].span), "User");
    assert!(!returns[1].is_array);

    assert_eq!(method.tags[3].types()[0].value, "\\RuntimeException");
}

fn method_comment() -> &'static str {
    let start = SOURCE.rfind("/**").unwrap();
    let end = SOURCE.rfind("*/").unwrap() + 2;
    &SOURCE[start..end]
}
