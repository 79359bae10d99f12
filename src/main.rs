use std::path::{Path, PathBuf};

use anyhow::Context as _;
use bumpalo::Bump;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use php_recovery_parser::ast::sexpr::SExprFormatter;
use php_recovery_parser::lexer::Lexer;
use php_recovery_parser::lexer::token::TokenKind;
use php_recovery_parser::{FileSnapshot, ParseResult, ParserConfig, PhpDocBlock, PhpDocParser, RecoveringParser, SourceHolder, StringSource};

#[derive(Parser)]
#[command(name = "php-recover")]
#[command(about = "Error-tolerant PHP parsing and PHPDoc extraction", long_about = None)]
struct Cli {
    /// Log recovery rounds (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML file with parser settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Accept `<?` open tags
    #[arg(long, global = true)]
    short_tags: bool,

    /// Accept `<%` and `%>` tags
    #[arg(long, global = true)]
    asp_tags: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse files or directories and report how each was recovered
    Parse {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Caret offset of an edited file (single file only)
        #[arg(long)]
        caret: Option<usize>,

        /// Print the tree as s-expressions
        #[arg(long, conflicts_with = "json")]
        sexpr: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the doc comments of a file as JSON
    Doc { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => ParserConfig::load(path)?,
        None => ParserConfig::default(),
    };
    config.short_tags |= cli.short_tags;
    config.asp_tags |= cli.asp_tags;

    match cli.command {
        Command::Parse { paths, caret, sexpr, json } => {
            let output = if sexpr {
                Output::SExpr
            } else if json {
                Output::Json
            } else {
                Output::Summary
            };
            run_parse(config, &paths, caret, output)
        }
        Command::Doc { file } => run_doc(&config, &file),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[derive(Clone, Copy)]
enum Output {
    Summary,
    SExpr,
    Json,
}

fn run_parse(config: ParserConfig, paths: &[PathBuf], caret: Option<usize>, output: Output) -> anyhow::Result<()> {
    let files = collect_files(&config, paths);
    if caret.is_some() && files.len() != 1 {
        anyhow::bail!("--caret needs exactly one file, got {}", files.len());
    }
    info!(files = files.len(), "parsing");

    let parser = RecoveringParser::new(config);
    let reports: Vec<anyhow::Result<String>> = files
        .par_iter()
        .map(|path| {
            let snapshot = FileSnapshot::load(path)?;
            let arena = Bump::new();
            let result = match caret {
                Some(caret) => {
                    let source = StringSource::new(snapshot.text())
                        .with_caret(caret)
                        .with_extension(snapshot.file_extension());
                    parser.parse_source(&source, &arena)
                }
                None => parser.parse_source(&snapshot, &arena),
            };
            render(path, snapshot.text(), &result, output)
        })
        .collect();

    let mut failed = 0;
    for report in reports {
        match report {
            Ok(text) => println!("{text}"),
            Err(err) => {
                failed += 1;
                warn!("{err:#}");
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} file(s) could not be read");
    }
    Ok(())
}

/// Files named directly are always parsed. Directories contribute the files
/// with a registered extension.
fn collect_files(config: &ParserConfig, paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
            let registered = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| config.is_registered(ext));
            if entry.file_type().is_file() && registered {
                files.push(entry.into_path());
            }
        }
    }
    debug!(count = files.len(), "collected files");
    files
}

/// `original` is the file as read. Diagnostics are positioned against it,
/// not against the patched `result.source`.
fn render(path: &Path, original: &str, result: &ParseResult<'_>, output: Output) -> anyhow::Result<String> {
    match output {
        Output::Json => {
            let positions: Vec<_> = result
                .diagnostics
                .iter()
                .map(|diagnostic| {
                    let (line, column) = diagnostic.line_column(original);
                    serde_json::json!({ "line": line, "column": column })
                })
                .collect();
            let value = serde_json::json!({ "path": path, "result": result, "positions": positions });
            Ok(serde_json::to_string_pretty(&value)?)
        }
        Output::SExpr => {
            let mut formatter = SExprFormatter::new(result.source.as_bytes());
            formatter.format_program(&result.program);
            Ok(format!("{}\n{}", path.display(), formatter.finish()))
        }
        Output::Summary => {
            let mut text = format!("{}: {:?} after {} round(s)", path.display(), result.sanitize, result.rounds);
            for diagnostic in &result.diagnostics {
                let (line, column) = diagnostic.line_column(original);
                text.push_str(&format!("\n  {line}:{column}: {}", diagnostic.message));
            }
            Ok(text)
        }
    }
}

fn run_doc(config: &ParserConfig, file: &Path) -> anyhow::Result<()> {
    let snapshot = FileSnapshot::load(file).with_context(|| format!("reading {}", file.display()))?;
    let text = snapshot.text();
    let parser = PhpDocParser::new();

    let blocks: Vec<PhpDocBlock> = Lexer::with_options(text.as_bytes(), config.lexer_options())
        .tokenize()
        .into_iter()
        .filter(|token| token.kind == TokenKind::DocComment)
        .map(|token| parser.parse(token.span.start, token.span.end, token.span.text(text)))
        .collect();
    debug!(blocks = blocks.len(), "doc comments");

    println!("{}", serde_json::to_string_pretty(&blocks)?);
    Ok(())
}
