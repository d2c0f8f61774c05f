use anyhow::Context;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use ticketql::error::Error;
use ticketql::token::Span;
use ticketql::{parse_query, FilterCompiler, Lexer, QueryConfig, SqlCompiler};

const DEFAULT_CONFIG_FILE: &str = "ticketql.json";

/// Loads the config named on the command line, else `ticketql.json` if present, else the defaults.
fn load_config() -> anyhow::Result<QueryConfig> {
    if let Some(path) = std::env::args().nth(1) {
        let config = QueryConfig::from_json_file(&path)
            .with_context(|| format!("cannot load config {}", path))?;
        println!("{} loaded config from {}", "✓".green(), path);
        return Ok(config);
    }

    match QueryConfig::from_json_file(DEFAULT_CONFIG_FILE) {
        Ok(config) => {
            println!("{} loaded config from {}", "✓".green(), DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Err(e) => {
            println!("{} {}, using default config", "⚠".yellow(), e);
            Ok(QueryConfig::default())
        }
    }
}

fn print_tokens(input: &str) {
    for token in Lexer::new(input) {
        let Span { start, end } = token.span;
        println!("  {:<9} {:?}  {}..{}", token.kind, token.literal, start, end);
    }
}

fn print_errors(input: &str, errors: &[ticketql::ParseError]) {
    println!("{}", "✗ invalid query".red().bold());
    for error in errors {
        println!("  {}", error.message.red());
        if let Some(span) = error.span {
            let (offset, width) = caret_position(input, span);
            println!("    {}", input);
            println!("    {}{}", " ".repeat(offset), "^".repeat(width).red());
        }
    }
}

/// Column and width of a span's marker, counted in characters rather than bytes.
fn caret_position(input: &str, span: Span) -> (usize, usize) {
    let chars_in =
        |range: std::ops::Range<usize>| input.get(range).map_or(0, |s| s.chars().count());
    let offset = chars_in(0..span.start);
    let width = chars_in(span.start..span.end).max(1);
    (offset, width)
}

fn run_query(
    input: &str,
    config: &QueryConfig,
    filters: &FilterCompiler,
    sql: &SqlCompiler,
) -> anyhow::Result<()> {
    let ast = match parse_query(input, &config.limits) {
        Ok(ast) => ast,
        Err(Error::Syntax(errors)) => {
            print_errors(input, &errors);
            return Ok(());
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            return Ok(());
        }
    };

    println!("{} {}", "ast:".bold(), ast);

    match filters.compile(&ast) {
        Some(predicate) => {
            println!("{}", "predicate:".bold());
            println!("{}", serde_json::to_string_pretty(&predicate)?);
            println!("{}", "document filter:".bold());
            println!(
                "{}",
                serde_json::to_string_pretty(&predicate.to_document(config.case_insensitive_like))?
            );
        }
        None => println!("{} {}", "predicate:".bold(), "(none)".dimmed()),
    }

    match sql.compile(&ast) {
        Ok(result) => println!("{} {}", "sql:".bold(), result.sql),
        Err(e) => println!("{} {}", "✗".red(), e),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    println!("--- ticketql: ticket query shell ---");
    println!("type a query, `:tokens <query>` to see its tokens, `:quit` to leave\n");

    let config = load_config()?;
    let filters = FilterCompiler::with_config(config.clone());
    let sql = SqlCompiler::with_config(config.clone());

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("ticketql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;

                if line == ":quit" {
                    break;
                } else if let Some(query) = line.strip_prefix(":tokens") {
                    print_tokens(query.trim_start());
                } else {
                    run_query(line, &config, &filters, &sql)?;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
