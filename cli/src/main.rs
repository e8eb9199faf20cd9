mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use concretizer::{DiagnosticError, ExpressionEvaluator, RuntimeValue};

use crate::config::RenderConfig;

const SUBCOMMANDS: &[&str] = &["run", "test", "help"];

/// Template rendered when no file is named.
const DEFAULT_TEMPLATE: &str = "macro.txt.xcb";

#[derive(Parser)]
#[command(name = "xcb", version, about = "Template macro preprocessor")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template to standard output
    Run(RunArgs),

    /// Render .xcb files and compare them against their golden output
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Template file to render
    #[arg(default_value = DEFAULT_TEMPLATE)]
    file: String,

    /// Parse only, report diagnostics, don't render
    #[arg(long)]
    check: bool,

    /// Dump the analyzed template tree
    #[arg(long)]
    ast: bool,

    /// Abort on the first structural problem instead of warning
    #[arg(long)]
    strict: bool,

    /// TOML file with `strict` and a `[vars]` table of initial variables
    #[arg(long, value_name = "FILE")]
    vars: Option<PathBuf>,

    /// Bind a variable before rendering. Repeatable.
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", value_parser = parse_define)]
    define: Vec<(String, RuntimeValue)>,

    /// Render but don't print the output (just check for errors)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .xcb file or a directory containing them
    #[arg(default_value = ".")]
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    init_tracing();

    let cli = Cli::parse_from(inject_run(std::env::args().collect()));

    match cli.command {
        Command::Run(run_args) => do_run(run_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Log events go to stderr, filtered by `XCB_LOG` (e.g. `XCB_LOG=concretizer=debug`).
/// Nothing is installed when the variable is unset.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var_os("XCB_LOG").is_some() {
        let filter = EnvFilter::from_env("XCB_LOG");
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    }
}

/// `xcb`, `xcb FILE` and `xcb --strict FILE` all mean `xcb run ...`: unless a
/// subcommand is named, insert `run` right after the program name.
fn inject_run(mut args: Vec<String>) -> Vec<String> {
    let mut first_positional = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            // flags that take a separate value
            "-D" | "--define" | "--vars" | "-c" | "--category" => i += 2,
            arg if arg.starts_with('-') => i += 1,
            _ => {
                first_positional = Some(i);
                break;
            }
        }
    }

    let wants_top_level_info = args
        .iter()
        .skip(1)
        .any(|a| matches!(a.as_str(), "-h" | "--help" | "-V" | "--version"));

    match first_positional {
        Some(pos) if SUBCOMMANDS.contains(&args[pos].as_str()) => {}
        None if wants_top_level_info => {}
        _ => args.insert(1.min(args.len()), "run".to_string()),
    }
    args
}

fn do_run(args: RunArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    // Read source
    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    let render_config = match &args.vars {
        Some(path) => match RenderConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
        None => RenderConfig::default(),
    };

    // Set up codespan file database
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    // Parse
    let template = xcb::parser::Parser::new(source, file_id).parse();

    // --check: report parse diagnostics, exit
    if args.check {
        for error in &template.diagnostics {
            let _ = term::emit_to_write_style(
                &mut writer.lock(),
                &config,
                &files,
                &error.to_diagnostic(),
            );
        }
        if template.diagnostics.is_empty() {
            eprintln!("ok: {} parsed successfully", args.file);
        } else if args.strict || render_config.strict {
            process::exit(1);
        }
        return;
    }

    // --ast: dump the analyzed tree
    if args.ast {
        print!("{}", template);
        return;
    }

    let mut environment = render_config.environment();
    for (name, value) in args.define {
        environment.declare(&name, value);
    }
    let mut options = render_config.options();
    if args.strict {
        options = concretizer::RenderOptions::strict();
    }

    let mut evaluator = ExpressionEvaluator::new();
    let result = concretizer::render_template_with(&template, &mut evaluator, environment, options);

    match result {
        Ok(rendered) => {
            emit_diagnostics(&writer, &config, &files, &rendered.diagnostics);
            if !args.quiet {
                println!("{}", rendered.output);
            }
        }
        Err(error) => {
            emit_diagnostic_error(&writer, &config, &files, &error);
            process::exit(1);
        }
    }
}

fn emit_diagnostic_error(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    error: &DiagnosticError,
) {
    if let Some(span) = &error.span {
        let severity = if error.is_warning {
            Severity::Warning
        } else {
            Severity::Error
        };
        let diagnostic = Diagnostic::new(severity)
            .with_message(error.to_string())
            .with_labels(vec![Label::primary(error.source_id, span.clone())]);
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
    } else {
        let prefix = if error.is_warning { "warning" } else { "error" };
        eprintln!("{}: {}", prefix, error);
    }
}

fn emit_diagnostics(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostics: &[DiagnosticError],
) {
    for diag in diagnostics {
        emit_diagnostic_error(writer, config, files, diag);
    }
}

/// Parse `-D NAME=VALUE`.
fn parse_define(s: &str) -> Result<(String, RuntimeValue), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(xcb::token::is_name_char) {
        return Err(format!("invalid variable name '{}'", name));
    }
    Ok((name.to_string(), parse_arg(value)))
}

/// Parse a CLI argument string into a RuntimeValue.
/// Integers, floats and `true`/`false` are typed; everything else is a String.
fn parse_arg(s: &str) -> RuntimeValue {
    if let Ok(n) = s.parse::<i64>() {
        return RuntimeValue::Integer(n);
    }
    if let Ok(n) = s.parse::<f64>() {
        return RuntimeValue::Float(n);
    }
    match s {
        "true" => RuntimeValue::Boolean(true),
        "false" => RuntimeValue::Boolean(false),
        _ => RuntimeValue::String(s.to_string()),
    }
}
