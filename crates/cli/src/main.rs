use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Rover robot language toolchain.
#[derive(Parser)]
#[command(name = "rover", version, about = "Rover robot language toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a Rover source file
    Check {
        /// Path to the source file
        file: PathBuf,
    },

    /// Dump the token stream of a Rover source file
    Tokens {
        /// Path to the source file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file } => cmd_check(&file, cli.output, cli.quiet),
        Commands::Tokens { file } => cmd_tokens(&file, cli.output, cli.quiet),
    }
}

fn cmd_check(file: &Path, output: OutputFormat, quiet: bool) {
    let name = file.display().to_string();
    let source = read_source(file, output, quiet);
    match rover_core::check(&source, &name) {
        Ok(()) => {
            match output {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "valid": true }));
                }
                OutputFormat::Text => {
                    if !quiet {
                        println!("{}: valid", name);
                    }
                }
            }
        }
        Err(e) => {
            match output {
                OutputFormat::Json => {
                    let doc = serde_json::json!({ "valid": false, "error": e.to_json_value() });
                    let pretty = serde_json::to_string_pretty(&doc)
                        .unwrap_or_else(|_| format!("{:?}", e));
                    eprintln!("{}", pretty);
                }
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("{}", e);
                    }
                }
            }
            process::exit(1);
        }
    }
}

fn cmd_tokens(file: &Path, output: OutputFormat, quiet: bool) {
    let name = file.display().to_string();
    let source = read_source(file, output, quiet);
    match rover_core::lex(&source, &name) {
        Ok(tokens) => match output {
            OutputFormat::Json => {
                let items: Vec<serde_json::Value> = tokens
                    .iter()
                    .map(|s| {
                        serde_json::json!({
                            "kind":   s.token.kind_name(),
                            "lexeme": s.token.lexeme(),
                            "line":   s.line,
                            "column": s.column,
                        })
                    })
                    .collect();
                let pretty = serde_json::to_string_pretty(&serde_json::Value::Array(items))
                    .unwrap_or_else(|e| format!("serialization error: {}", e));
                println!("{}", pretty);
            }
            OutputFormat::Text => {
                for s in &tokens {
                    println!(
                        "{}:{}\t{}\t{}",
                        s.line,
                        s.column,
                        s.token.kind_name(),
                        s.token.lexeme()
                    );
                }
            }
        },
        Err(e) => {
            match output {
                OutputFormat::Json => {
                    let pretty = serde_json::to_string_pretty(&e.to_json_value())
                        .unwrap_or_else(|_| format!("{:?}", e));
                    eprintln!("{}", pretty);
                }
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("{}", e);
                    }
                }
            }
            process::exit(1);
        }
    }
}

fn read_source(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            report_error(
                &format!("error reading file '{}': {}", path.display(), e),
                output,
                quiet,
            );
            process::exit(2);
        }
    }
}

fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("{}", msg);
            }
        }
    }
}
