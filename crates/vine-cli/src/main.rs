use clap::{Parser, Subcommand};
use std::path::Path;

#[derive(Parser)]
#[command(name = "vine")]
#[command(about = "Vine — template-to-PHP compiler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .vine template to a .php file
    Build {
        /// Input .vine file
        path: String,

        /// Directive-open delimiter
        #[arg(long, default_value_t = '{')]
        open: char,

        /// Directive-close delimiter
        #[arg(long, default_value_t = '}')]
        close: char,
    },

    /// Check a .vine template for errors without generating output
    Check {
        /// Input .vine file
        path: String,

        /// Directive-open delimiter
        #[arg(long, default_value_t = '{')]
        open: char,

        /// Directive-close delimiter
        #[arg(long, default_value_t = '}')]
        close: char,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Build { path, open, close } => cmd_build(&path, open, close),
        Command::Check { path, open, close } => cmd_check(&path, open, close),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_build(path: &str, open: char, close: char) {
    let source = read_source(path);

    let php = match vine_compiler::Compiler::new()
        .delimiters(open, close)
        .compile(&source, path)
    {
        Ok(php) => php,
        Err(e) => {
            eprintln!("Compile error: {e}");
            std::process::exit(1);
        }
    };

    // Write the output next to the source
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    let dir = Path::new(path).parent().unwrap_or(Path::new("."));
    let php_path = dir.join(format!("{stem}.php"));

    if let Err(e) = std::fs::write(&php_path, &php) {
        eprintln!("Error writing {}: {e}", php_path.display());
        std::process::exit(1);
    }

    eprintln!("Built: {}", php_path.display());
}

fn cmd_check(path: &str, open: char, close: char) {
    let source = read_source(path);

    if let Err(e) = vine_compiler::Compiler::new()
        .delimiters(open, close)
        .compile(&source, path)
    {
        eprintln!("Compile error: {e}");
        std::process::exit(1);
    }

    eprintln!("OK: {path}");
}
