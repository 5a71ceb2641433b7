//! handlebind CLI
//!
//! # Использование
//!
//! ```bash
//! # Сгенерировать обёртки в stdout
//! handlebind generate api.toml
//!
//! # В файл, с именем библиотеки для #[link]
//! handlebind generate api.toml -o src/bindings.rs --link-name counter
//!
//! # Модель обёрток в JSON
//! handlebind generate api.toml --format json
//!
//! # Только проверить описание
//! handlebind check api.toml
//! ```
//!
//! Без аргумента `FILE` ищется `handlebind.toml` в текущей директории и выше.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::{debug, LevelFilter};

use handlebind::{
    emit_rust, BindError, BindResult, GenerationReport, Generator, GeneratorOptions, Manifest,
};

/// Rust wrapper generator for prefixed C handle APIs
#[derive(Parser)]
#[command(name = "handlebind")]
#[command(author = "Pavel (Xzdes)")]
#[command(version)]
#[command(about = "Generates safe Rust wrappers for C opaque-handle APIs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate wrappers from a description file
    Generate {
        /// Description file (TOML, or JSON by extension)
        file: Option<PathBuf>,

        /// Output file (stdout by default)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "rust")]
        format: OutputFormat,

        /// Library name for #[link(name = ...)]
        #[arg(long)]
        link_name: Option<String>,

        /// Name of the module with raw declarations
        #[arg(long)]
        ffi_module: Option<String>,
    },

    /// Validate a description file without writing output
    Check {
        /// Description file (TOML, or JSON by extension)
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Rust,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Generate {
            file,
            output,
            format,
            link_name,
            ffi_module,
        } => generate(file, output.as_deref(), format, link_name, ffi_module, cli.quiet),
        Commands::Check { file } => check(file, cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli.quiet {
                eprintln!("{}: {}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logger(verbose: bool, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn load(file: Option<PathBuf>) -> BindResult<(Manifest, PathBuf)> {
    let path = match file {
        Some(path) => path,
        None => Manifest::find()?,
    };
    debug!("loading {}", path.display());
    let manifest = Manifest::load(&path)?;
    Ok((manifest, path))
}

fn run(manifest: &Manifest, options: GeneratorOptions) -> GenerationReport {
    manifest.generate(&Generator::new(options))
}

fn generate(
    file: Option<PathBuf>,
    output: Option<&Path>,
    format: OutputFormat,
    link_name: Option<String>,
    ffi_module: Option<String>,
    quiet: bool,
) -> BindResult<()> {
    let (manifest, _) = load(file)?;

    let mut options = manifest.options.clone();
    if link_name.is_some() {
        options.link_name = link_name;
    }
    if let Some(module) = ffi_module {
        options.ffi_module = module;
    }

    let report = run(&manifest, options.clone());

    let rendered = match format {
        OutputFormat::Rust => emit_rust(&report, &options),
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
    };
    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            if !quiet {
                eprintln!(
                    "{} {} binding(s) to {}",
                    "Wrote".green().bold(),
                    report.bindings().count(),
                    path.display()
                );
            }
        }
        None => print!("{}", rendered),
    }

    finish(&report, quiet)
}

fn check(file: Option<PathBuf>, quiet: bool) -> BindResult<()> {
    let (manifest, path) = load(file)?;
    let report = run(&manifest, manifest.options.clone());

    if !quiet {
        println!("{} {}", "Checking".green().bold(), path.display());
        for outcome in &report.outcomes {
            match outcome.binding() {
                Some(binding) => println!(
                    "  {} {} -> {} ({} method(s), {} constructor(s){})",
                    "ok".green(),
                    outcome.prefix,
                    binding.wrapper,
                    binding.methods.len(),
                    binding.constructors.len(),
                    if binding.destructor.is_some() { ", Drop" } else { "" }
                ),
                None => println!("  {} {}", "failed".red(), outcome.prefix),
            }
        }
        for capability in &report.capabilities {
            println!(
                "  {} trait {} for {}",
                "ok".green(),
                capability.name,
                capability.implementors.join(", ")
            );
        }
    }

    finish(&report, quiet)
}

/// Напечатать диагностику; ошибка, если хоть одна спецификация не прошла.
fn finish(report: &GenerationReport, quiet: bool) -> BindResult<()> {
    if !quiet {
        for error in report.errors() {
            eprintln!("{} [{}]: {}", "error".red().bold(), error.kind().yellow(), error);
        }
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(BindError::GenerationFailed(report.errors().count()))
    }
}
