//! transpdf CLI - PDF translation tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use transpdf::translate::SUPPORTED_LANGUAGES;
use transpdf::{
    Book, Config, ContentKind, Extractor, Language, LopdfOpener, OpenAiService, OutputFormat,
    PdfTranslator, TranslationReport,
};

#[derive(Parser)]
#[command(name = "transpdf")]
#[command(version)]
#[command(about = "Translate PDF documents into PDF or Markdown", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a PDF and write the result to a file
    Translate {
        #[command(flatten)]
        job: JobArgs,

        /// Output format: pdf or markdown
        #[arg(short, long)]
        format: Option<String>,

        /// Output file (defaults to <name>_translated.<ext> next to the input)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Translate a PDF and print the translated text
    Text {
        #[command(flatten)]
        job: JobArgs,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Extract a PDF into content units without translating
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Only the first N pages
        #[arg(long, value_name = "N")]
        pages: Option<usize>,

        /// Print the extracted book as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported target languages
    Languages,

    /// Show version information
    Version,
}

#[derive(Args)]
struct JobArgs {
    /// Input PDF file (defaults to [common].book)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Target language code or name (defaults to [common].target_language)
    #[arg(short, long)]
    language: Option<String>,

    /// Only the first N pages
    #[arg(long, value_name = "N")]
    pages: Option<usize>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API root URL
    #[arg(long)]
    base_url: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Translate {
            job,
            format,
            output,
        } => cmd_translate(config, job, format.as_deref(), output.as_deref()),
        Commands::Text { job, output } => cmd_text(config, job, output.as_deref()),
        Commands::Extract { input, pages, json } => cmd_extract(&config, &input, pages, json),
        Commands::Languages => {
            cmd_languages();
            Ok(())
        }
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    });

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new("config.toml").is_file() => Ok(Config::load("config.toml")?),
        None => {
            log::debug!("No configuration file, using defaults");
            Ok(Config::default())
        }
    }
}

/// Fold command-line overrides into the configuration.
fn apply_overrides(config: &mut Config, job: &JobArgs) {
    if let Some(model) = &job.model {
        config.model.model = model.clone();
    }
    if let Some(key) = &job.api_key {
        config.model.api_key = Some(key.clone());
    }
    if let Some(url) = &job.base_url {
        config.model.base_url = url.clone();
    }
    if let Some(book) = &job.input {
        config.common.book = Some(book.clone());
    }
    if let Some(language) = &job.language {
        config.common.target_language = language.clone();
    }
}

fn resolve_language(value: &str) -> Result<Language, Box<dyn std::error::Error>> {
    Language::resolve(value).ok_or_else(|| {
        format!(
            "Unsupported language: {} (run `transpdf languages` for the list)",
            value
        )
        .into()
    })
}

fn build_translator(config: &Config) -> Result<PdfTranslator, Box<dyn std::error::Error>> {
    let service = OpenAiService::new(config.openai_options()?)?;
    Ok(PdfTranslator::new(service)
        .with_extract_options(config.extract_options())
        .with_render_options(config.render_options()?))
}

fn spinner(message: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Ok(pb)
}

fn cmd_translate(
    mut config: Config,
    job: JobArgs,
    format: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    apply_overrides(&mut config, &job);
    if let Some(format) = format {
        config.common.file_format = format.to_string();
    }

    let format: OutputFormat = config.output_format()?;
    let language = resolve_language(&config.common.target_language)?;
    let input = config
        .common
        .book
        .clone()
        .ok_or("No input file given and [common].book is not set")?;
    let translator = build_translator(&config)?;

    let pb = spinner(&format!("Translating {} into {}...", input.display(), language))?;
    let (path, report) =
        translator.translate_pdf_with_report(&input, language.name, format, output, job.pages)?;
    pb.finish_with_message("Done!");

    print_report(&report);
    println!("{} {}", "Saved to".green(), path.display());
    Ok(())
}

fn cmd_text(
    mut config: Config,
    job: JobArgs,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    apply_overrides(&mut config, &job);

    let language = resolve_language(&config.common.target_language)?;
    let input = config
        .common
        .book
        .clone()
        .ok_or("No input file given and [common].book is not set")?;
    let translator = build_translator(&config)?;

    let pb = spinner(&format!("Translating {} into {}...", input.display(), language))?;
    let (text, report) =
        translator.translate_pdf_text_with_report(&input, language.name, job.pages)?;
    pb.finish_and_clear();
    print_report(&report);

    if let Some(path) = output {
        fs::write(path, &text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        print!("{}", text);
    }
    Ok(())
}

fn cmd_extract(
    config: &Config,
    input: &Path,
    pages: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let extractor =
        Extractor::new(Box::new(LopdfOpener::default())).with_options(config.extract_options());
    let book = extractor.extract(input, pages)?;

    if json {
        println!("{}", book.to_json()?);
        return Ok(());
    }

    print_summary(input, &book);
    Ok(())
}

fn print_summary(input: &Path, book: &Book) {
    println!("{}", "Document Content".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), book.page_count());
    println!("{}: {}", "Text blocks".bold(), book.count_kind(ContentKind::Text));
    println!("{}: {}", "Tables".bold(), book.count_kind(ContentKind::Table));
    println!("{}: {}", "Images".bold(), book.count_kind(ContentKind::Image));
}

fn print_report(report: &TranslationReport) {
    if report.is_complete() {
        return;
    }
    eprintln!(
        "{} {} unit(s) could not be translated and were left out:",
        "Warning:".yellow().bold(),
        report.failed()
    );
    for failure in &report.failures {
        eprintln!("  {} {}", "-".dimmed(), failure);
    }
}

fn cmd_languages() {
    println!("{}", "Supported languages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for lang in SUPPORTED_LANGUAGES {
        println!("  {}  {}", lang.code.bold(), lang.name);
    }
}

fn cmd_version() {
    println!("{} {}", "transpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF translation tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(args: &[&str]) -> JobArgs {
        let mut argv = vec!["transpdf", "text"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Text { job, .. } => job,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[common]\nfile_format = \"markdown\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.output_format().unwrap(), OutputFormat::Markdown);
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_overrides_win_over_config() {
        let mut config = Config::default();
        let job = job(&[
            "paper.pdf",
            "-l",
            "fr",
            "--model",
            "gpt-4o",
            "--api-key",
            "sk-cli",
        ]);
        apply_overrides(&mut config, &job);

        assert_eq!(config.common.book, Some(PathBuf::from("paper.pdf")));
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.api_key().as_deref(), Some("sk-cli"));
        assert_eq!(
            resolve_language(&config.common.target_language).unwrap().name,
            "Français"
        );
    }

    #[test]
    fn test_unknown_language() {
        let err = resolve_language("klingon").unwrap_err();
        assert!(err.to_string().starts_with("Unsupported language: klingon"));
    }
}
