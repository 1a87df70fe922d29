//! Tokcount CLI - Estimate LLM token counts for a repository.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use clap_complete::{generate, Shell};
use serde::Serialize;
use tokcount::builder::Tokcount;
use tokcount::errors::{exit_code, TokcountError};
use tokcount::output::{format_output, OutputFormat};
use tokcount::tree::render_tree;
use tokcount::walker::DEFAULT_MAX_FILE_BYTES;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tokcount")]
#[command(about = "Estimate LLM token counts for a repository")]
#[command(version)]
struct Cli {
    /// Repository root to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "summary")]
    output: OutputArg,

    /// Tokenizer (estimate, openai, openai-o200k, anthropic, google)
    #[arg(long, default_value = "estimate")]
    tokenizer: String,

    /// Additional ignore file; must exist
    #[arg(long, value_name = "FILE")]
    ignore: Option<PathBuf>,

    /// Append the directory tree to the summary
    #[arg(long)]
    tree: bool,

    /// Ignore files larger than this many bytes
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_FILE_BYTES)]
    max_file_bytes: u64,

    /// Read files on a single thread
    #[arg(long)]
    sequential: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputArg {
    Summary,
    Json,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Summary => OutputFormat::Summary,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "tokcount", &mut std::io::stdout());
        return;
    }

    init_tracing(cli.verbose);

    let format = OutputFormat::from(cli.output);
    if let Err(e) = run(cli, format) {
        if format == OutputFormat::Json {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn init_tracing(verbose: u8) {
    // RUST_LOG takes precedence over -v
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }),
    };

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Err(err) = init_result {
        eprintln!("warning: tracing already initialized: {err}");
    }
}

fn run(cli: Cli, format: OutputFormat) -> Result<(), TokcountError> {
    let mut builder = Tokcount::new(&cli.path)
        .tokenizer(cli.tokenizer)
        .max_file_bytes(cli.max_file_bytes)
        .parallel(!cli.sequential);
    if let Some(ignore) = cli.ignore {
        builder = builder.ignore_file(ignore);
    }

    let result = builder.run()?;

    let mut output = format_output(&result, format)?;
    if cli.tree && format == OutputFormat::Summary {
        output.push('\n');
        output.push_str(&render_tree(&result));
    }
    if !output.ends_with('\n') {
        output.push('\n');
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    out.write_all(output.as_bytes())?;
    out.flush()?;

    Ok(())
}
