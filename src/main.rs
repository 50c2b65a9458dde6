use clap::{Parser, Subcommand};
use exn::ResultExt;
use pagepress_config::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pagepress", version, about = "Convert HTML to PDF with headless Chromium")]
struct Cli {
    /// Configuration file; defaults to `config.toml` in the platform config directory.
    #[arg(short, long, global = true, env = "PAGEPRESS_CONFIG")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default).
    Serve,
    /// Convert a single HTML file without starting the server.
    Render {
        /// HTML file to convert, or `-` for stdin.
        input: PathBuf,
        /// Where to write the PDF; defaults to the input with a `.pdf` extension.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("server failed")]
    Serve,
    #[display("could not read {_0}")]
    Read(#[error(not(source))] String),
    #[display("conversion failed")]
    Convert,
    #[display("could not write {_0}")]
    Write(#[error(not(source))] String),
}

type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => pagepress_server::serve(&config).await.or_raise(|| ErrorKind::Serve),
        Command::Render { input, output } => render(&config, &input, output).await,
    }
}

#[tracing::instrument(skip(config, output))]
async fn render(config: &Config, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let stdin = input == Path::new("-");
    let html = if stdin {
        let mut html = String::new();
        tokio::io::stdin().read_to_string(&mut html).await.or_raise(|| ErrorKind::Read("stdin".into()))?;
        html
    } else {
        tokio::fs::read_to_string(input).await.or_raise(|| ErrorKind::Read(input.display().to_string()))?
    };
    let output = output.unwrap_or_else(|| {
        if stdin { PathBuf::from(format!("{}.pdf", config.server.filename)) } else { input.with_extension("pdf") }
    });

    let renderer = config.render.renderer().or_raise(|| ErrorKind::Convert)?;
    let pdf = renderer.convert(&html).await.or_raise(|| ErrorKind::Convert)?;
    tokio::fs::write(&output, pdf.as_bytes()).await.or_raise(|| ErrorKind::Write(output.display().to_string()))?;
    tracing::info!(output = %output.display(), bytes = pdf.len(), "PDF written");
    Ok(())
}
