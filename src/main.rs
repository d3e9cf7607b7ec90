use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use docrag::commands::{router, AskResponse};
use docrag::services::parser::{CorpusExtractor, PaddleOcr, PageExtractor, PdfiumReader, TextRecognizer};
use docrag::services::{AppConfig, FastEmbedder, IndexBuilder, TextNormalizer};
use docrag::{AppError, AppResult, AppState};

#[derive(Parser, Debug)]
#[command(name = "docrag", version, about = "Ask grounded questions about a folder of PDFs")]
struct Cli {
    /// JSON config file (defaults to the per-user config, then built-in defaults)
    #[arg(long, global = true, env = "DOCRAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract fragments from every PDF in the documents directory
    Extract {
        #[arg(long)]
        docs_dir: Option<PathBuf>,
    },
    /// Embed the fragment stream and write the similarity index
    Index,
    /// Answer one question, or start an interactive prompt when none is given
    Ask {
        question: Option<String>,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Serve `/health` and `/ask` over HTTP
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "docrag failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Extract { docs_dir } => extract(config, docs_dir).await,
        Command::Index => index(&config).await,
        Command::Ask { question, k } => {
            let state = AppState::load(&config).await?;
            match question {
                Some(question) => {
                    let response = state.ask(&question, k).await?;
                    print_response(&response);
                    Ok(())
                }
                None => repl(&state, k).await,
            }
        }
        Command::Serve { bind } => serve(&config, bind).await,
    }
}

async fn extract(config: AppConfig, docs_dir: Option<PathBuf>) -> AppResult<()> {
    let docs_dir = docs_dir.unwrap_or_else(|| PathBuf::from(&config.paths.docs_dir));
    let output = config.paths.chunks_path();

    // pdfium handles stay on one blocking thread for the whole run
    let report = tokio::task::spawn_blocking(move || {
        let extraction = &config.extraction;
        let ocr: Option<Box<dyn TextRecognizer>> = if extraction.ocr_enabled {
            match PaddleOcr::new(Path::new(&extraction.model_dir)) {
                Ok(engine) => Some(Box::new(engine) as Box<dyn TextRecognizer>),
                Err(err) => {
                    tracing::warn!(error = %err, "OCR unavailable, figure regions will be skipped");
                    None
                }
            }
        } else {
            None
        };
        let reader = PdfiumReader::new(extraction, ocr.is_some())?;

        CorpusExtractor::new(reader, PageExtractor::new(extraction, ocr)).run(&docs_dir, &output)
    })
    .await
    .map_err(|e| AppError::Pdf(format!("extraction task failed: {e}")))??;

    println!(
        "Extracted {} fragments from {} documents ({} failed, {} pages skipped)",
        report.fragments, report.documents, report.failed_documents, report.failed_pages
    );
    Ok(())
}

async fn index(config: &AppConfig) -> AppResult<()> {
    let embedder = FastEmbedder::new(&config.index.embedding_model)?;
    let normalizer = TextNormalizer::new(config.index.embed_char_cap)?;
    let builder = IndexBuilder::new(&embedder, &normalizer, config.index.embed_batch_size);

    let manifest = builder
        .build(
            &config.paths.chunks_path(),
            Path::new(&config.paths.output_dir),
            &config.index.table_name,
        )
        .await?;

    println!(
        "Indexed {} fragments ({} dims) into {}",
        manifest.fragment_count, manifest.dimension, config.paths.output_dir
    );
    Ok(())
}

async fn repl(state: &AppState<FastEmbedder>, k: Option<usize>) -> AppResult<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Ask a question (Ctrl+D to exit):");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match state.ask(question, k).await {
            Ok(response) => print_response(&response),
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

fn print_response(response: &AskResponse) {
    println!("\n=== ANSWER ===\n");
    println!("{}", response.answer);
    println!("\n=== TOP CONTEXTS ===\n");
    for (i, context) in response.contexts.iter().enumerate() {
        let fragment = &context.fragment;
        println!(
            "{}. [{}] {} p.{} ({:.3})",
            i + 1,
            fragment.kind.as_str(),
            fragment.doc_id,
            fragment.page,
            context.score
        );
    }
    println!();
}

async fn serve(config: &AppConfig, bind: Option<String>) -> AppResult<()> {
    let state: Arc<AppState<FastEmbedder>> = AppState::load(config).await?;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, fragments = state.fragment_count(), "Serving");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
