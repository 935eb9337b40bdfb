//! OrgGist — command-line client for the OrgGist knowledge base.

use std::io::{Read, Write};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use orggist_chat::{QueryOptions, QueryStreamConsumer, Role};
use orggist_core::{ClientConfig, UploadPolicy, UserContext};
use orggist_ingest::{IngestionOrchestrator, SelectedFile, SubmitOutcome};

fn print_help() {
    println!("OrgGist — query and ingest your knowledge base");
    println!();
    println!("Usage: orggist <command> [args]");
    println!();
    println!("Commands:");
    println!("  ask <question> [--web-search] [--threshold <f>]");
    println!("                           Stream an answer to the question");
    println!("  upload <file>...         Upload documents for indexing");
    println!("  paste <text|->           Ingest pasted text ('-' reads stdin)");
    println!("  help                     Show this help message");
    println!();
    println!("Environment:");
    println!("  ORGGIST_QUERY_URL, ORGGIST_UPLOAD_URL, ORGGIST_PROCESS_URL,");
    println!("  ORGGIST_TEXT_URL       Backend endpoints");
    println!("  ORGGIST_USER           Username for text ingestion");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("ask") => cmd_ask(&args[1..]).await,
        Some("upload") => cmd_upload(&args[1..]).await,
        Some("paste") => cmd_paste(&args[1..]).await,
        Some("--help") | Some("-h") | Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {}. Use 'orggist help' for usage.", other);
            std::process::exit(1);
        }
    }
}

async fn cmd_ask(args: &[String]) -> anyhow::Result<()> {
    let mut question: Option<String> = None;
    let mut options = QueryOptions::default();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--web-search" => options.web_search = true,
            "--threshold" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--threshold requires a value"))?;
                options.similarity_threshold = value.parse()?;
            }
            q => question = Some(q.to_string()),
        }
    }
    let question = question.ok_or_else(|| anyhow::anyhow!("Usage: orggist ask <question>"))?;

    let consumer = Arc::new(QueryStreamConsumer::new(ClientConfig::from_env()));
    let mut updates = consumer.subscribe();

    // Print only the unprinted suffix of each full-content snapshot.
    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if let Some(last) = snapshot.last() {
                if last.role != Role::Assistant {
                    continue;
                }
                // An error overwrite can replace rather than extend the
                // content; only print when the snapshot extends what we have.
                match last.content.get(printed..) {
                    Some(suffix) if !suffix.is_empty() => {
                        print!("{}", suffix);
                        std::io::stdout().flush().ok();
                        printed = last.content.len();
                    }
                    _ => {}
                }
            }
        }
    });

    let result = consumer.submit(&question, options).await;
    drop(consumer); // closes the snapshot channel so the printer exits
    printer.await?;
    println!();
    result?;
    Ok(())
}

async fn cmd_upload(args: &[String]) -> anyhow::Result<()> {
    if args.is_empty() {
        anyhow::bail!("Usage: orggist upload <file>...");
    }

    let orchestrator = IngestionOrchestrator::new(
        ClientConfig::from_env(),
        UploadPolicy::default(),
        user_from_env(),
    );

    let mut selected = Vec::new();
    for path in args {
        let path = std::path::Path::new(path);
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        selected.push(SelectedFile::new(name, content_kind(path), bytes));
    }
    orchestrator.select_files(selected);

    let outcome = orchestrator.submit_queue().await;
    for item in orchestrator.queue().snapshot().iter() {
        match &item.error {
            Some(error) => println!("  {}: {:?} ({})", item.name, item.status, error),
            None => println!("  {}: {:?}", item.name, item.status),
        }
    }

    match outcome? {
        SubmitOutcome::FilesProcessed { count } => {
            println!("{} file(s) uploaded and processed.", count);
        }
        SubmitOutcome::FilesStoredProcessingDegraded { count } => {
            println!(
                "{} file(s) uploaded, but processing failed; search may be degraded.",
                count
            );
        }
        SubmitOutcome::TextIngested => {}
    }
    Ok(())
}

async fn cmd_paste(args: &[String]) -> anyhow::Result<()> {
    let text = match args.first().map(String::as_str) {
        Some("-") => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        Some(text) => text.to_string(),
        None => anyhow::bail!("Usage: orggist paste <text|->"),
    };

    let orchestrator = IngestionOrchestrator::new(
        ClientConfig::from_env(),
        UploadPolicy::default(),
        user_from_env(),
    );
    orchestrator.set_text(text);
    orchestrator.submit_queue().await?;
    println!("Text ingested.");
    Ok(())
}

fn user_from_env() -> UserContext {
    UserContext::new(std::env::var("ORGGIST_USER").unwrap_or_else(|_| "Test User".to_string()))
}

fn content_kind(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("pdf") => "application/pdf",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}
