//! docent - chat with your documents from the terminal

mod commands;
mod config;
mod ui;
mod utils;

use anyhow::Context;
use clap::Parser;
use docent_api::{HttpBackend, LocalUpload};
use docent_core::{ChatEngine, ChatView, FolderIndex, ReplyEvent, Selection};
use futures::StreamExt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// docent - chat with your documents
#[derive(Parser, Debug)]
#[command(name = "docent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL (default: http://localhost:8000)
    #[arg(long)]
    api_url: Option<String>,

    /// User id sent with queries and uploads
    #[arg(long)]
    user_id: Option<Uuid>,

    /// Run in non-interactive mode with a single query
    #[arg(short = 'c', long, value_name = "QUERY")]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// List every file, grouped by folder
    #[arg(long)]
    files: bool,

    /// Upload local files into --folder
    #[arg(long, value_name = "PATH", num_args = 1.., requires = "folder")]
    upload: Vec<PathBuf>,

    /// Build the knowledge base for a file in --folder
    #[arg(long, value_name = "FILE_ID", requires = "folder")]
    index: Option<String>,

    /// Delete a file from --folder
    #[arg(long, value_name = "FILE_ID", requires = "folder")]
    delete: Option<String>,

    /// Folder for --upload, --index and --delete
    #[arg(long)]
    folder: Option<String>,

    /// Files to scope queries to (non-TUI modes)
    #[arg(long, value_name = "FILE_ID", num_args = 1..)]
    select: Vec<String>,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

impl Args {
    fn folder(&self) -> anyhow::Result<&str> {
        self.folder.as_deref().context("--folder is required")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("docent=debug")
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let api_url = cfg.api_url(args.api_url.clone());
    let user_id = cfg.user_id(args.user_id);
    let http = HttpBackend::new(&api_url);
    tracing::debug!("backend {} as user {}", http.base_url(), user_id);

    // File management commands run and exit
    if args.files {
        return list_files(&http).await;
    }
    if !args.upload.is_empty() {
        return upload_files(&http, user_id, args.folder()?, &args.upload).await;
    }
    if let Some(file_id) = &args.index {
        http.create_knowledge_base(user_id, file_id, args.folder()?)
            .await
            .with_context(|| format!("indexing {} failed", file_id))?;
        println!("Indexed {}", file_id);
        return Ok(());
    }
    if let Some(file_id) = &args.delete {
        http.delete_file(file_id, args.folder()?)
            .await
            .with_context(|| format!("deleting {} failed", file_id))?;
        println!("Deleted {}", file_id);
        return Ok(());
    }

    let engine = ChatEngine::new(Arc::new(http), cfg.pacing.to_pace_config(), user_id);
    let (view, idle_rx) = ChatView::new(cfg.scroll.to_scroll_config(), user_id);
    let mut view = match cfg.welcome.clone() {
        Some(text) => view.with_welcome(text),
        None => view,
    };

    // Single query mode
    if let Some(query) = &args.command {
        load_selection(&engine, &mut view, &args.select).await;
        return run_command(&engine, &mut view, query).await;
    }

    let use_tui = !args.no_tui && cfg.tui.unwrap_or(true);
    if use_tui {
        let theme = docent_tui::Theme::by_name(cfg.theme.as_deref().unwrap_or("dark"));
        let title = utils::url_host(&api_url).to_string();
        return ui::run_tui(&engine, view, idle_rx, theme, title).await;
    }

    load_selection(&engine, &mut view, &args.select).await;
    run_interactive(&engine, &mut view).await
}

async fn list_files(http: &HttpBackend) -> anyhow::Result<()> {
    let files = http
        .list_all_files()
        .await
        .context("listing files failed")?;
    let index = FolderIndex::build(&files);
    println!("{}", commands::tree_text(&index, &Selection::new()));
    Ok(())
}

async fn upload_files(
    http: &HttpBackend,
    user_id: Uuid,
    folder: &str,
    paths: &[PathBuf],
) -> anyhow::Result<()> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let upload = LocalUpload::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        uploads.push(upload);
    }

    let records = http
        .upload_files(user_id, folder, uploads)
        .await
        .context("upload failed")?;
    for record in &records {
        println!("Uploaded {} as {}", record.file_name, record.file_id);
    }
    println!("\nRun `docent --index <FILE_ID> --folder {}` to make them searchable.", folder);
    Ok(())
}

/// Load the file list and apply `--select`
async fn load_selection(engine: &ChatEngine, view: &mut ChatView, ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    view.set_files(engine.list_files().await);

    for id in ids {
        let Some(file) = view.files().iter().find(|f| &f.file_id == id).cloned() else {
            eprintln!("Warning: no file with id {}", id);
            continue;
        };
        if let Err(e) = view.toggle_file(&file) {
            eprintln!("Warning: cannot select {}: {}", id, e);
        }
    }
}

/// Stream one reply to stdout. Ctrl+C cancels the reply.
async fn print_reply(engine: &ChatEngine, view: &mut ChatView, query: &str) -> anyhow::Result<()> {
    let request = view.submit(query)?;
    let mut stream = engine.reply(request);
    let mut stdout = io::stdout();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = stream.next() => {
                let Some(event) = event else { break };
                match &event {
                    ReplyEvent::Delta(text) => {
                        print!("{}", text);
                        stdout.flush()?;
                    }
                    ReplyEvent::Finished => println!(),
                    ReplyEvent::Cancelled => println!("\n[cancelled]"),
                    ReplyEvent::Failed { reason, .. } => {
                        eprintln!("\nAn error occurred: {}", reason);
                    }
                    ReplyEvent::Opened => {}
                }
                view.apply(event);
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                engine.abort();
            }
        }
    }
    Ok(())
}

async fn run_command(engine: &ChatEngine, view: &mut ChatView, query: &str) -> anyhow::Result<()> {
    println!("docent> {}", query);
    println!();
    print_reply(engine, view, query).await
}

async fn run_interactive(engine: &ChatEngine, view: &mut ChatView) -> anyhow::Result<()> {
    // Show the greeting (only if TTY)
    if io::IsTerminal::is_terminal(&io::stderr()) {
        if let Some(welcome) = view.transcript().last() {
            eprintln!("{}", welcome.content);
        }
        if let Some(folder) = view.selection().active_folder() {
            eprintln!("Scoped to {} file(s) in {}", view.selection().len(), folder);
        }
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(result) = commands::execute_command(input, view) {
            match result {
                commands::CommandResult::Clear => {
                    view.clear_transcript();
                    println!("Cleared conversation.");
                }
                commands::CommandResult::Refresh => {
                    match engine.try_list_files().await {
                        Ok(files) => {
                            println!("{} file(s) available.", files.len());
                            view.set_files(files);
                        }
                        Err(e) => println!("Could not load files: {}", e),
                    }
                }
                commands::CommandResult::Message(msg) => {
                    println!("{}", msg);
                }
                commands::CommandResult::Exit => {
                    break;
                }
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        println!();
        print_reply(engine, view, input).await?;
        println!();
    }

    view.teardown();
    Ok(())
}
