use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vocabcontext_core::DEFAULT_QUEUE_LIMIT;

#[derive(Debug, Clone, ValueEnum)]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "vocabcontext", version, about = "VocabContext spaced-repetition CLI/TUI/API")]
pub struct Cli {
    /// Storage backend
    #[arg(long, value_enum, env = "VOCABCONTEXT_STORE", default_value_t = StoreKind::Json, global = true)]
    pub store: StoreKind,

    /// SQLite DB path when --store sqlite (defaults to the data dir)
    #[arg(long, env = "VOCABCONTEXT_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Directory for the JSON store, backups and default SQLite file
    #[arg(long, env = "VOCABCONTEXT_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log filter, e.g. "info" or "vocabcontext_json=debug"
    #[arg(long, env = "VOCABCONTEXT_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Introduce new items
    Add(AddCmd),
    /// Print the current review queue
    Queue(QueueCmd),
    /// Interactive review loop
    Review(QueueCmd),
    /// Mark an item as "don't know"
    Forget { item: String },
    /// Remove an item's "don't know" mark
    Unforget { item: String },
    /// Delete an item's review state
    Reset { item: String },
    /// Study load, today's results and streak
    Stats(StatsCmd),
    /// Export progress
    #[command(subcommand)]
    Export(ExportCmd),
    /// Import progress (replaces what is stored)
    #[command(subcommand)]
    Import(ImportCmd),
    /// Launch Terminal UI
    Tui(QueueCmd),
    /// Launch Axum HTTP API
    Api(ApiCmd),
}

#[derive(Debug, Args, Clone)]
pub struct AddCmd {
    pub items: Vec<String>,
    /// File with one item id per line; blank lines and `#` comments are skipped
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct QueueCmd {
    #[arg(long, default_value_t = DEFAULT_QUEUE_LIMIT)]
    pub limit: usize,
}

#[derive(Debug, Args, Clone)]
pub struct StatsCmd {
    /// Days shown in the history chart
    #[arg(long, default_value_t = vocabcontext_core::DEFAULT_RECENT_DAYS)]
    pub days: u32,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ExportCmd {
    Json { path: PathBuf },
    Csv { path: PathBuf },
}

#[derive(Debug, Subcommand, Clone)]
pub enum ImportCmd {
    Json { path: PathBuf },
}

#[derive(Debug, Args, Clone)]
pub struct ApiCmd {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,
}
