use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use kvfs::{BackendConfig, BackendRegistry, FileData, FileStore, FsConfig, Metadata};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kvfs")]
#[command(about = "Chunked virtual files on top of a key/value store", long_about = None)]
struct Cli {
    /// YAML configuration file; overrides --data-dir.
    #[arg(long, global = true, value_name = "CONFIG_YAML")]
    config: Option<PathBuf>,

    /// Directory of the local backend (defaults to the user data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "BYTES")]
    chunk_size: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List all files")]
    Ls,
    #[command(about = "Show the catalog record of a file")]
    Stat {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(about = "Create a file or replace its metadata")]
    Create {
        #[arg(value_name = "NAME")]
        name: String,
        /// Metadata as a JSON object.
        #[arg(long, value_name = "JSON")]
        meta: Option<String>,
    },
    #[command(about = "Delete a file and its chunks")]
    Rm {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(about = "Save a local file as the whole content of NAME")]
    Put {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "PATH")]
        path: PathBuf,
        /// Store as text instead of binary.
        #[arg(long)]
        text: bool,
    },
    #[command(about = "Print the whole content of a saved file")]
    Cat {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(about = "Write a local file's bytes at OFFSET")]
    Write {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "OFFSET")]
        offset: u64,
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    #[command(about = "Append a local file's bytes")]
    Append {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    #[command(about = "Print bytes [START, END) of a file")]
    Read {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "START")]
        start: u64,
        #[arg(value_name = "END")]
        end: u64,
    },
    #[command(about = "Remove every file; requires the confirmation token")]
    Reset {
        #[arg(value_name = "TOKEN")]
        token: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<FsConfig> {
    let mut config = match &cli.config {
        Some(path) => FsConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let root = match &cli.data_dir {
                Some(dir) => dir.clone(),
                None => dirs::data_local_dir()
                    .context("no local data directory; pass --data-dir")?
                    .join("kvfs"),
            };
            FsConfig {
                backend: BackendConfig::LocalFs { root },
                ..FsConfig::default()
            }
        }
    };
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    config.validate()?;
    Ok(config)
}

async fn write_stdout(bytes: &[u8]) -> anyhow::Result<()> {
    let mut out = tokio::io::stdout();
    out.write_all(bytes).await?;
    out.flush().await?;
    Ok(())
}

async fn run(store: &FileStore, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ls => {
            for name in store.list_files().await? {
                println!("{name}");
            }
        }
        Commands::Stat { name } => {
            let record = store.get_file_metadata(&name).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Create { name, meta } => {
            let metadata = match meta {
                Some(raw) => {
                    let parsed: Metadata = serde_json::from_str(&raw)
                        .context("--meta must be a JSON object")?;
                    Some(parsed)
                }
                None => None,
            };
            store.create_file(&name, metadata).await?;
        }
        Commands::Rm { name } => store.delete_file(&name).await?,
        Commands::Put { name, path, text } => {
            let data = if text {
                FileData::Text(tokio::fs::read_to_string(&path).await?)
            } else {
                FileData::Binary(tokio::fs::read(&path).await?)
            };
            store.save_file(&name, data).await?;
        }
        Commands::Cat { name } => match store.load_file(&name).await? {
            FileData::Text(s) => write_stdout(s.as_bytes()).await?,
            FileData::Binary(b) => write_stdout(&b).await?,
        },
        Commands::Write { name, offset, path } => {
            let data = tokio::fs::read(&path).await?;
            store.set_bytes(&name, data, offset).await?;
        }
        Commands::Append { name, path } => {
            let data = tokio::fs::read(&path).await?;
            store.append_bytes(&name, data).await?;
        }
        Commands::Read { name, start, end } => {
            if end < start {
                bail!("END must not be smaller than START");
            }
            let bytes = store.get_bytes(&name, start, end).await?;
            write_stdout(&bytes).await?;
        }
        Commands::Reset { token } => store.reset_all(&token).await?,
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let registry = BackendRegistry::new();
    let store = FileStore::with_registry(&config, &registry).await?;

    let result = run(&store, cli.command).await;
    registry.shutdown().await;
    result
}
