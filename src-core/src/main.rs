use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use kalecheck_core::export::{record_csv, record_file_name, REPORT_FILE_NAME, SEGMENTED_FILE_NAME};
use kalecheck_core::history::{format_timestamp, HistoryClient, HistoryRecord, LocalHistory};
use kalecheck_core::upload::mime_from_name;
use kalecheck_core::{
    AnalyzeWorkflow, ClientConfig, HttpBackend, JsonFileStore, SessionToken, UploadFile,
};

const STORE_FILE: &str = "store.json";

#[derive(Parser)]
#[command(name = "kalecheck-cli")]
#[command(version, about = "Kale weight-loss analysis from the command line")]
struct Cli {
    /// TOML file overriding the built-in endpoints
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict weight loss for an image and save it to local history
    Analyze {
        image: PathBuf,

        /// Letterbox and remove the background first
        #[arg(long)]
        remove_background: bool,

        /// Write the CSV report here (a directory gets analysis_report.csv)
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Remove the background of an image
    Segment {
        image: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Store a session token for the history commands
    Login {
        #[arg(long)]
        token: String,
    },
    Logout,
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// Records saved on this machine
    Local,
    ClearLocal,
    /// Records saved on the server for the signed-in user
    Remote,
    /// Show one server record by id
    Show { id: String },
    /// Write one record's CSV report, looking locally before the server
    Export {
        id: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a server record by id
    Delete { id: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    kalecheck_core::init_tracing();
    let cli = Cli::parse();

    let config = ClientConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let store_path = config.resolve_data_dir()?.join(STORE_FILE);
    let store = JsonFileStore::open(&store_path)
        .with_context(|| format!("Failed to open store at {:?}", store_path))?;

    match cli.command {
        Commands::Analyze {
            image,
            remove_background,
            csv,
        } => analyze(config, &store, &image, remove_background, csv.as_deref()).await,
        Commands::Segment { image, output } => segment(config, &store, &image, output).await,
        Commands::History { command } => history(config, &store, command).await,
        Commands::Login { token } => {
            let token = SessionToken::issue(token)?;
            token.save(&store)?;
            println!("Signed in until {}", token.expires_at().format("%Y-%m-%d %H:%M UTC"));
            Ok(())
        }
        Commands::Logout => {
            SessionToken::clear(&store)?;
            println!("Signed out");
            Ok(())
        }
    }
}

fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Image path has no file name")?
        .to_string();
    let mime = mime_from_name(&name);
    Ok(UploadFile::new(name, mime, bytes))
}

fn print_progress(value: u8) {
    eprint!("\r{:>3}%", value);
}

async fn analyze(
    config: ClientConfig,
    store: &JsonFileStore,
    image: &Path,
    remove_background: bool,
    csv: Option<&Path>,
) -> Result<()> {
    let token = SessionToken::load(store)?;
    let backend = HttpBackend::new(config)?.with_token(token);
    let mut flow = AnalyzeWorkflow::new(backend, store).on_progress(print_progress);

    let file = read_upload(image)?;
    if remove_background {
        flow.select_for_segmentation(file)?;
        flow.remove_background().await?;
        eprintln!();
        flow.continue_to_analysis(Utc::now())?;
    } else {
        flow.select_for_analysis(file)?;
    }

    let record = flow.analyze().await?;
    eprintln!();
    print_record(&record);

    if let Some(target) = csv {
        let target = if target.is_dir() {
            target.join(REPORT_FILE_NAME)
        } else {
            target.to_path_buf()
        };
        std::fs::write(&target, flow.export_csv()?)
            .with_context(|| format!("Failed to write {:?}", target))?;
        println!("Report written to {}", target.display());
    }
    Ok(())
}

async fn segment(
    config: ClientConfig,
    store: &JsonFileStore,
    image: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let backend = HttpBackend::new(config)?;
    let mut flow = AnalyzeWorkflow::new(backend, store).on_progress(print_progress);
    flow.select_for_segmentation(read_upload(image)?)?;
    let processed = flow.remove_background().await?;
    eprintln!();

    let output = output.unwrap_or_else(|| PathBuf::from(SEGMENTED_FILE_NAME));
    std::fs::write(&output, &processed.bytes)
        .with_context(|| format!("Failed to write {:?}", output))?;
    println!("Saved {}", output.display());
    Ok(())
}

async fn history(
    config: ClientConfig,
    store: &JsonFileStore,
    command: HistoryCommands,
) -> Result<()> {
    match command {
        HistoryCommands::Local => {
            let records = LocalHistory::new(store).list()?;
            if records.is_empty() {
                println!("No local history yet.");
            }
            records.iter().for_each(print_record);
        }
        HistoryCommands::ClearLocal => {
            LocalHistory::new(store).clear()?;
            println!("Local history cleared");
        }
        HistoryCommands::Remote => {
            let client = HistoryClient::new(config, SessionToken::load(store)?)?;
            let records = client.list().await?;
            if records.is_empty() {
                println!("No prediction history found.");
            }
            records.iter().for_each(print_record);
        }
        HistoryCommands::Show { id } => {
            let client = HistoryClient::new(config, SessionToken::load(store)?)?;
            let record = client
                .get(&id)
                .await
                .with_context(|| format!("Failed to load {}", id))?;
            print_record(&record);
        }
        HistoryCommands::Export { id, output } => {
            let record = match LocalHistory::new(store).get(&id)? {
                Some(record) => record,
                None => HistoryClient::new(config, SessionToken::load(store)?)?
                    .get(&id)
                    .await
                    .with_context(|| format!("Failed to load {}", id))?,
            };
            let target = output.unwrap_or_else(|| PathBuf::from(record_file_name(&record.id)));
            std::fs::write(&target, record_csv(&record)?)
                .with_context(|| format!("Failed to write {:?}", target))?;
            println!("Report written to {}", target.display());
        }
        HistoryCommands::Delete { id } => {
            let client = HistoryClient::new(config, SessionToken::load(store)?)?;
            if let Err(e) = client.delete(&id).await {
                bail!("Failed to delete {}: {}", id, e);
            }
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

fn print_record(record: &HistoryRecord) {
    let (date, time) = format_timestamp(record.timestamp.as_ref());
    println!(
        "{}  {} {}  {}  {:.2}% weight loss",
        record.id, date, time, record.image_name, record.percentage_weight_loss
    );
    for (name, value) in &record.features {
        println!("    {:<24} {:.2}", name, value);
    }
}
