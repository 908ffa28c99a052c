use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use inkedit_core::{BufferSurface, LocalHostFs};
use inkedit_project::SessionStore;
use inkedit_search::{is_blank_query, search_tree, SearchReport};
use inkedit_settings::{AppPaths, AppSettings, SettingsStore};
use inkedit_workbench::{ConsoleLog, Coordinator};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "inkedit",
    about = "Headless commands for InkEdit workspaces",
    author,
    version
)]
struct Cli {
    /// 設定檔資料夾；預設為系統設定目錄。 / Configuration directory (defaults to the platform config dir).
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,
    /// 輸出除錯紀錄。 / Print debug logs to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 搜尋資料夾內的文字檔。 / Search text files below a folder.
    Search(SearchArgs),
    /// 檢視或還原工作階段。 / Inspect or restore the persisted session.
    #[command(subcommand)]
    Session(SessionCommand),
    /// 開啟檔案並記錄為工作階段。 / Open files headlessly and persist them as the session.
    Open(OpenArgs),
    /// 檢視或修改偏好設定。 / Show or change settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args)]
struct SearchArgs {
    /// 要搜尋的文字（區分大小寫）。 / Literal, case-sensitive text to find.
    query: String,
    /// 搜尋的根目錄；預設為目前目錄。 / Folder to search (defaults to the current directory).
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// 以 JSON 顯示工作階段紀錄。 / Print the session record as JSON.
    Show,
    /// 檢查紀錄中的路徑是否仍存在。 / Report which recorded paths still exist.
    Validate,
    /// 還原工作階段並列出分頁。 / Restore the session and list its tabs.
    Restore,
}

#[derive(Args)]
struct OpenArgs {
    /// 要開啟的檔案。 / Files to open, in tab order.
    files: Vec<PathBuf>,
    /// 同時開啟的資料夾。 / Folder to root the explorer at.
    #[arg(long, value_name = "DIR")]
    folder: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// 顯示所有設定。 / Print every setting.
    Show,
    /// 修改單一設定。 / Change one setting.
    Set { key: String, value: String },
    /// 切換亮色與暗色主題。 / Switch between the light and dark theme.
    ToggleTheme,
    /// 還原預設值。 / Restore the defaults.
    Reset,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        config_dir,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);

    let config_dir = config_dir.map(|dir| resolve_input_path(&dir)).transpose()?;
    let paths = AppPaths::resolve(config_dir.as_deref());
    debug!(config_dir = %paths.config_dir().display(), "resolved configuration");

    match command {
        Commands::Search(args) => block_on(execute_search(args)),
        Commands::Session(command) => block_on(execute_session_command(command, &paths)),
        Commands::Open(args) => block_on(execute_open(args, &paths)),
        Commands::Settings(command) => execute_settings_command(command, &paths),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("inkedit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inkedit=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn block_on<F: Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(future)
}

async fn execute_search(args: SearchArgs) -> Result<()> {
    if is_blank_query(&args.query) {
        println!("Nothing to search.");
        return Ok(());
    }
    let root = match args.root {
        Some(root) => resolve_input_path(&root)?,
        None => std::env::current_dir().context("failed to determine current directory")?,
    };
    if !root.is_dir() {
        bail!("{} is not a folder", root.display());
    }

    let host = LocalHostFs::new();
    let matches = search_tree(&host, &root, &args.query).await?;
    let report = SearchReport::new(args.query, matches);
    if report.is_empty() {
        println!("No matches found.");
        return Ok(());
    }
    print_search_report(&report);
    Ok(())
}

fn print_search_report(report: &SearchReport) {
    let summary = report.summary();
    println!(
        "Search \"{}\" ({} hits in {} files)",
        report.query, summary.total_matches, summary.files_with_matches
    );
    for file in &report.files {
        println!("  {} ({} hits)", file.file_path.display(), file.matches.len());
        for m in &file.matches {
            println!(
                "    Line {} (Col {}): {}",
                m.line_number,
                m.match_start + 1,
                m.line_text
            );
        }
    }
}

async fn execute_session_command(command: SessionCommand, paths: &AppPaths) -> Result<()> {
    let host = LocalHostFs::new();
    let session_file = paths.session_file();
    match command {
        SessionCommand::Show => {
            let store = SessionStore::new(&session_file);
            let record = store
                .load(&host)
                .await
                .with_context(|| format!("failed to read {}", session_file.display()))?
                .unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        SessionCommand::Validate => {
            let report = SessionStore::new(&session_file).validate(&host).await;
            println!("Session valid: {}", if report.is_valid { "yes" } else { "no" });
            match &report.folder {
                Some(folder) => println!("Folder: {}", folder.display()),
                None => println!("Folder: (none)"),
            }
            println!("Files: {}", report.valid_files.len());
            for file in &report.valid_files {
                println!("  {}", file.display());
            }
            match &report.active_file {
                Some(active) => println!("Active: {}", active.display()),
                None => println!("Active: (none)"),
            }
        }
        SessionCommand::Restore => {
            let workbench = Coordinator::new(host, BufferSurface::new(), &session_file);
            let outcome = workbench.restore_session().await;
            if !outcome.restored {
                println!("No session to restore.");
                return Ok(());
            }
            if let Some(root) = workbench.explorer().root_path() {
                println!("Folder: {}", root.display());
            }
            for doc in workbench.documents().all() {
                let marker = if doc.is_active() { "* " } else { "  " };
                match doc.path() {
                    Some(path) => println!("{marker}{} ({})", doc.label(), path.display()),
                    None => println!("{marker}{}", doc.label()),
                }
            }
            for skipped in &outcome.skipped {
                eprintln!("warning: could not read {}", skipped.display());
            }
        }
    }
    Ok(())
}

async fn execute_open(args: OpenArgs, paths: &AppPaths) -> Result<()> {
    if args.files.is_empty() && args.folder.is_none() {
        bail!("nothing to open; pass files or --folder");
    }
    let workbench = Coordinator::new(LocalHostFs::new(), BufferSurface::new(), paths.session_file());

    if let Some(folder) = &args.folder {
        let folder = resolve_input_path(folder)?;
        let opened = workbench.open_folder(&folder).await;
        if let Err(err) = opened {
            print_console(&workbench.console());
            return Err(err).with_context(|| format!("failed to open {}", folder.display()));
        }
    }
    for file in &args.files {
        let file = resolve_input_path(file)?;
        let opened = workbench.open_path(&file).await;
        if let Err(err) = opened {
            print_console(&workbench.console());
            return Err(err).with_context(|| format!("failed to open {}", file.display()));
        }
    }
    print_console(&workbench.console());
    Ok(())
}

fn print_console(console: &ConsoleLog) {
    for entry in console.entries() {
        println!("{entry}");
    }
}

fn execute_settings_command(command: SettingsCommand, paths: &AppPaths) -> Result<()> {
    let settings_file = paths.settings_file();
    let mut store = SettingsStore::load(&settings_file)?;
    match command {
        SettingsCommand::Show => print_settings(store.settings()),
        SettingsCommand::Set { key, value } => {
            store.set_value(&key, &value)?;
            let current = store.settings().value_of(&key).unwrap_or(value);
            println!("{key} = {current}");
        }
        SettingsCommand::ToggleTheme => {
            let theme = store.toggle_theme()?;
            println!("theme = {theme}");
        }
        SettingsCommand::Reset => {
            store.reset()?;
            println!("Settings reset to defaults.");
        }
    }
    Ok(())
}

fn print_settings(settings: &AppSettings) {
    for key in AppSettings::KEYS {
        if let Some(value) = settings.value_of(key) {
            println!("{key} = {value}");
        }
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
