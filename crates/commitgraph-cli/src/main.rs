use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use commitgraph_core::{CommitRecord, GraphLayout, LayoutEngine, Palette};
use crossterm::style::{Color, Stylize};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod decoration;
mod error;
mod git;
mod log_parser;
mod search;
mod text_graph;
mod tui;

use crate::config::{AppConfig, ConfigStore};
use crate::git::{GitRunner, LogQuery};
use crate::text_graph::{GraphStyle, row_cells, row_text};

#[derive(Debug, Parser)]
#[command(name = "commitgraph")]
#[command(about = "Commit graph layout and terminal viewer", long_about = None)]
struct Cli {
    /// Configuration file. Defaults to `config.toml` in the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the lane layout as JSON.
    Layout(LayoutCmd),
    /// Print the history with a text graph.
    Log(LogCmd),
    /// Interactive viewer.
    Tui(TuiCmd),
    Config(ConfigCmd),
}

#[derive(Debug, Args)]
struct SourceArgs {
    #[arg(long, conflicts_with = "input")]
    repo: Option<PathBuf>,
    /// JSON array of commit records, newest first, instead of `git log`.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long)]
    skip: Option<usize>,
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Args)]
struct LayoutCmd {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Args)]
struct LogCmd {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long, value_enum, default_value_t = GraphStyle::Unicode)]
    style: GraphStyle,
    /// Color lanes with the configured palette.
    #[arg(long)]
    color: bool,
}

#[derive(Debug, Default, Args)]
struct TuiCmd {
    #[arg(long)]
    repo: Option<PathBuf>,
    #[arg(long)]
    page_size: Option<usize>,
    #[arg(long)]
    all: bool,
    /// Append logs to this file. Logging is off otherwise.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum ConfigSubcommand {
    Path,
    Show,
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct ConfigCmd {
    #[command(subcommand)]
    subcommand: ConfigSubcommand,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Tui(TuiCmd::default()));
    init_tracing(&command)?;
    run(cli.config, command)
}

fn init_tracing(command: &Commands) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match command {
        // The alternate screen owns stdout and stderr.
        Commands::Tui(cmd) => {
            let Some(path) = cmd.log_file.as_ref() else {
                return Ok(());
            };
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow!("failed to initialize logging: {err}"))
        }
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize logging: {err}")),
    }
}

fn run(config_path: Option<PathBuf>, command: Commands) -> Result<()> {
    let store = ConfigStore::resolve(config_path).context("failed to resolve config path")?;

    match command {
        Commands::Layout(cmd) => {
            let config = store.load()?;
            let runner = GitRunner::new(config.source.git_binary.clone());
            let records = load_records(&runner, &config, &cmd.source)?;
            let layout = layout_records(&config, &records);
            let json = if cmd.pretty {
                serde_json::to_string_pretty(&layout)?
            } else {
                serde_json::to_string(&layout)?
            };
            println!("{json}");
        }
        Commands::Log(cmd) => {
            let config = store.load()?;
            let runner = GitRunner::new(config.source.git_binary.clone());
            let records = load_records(&runner, &config, &cmd.source)?;
            let layout = layout_records(&config, &records);
            let palette = cmd.color.then_some(&config.render.palette);
            print_log(&records, &layout, cmd.style, palette).context("failed to write log")?;
        }
        Commands::Tui(cmd) => {
            let config = store.load()?;
            let runner = GitRunner::new(config.source.git_binary.clone());
            let repo = resolve_repo(&runner, cmd.repo)?;
            let page_size = cmd.page_size.unwrap_or(config.source.page_size);
            if page_size == 0 {
                bail!("--page-size must be >= 1");
            }
            let query = LogQuery {
                all_refs: cmd.all,
                ..LogQuery::page(page_size, 0)
            };
            tui::run(
                runner,
                tui::TuiConfig {
                    repo: repo.clone(),
                    query,
                    layout: config.layout,
                    render: config.render.clone(),
                },
            )
            .with_context(|| format!("failed running TUI for {}", repo.display()))?;
        }
        Commands::Config(cmd) => match cmd.subcommand {
            ConfigSubcommand::Path => println!("{}", store.path().display()),
            ConfigSubcommand::Show => {
                let config = store.load()?;
                print!(
                    "{}",
                    toml::to_string_pretty(&config).context("failed to serialize config")?
                );
            }
            ConfigSubcommand::Init { force } => {
                store.init(force)?;
                println!("wrote {}", store.path().display());
            }
        },
    }

    Ok(())
}

fn load_records(
    runner: &GitRunner,
    config: &AppConfig,
    source: &SourceArgs,
) -> Result<Vec<CommitRecord>> {
    let skip = source.skip.unwrap_or(0);
    if let Some(path) = source.input.as_ref() {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read records from {}", path.display()))?;
        let records: Vec<CommitRecord> = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse commit records in {}", path.display()))?;
        let limit = source.limit.unwrap_or(usize::MAX);
        return Ok(records.into_iter().skip(skip).take(limit).collect());
    }

    let repo = resolve_repo(runner, source.repo.clone())?;
    let query = LogQuery {
        all_refs: source.all,
        ..LogQuery::page(source.limit.unwrap_or(config.source.page_size), skip)
    };
    runner
        .load_page(&repo, &query)
        .with_context(|| format!("failed to read history of {}", repo.display()))
}

fn layout_records(config: &AppConfig, records: &[CommitRecord]) -> GraphLayout {
    let layout = LayoutEngine::new(config.layout).compute(records, &mut |diagnostic| {
        warn!(%diagnostic, "commit record not laid out as given");
    });
    debug!(
        rows = layout.row_count(),
        max_columns = layout.max_columns,
        edges = layout.edges.len(),
        "computed layout"
    );
    layout
}

fn print_log(
    records: &[CommitRecord],
    layout: &GraphLayout,
    style: GraphStyle,
    palette: Option<&Palette>,
) -> io::Result<()> {
    let width = layout.max_columns.max(1) * 2 - 1;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (record, row) in records.iter().zip(&layout.rows) {
        let Some(assignment) = row else {
            writeln!(out, "{:width$}  (skipped record)", "")?;
            continue;
        };
        let graph_width = match palette {
            None => {
                let text = row_text(assignment, layout.max_columns, style);
                write!(out, "{text}")?;
                text.chars().count()
            }
            Some(palette) => {
                let cells = row_cells(assignment, layout.max_columns, style);
                for cell in &cells {
                    match cell.color {
                        Some(color) => {
                            let rgb = palette.color(color);
                            let color = Color::Rgb {
                                r: rgb.r,
                                g: rgb.g,
                                b: rgb.b,
                            };
                            write!(out, "{}", cell.ch.with(color))?;
                        }
                        None => write!(out, "{}", cell.ch)?,
                    }
                }
                cells.len()
            }
        };
        let padding = width.saturating_sub(graph_width);
        let refs = decoration::label(&record.meta.refs);
        let refs = if refs.is_empty() {
            refs
        } else {
            format!(" ({refs})")
        };
        writeln!(
            out,
            "{:padding$}  {}{} {}",
            "",
            record.display_hash(),
            refs,
            record.meta.subject
        )?;
    }
    out.flush()
}

fn resolve_repo(runner: &GitRunner, cli_repo: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(repo) = cli_repo {
        runner
            .validate_repo(&repo)
            .with_context(|| format!("{} is not a git repository", repo.display()))?;
        return runner
            .discover_repo_root(&repo)
            .with_context(|| format!("failed to resolve repository root of {}", repo.display()));
    }

    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    runner.discover_repo_root(&cwd).map_err(|err| {
        anyhow!(
            "current directory is not a git repository (pass --repo, or run `commitgraph` inside a git repo): {err}"
        )
    })
}
