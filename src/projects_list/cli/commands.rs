//! # CLI Layer
//!
//! One possible client of the library: it plays the host. Each invocation
//! loads one table, applies at most one "click" and renders the result.
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Handles argument parsing
//! - Installs the tracing subscriber
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `init_context()`: Loads configuration and opens the vault
//! - `handle_*()`: Per-command handlers that drive a `TableController`

use super::render::{print_info, render_json, render_table, RenderOptions};
use super::setup::{Cli, Commands, TableArgs};
use clap::Parser;
use projects_list::config::{global_config_path, ProjectsListConfig, VAULT_CONFIG_FILE};
use projects_list::controller::TableController;
use projects_list::error::{ProjectsListError, Result};
use projects_list::source::parse_names;
use projects_list::store::fs::FsStore;
use projects_list::store::DocumentStore;
use projects_list::view::PageView;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct AppContext {
    vault: PathBuf,
    config: ProjectsListConfig,
    render: RenderOptions,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let ctx = init_context(&cli)?;

    match cli.command {
        Commands::Show { table, json } => handle_show(&ctx, &table, json),
        Commands::Sort { table, column } => {
            let mut controller = open_table(&ctx, &table)?;
            let view = controller.click_column(column);
            print_table(&ctx, &controller, &view);
            Ok(())
        }
        Commands::PageSize { table, size } => {
            let mut controller = open_table(&ctx, &table)?;
            let view = controller.set_page_size(size)?;
            print_table(&ctx, &controller, &view);
            Ok(())
        }
        Commands::Next { table } => handle_step(&ctx, &table, Step::Next),
        Commands::Prev { table } => handle_step(&ctx, &table, Step::Prev),
        Commands::Path { table, row } => {
            let controller = open_table(&ctx, &table)?;
            let id = controller.path_of_row(row)?;
            let path = controller.store().path_of(&id).unwrap_or_else(|| PathBuf::from(&id));
            println!("{}", path.display());
            Ok(())
        }
        Commands::Watch { table, ticks } => handle_watch(&ctx, &table, ticks),
        Commands::Config { template } => handle_config(&ctx, template),
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "projects_list=debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let vault = match &cli.vault {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let config = ProjectsListConfig::load(&vault)?;
    let render = RenderOptions {
        date_style: config.date_style,
        use_color: std::io::stdout().is_terminal(),
    };
    Ok(AppContext {
        vault,
        config,
        render,
    })
}

/// Resolves the host and loads the table. Names come from `--names` when
/// given, otherwise from the host's input block.
fn open_table(ctx: &AppContext, args: &TableArgs) -> Result<TableController<FsStore>> {
    let store = FsStore::new(&ctx.vault, &ctx.config.extensions);
    let host_id = resolve_host(&store, &args.host)?;

    let controller = match &args.names {
        Some(names) => TableController::new(store, host_id, parse_names(names)),
        None => TableController::new(store, host_id, Vec::new())
            .with_input_block(&ctx.config.block_language),
    };
    let mut controller = controller.with_default_page_size(ctx.config.default_page_size);
    controller.load()?;
    tracing::debug!(host = %controller.host_id(), names = ?controller.names(), "Opened table");
    Ok(controller)
}

/// Accepts a vault-relative path, or a basename that matches exactly one document.
fn resolve_host(store: &FsStore, host: &str) -> Result<String> {
    if store.path_of(host).is_some_and(|p| p.is_file()) {
        return Ok(host.to_string());
    }
    let matches: Vec<String> = store
        .list_documents()?
        .into_iter()
        .filter(|doc| doc.basename == host)
        .map(|doc| doc.id)
        .collect();
    match matches.as_slice() {
        [id] => Ok(id.clone()),
        [] => Err(ProjectsListError::DocumentNotFound(host.to_string())),
        _ => Err(ProjectsListError::Api(format!(
            "'{}' matches several documents ({}); use a vault-relative path",
            host,
            matches.join(", ")
        ))),
    }
}

fn handle_show(ctx: &AppContext, table: &TableArgs, json: bool) -> Result<()> {
    let controller = open_table(ctx, table)?;
    let view = controller.view();
    if json {
        println!("{}", render_json(&view, controller.state())?);
    } else {
        print_table(ctx, &controller, &view);
    }
    Ok(())
}

enum Step {
    Next,
    Prev,
}

fn handle_step(ctx: &AppContext, table: &TableArgs, step: Step) -> Result<()> {
    let mut controller = open_table(ctx, table)?;
    let moved = match step {
        Step::Next => controller.next_page(),
        Step::Prev => controller.prev_page(),
    };
    match moved {
        Some(view) => print_table(ctx, &controller, &view),
        None => {
            print_table(ctx, &controller, &controller.view());
            match step {
                Step::Next => print_info("Already on the last page."),
                Step::Prev => print_info("Already on the first page."),
            }
        }
    }
    Ok(())
}

/// Blocks on change events. Every `poll_interval_ms` without one, the store
/// is polled in case its watcher could not start.
fn handle_watch(ctx: &AppContext, table: &TableArgs, ticks: Option<usize>) -> Result<()> {
    let mut controller = open_table(ctx, table)?;
    print_table(ctx, &controller, &controller.view());

    let (tx, rx) = mpsc::channel();
    controller.subscribe(&tx);
    if !controller.store().is_watching() {
        tracing::info!("Polling for changes every {} ms", ctx.config.poll_interval_ms);
    }
    let interval = Duration::from_millis(ctx.config.poll_interval_ms);

    let mut remaining = ticks;
    while remaining != Some(0) {
        let first = match rx.recv_timeout(interval) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => {
                controller.store().poll_changes()?;
                None
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        // Each notification is its own full reload; the last one printed wins.
        let pending: Vec<_> = first.into_iter().chain(rx.try_iter()).collect();
        for event in pending {
            match controller.on_document_changed(&event.id) {
                Ok(view) => {
                    println!();
                    print_table(ctx, &controller, &view);
                }
                Err(error) => eprintln!("Error: {}", error),
            }
        }
        remaining = remaining.map(|n| n - 1);
    }
    Ok(())
}

fn handle_config(ctx: &AppContext, template: bool) -> Result<()> {
    if template {
        print!("{}", ProjectsListConfig::template());
        return Ok(());
    }

    let config = &ctx.config;
    println!("extensions = {:?}", config.extensions);
    println!("block_language = {:?}", config.block_language);
    println!("default_page_size = {}", config.default_page_size);
    println!("poll_interval_ms = {}", config.poll_interval_ms);
    println!("date_style = {:?}", config.date_style.to_string());

    print_info(&format!(
        "vault config: {}",
        ctx.vault.join(VAULT_CONFIG_FILE).display()
    ));
    if let Some(global) = global_config_path() {
        print_info(&format!("global config: {}", global.display()));
    }
    Ok(())
}

fn print_table(ctx: &AppContext, controller: &TableController<FsStore>, view: &PageView) {
    print!("{}", render_table(view, controller.state(), &ctx.render));
}
