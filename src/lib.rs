pub mod cli;
pub mod coerce;
pub mod derive;
pub mod error;
pub mod filter;
pub mod import;
pub mod io_utils;
pub mod kinds;
pub mod listing;
pub mod loader;
pub mod record;
pub mod session;
pub mod shell;
pub mod storage;
pub mod store;
pub mod sync;
pub mod table;

use std::{
    env,
    io::{self, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{AddArgs, Cli, Commands, EditArgs, ImportArgs, KindsArgs, ListArgs, OutputFormat, RemoveArgs},
    kinds::Registry,
    listing::{ListRequest, Listing, SortKey},
    session::Session,
    storage::CsvWorkbook,
};

pub use crate::error::{StoreError, StoreResult};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("crm_sheets", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let registry = match &cli.config {
        Some(path) => {
            Registry::load(path).with_context(|| format!("Loading table kinds from {path:?}"))?
        }
        None => Registry::builtin(),
    };

    let session = || -> Result<Session<CsvWorkbook>> {
        let workbook = open_workbook(&cli.workbook, cli.input_encoding.as_deref())?;
        Ok(Session::new(workbook, registry.clone()))
    };

    match &cli.command {
        Commands::Kinds(args) => handle_kinds(&registry, args),
        Commands::Import(args) => handle_import(&cli.workbook, &registry, args),
        Commands::List(args) => handle_list(&mut session()?, args),
        Commands::Add(args) => handle_add(&mut session()?, args),
        Commands::Edit(args) => handle_edit(&mut session()?, args),
        Commands::Remove(args) => handle_remove(&mut session()?, args),
        Commands::Shell => shell::run(&mut session()?, io::stdin().lock(), io::stdout().lock()),
    }
}

fn open_workbook(path: &Path, encoding: Option<&str>) -> Result<CsvWorkbook> {
    let workbook = CsvWorkbook::open(path).with_context(|| {
        format!(
            "Workbook {path:?} is missing; create it with `crm-sheets import <file.xlsx>` or pass --workbook"
        )
    })?;
    let encoding = io_utils::resolve_encoding(encoding)
        .ok_or_else(|| anyhow!("Unknown encoding '{}'", encoding.unwrap_or_default()))?;
    Ok(workbook.with_encoding(encoding))
}

fn handle_kinds(registry: &Registry, args: &KindsArgs) -> Result<()> {
    if let Some(path) = &args.write {
        registry
            .save(path)
            .with_context(|| format!("Writing table kinds to {path:?}"))?;
        info!("Wrote {} table kind(s) to {path:?}", registry.kinds.len());
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    for kind in &registry.kinds {
        let columns = kind
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(stdout, "{} [{}]: {columns}", kind.name, kind.sheet)?;
    }
    Ok(())
}

fn handle_import(workbook: &Path, registry: &Registry, args: &ImportArgs) -> Result<()> {
    info!("Importing {:?} into {workbook:?}", args.input);
    let mut storage = CsvWorkbook::create(workbook)
        .with_context(|| format!("Preparing workbook directory {workbook:?}"))?;
    let imported = import::import_excel(&args.input, &mut storage, registry)?;
    let mut stdout = io::stdout().lock();
    for (sheet, rows) in &imported {
        writeln!(stdout, "{sheet}: {rows} row(s)")?;
    }
    Ok(())
}

pub(crate) fn list_request(args: &ListArgs) -> Result<ListRequest> {
    let sort = match &args.sort {
        Some(spec) => {
            Some(SortKey::parse(spec).ok_or_else(|| anyhow!("Invalid sort directive '{spec}'"))?)
        }
        None => None,
    };
    let filters = filter::parse_filters(&args.filters)?;
    debug!("List request: sort={sort:?} filters={filters:?}");
    Ok(ListRequest { sort, filters })
}

pub(crate) fn render(listing: &Listing, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::render_listing(listing)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(listing).context("Serializing listing")?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn handle_list(session: &mut Session<CsvWorkbook>, args: &ListArgs) -> Result<()> {
    let request = list_request(args)?;
    let listing = session.list(&args.table, &request)?;
    print!("{}", render(&listing, args.format)?);
    Ok(())
}

fn finish(session: &mut Session<CsvWorkbook>, table: &str, no_save: bool) -> Result<()> {
    if no_save {
        info!("Not saving '{table}' (--no-save)");
        return Ok(());
    }
    session.save(table)?;
    Ok(())
}

fn handle_add(session: &mut Session<CsvWorkbook>, args: &AddArgs) -> Result<()> {
    let table = &args.record.table;
    let id = session.add(table, &args.record.fields)?;
    println!("added record #{id}");
    finish(session, table, args.no_save)
}

fn handle_edit(session: &mut Session<CsvWorkbook>, args: &EditArgs) -> Result<()> {
    let table = &args.target.table;
    let listing = session.list(table, &ListRequest::default())?;
    let id = listing.resolve(args.target.position)?;
    session.edit(table, id, &args.fields)?;
    println!("updated record #{id}");
    finish(session, table, args.no_save)
}

fn handle_remove(session: &mut Session<CsvWorkbook>, args: &RemoveArgs) -> Result<()> {
    let table = &args.target.table;
    let listing = session.list(table, &ListRequest::default())?;
    let id = listing.resolve(args.target.position)?;
    session.remove(table, id)?;
    println!("removed record #{id}");
    finish(session, table, args.no_save)
}
