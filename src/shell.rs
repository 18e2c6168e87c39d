//! Interactive session over stdin.
//!
//! Positions typed into `edit`/`remove` refer to the last listing shown for
//! that table; they resolve to record ids from that listing, so a record that
//! was removed since shows up as stale instead of hitting its neighbour.

use std::{
    collections::HashMap,
    io::{BufRead, Write},
};

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use crate::{
    cli::{ListArgs, ShellCommand, ShellLine, split_words},
    listing::{ListRequest, Listing},
    storage::TabularStorage,
    session::Session,
    list_request, render,
};

struct ShellState {
    shown: HashMap<String, Listing>,
}

impl ShellState {
    fn listing_for<S: TabularStorage>(
        &mut self,
        session: &mut Session<S>,
        table: &str,
    ) -> Result<Listing> {
        let canonical = canonical_name(session, table);
        if let Some(listing) = self.shown.get(&canonical) {
            return Ok(listing.clone());
        }
        Ok(session.list(table, &ListRequest::default())?)
    }
}

fn canonical_name<S: TabularStorage>(session: &Session<S>, table: &str) -> String {
    session
        .registry()
        .get(table)
        .map(|kind| kind.name.clone())
        .unwrap_or_else(|| table.to_string())
}

pub fn run<S, R, W>(session: &mut Session<S>, input: R, mut output: W) -> Result<()>
where
    S: TabularStorage,
    R: BufRead,
    W: Write,
{
    let mut state = ShellState {
        shown: HashMap::new(),
    };
    writeln!(output, "Type `help` for commands, `quit` to leave.")?;
    for line in input.lines() {
        let line = line.context("Reading shell input")?;
        let words = match split_words(&line) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(message) => {
                writeln!(output, "error: {message}")?;
                continue;
            }
        };
        let parsed = match ShellLine::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(err) => {
                write!(output, "{err}")?;
                continue;
            }
        };
        debug!("Shell command: {:?}", parsed.command);
        if matches!(parsed.command, ShellCommand::Quit) {
            break;
        }
        if let Err(err) = execute(session, &mut state, parsed.command, &mut output) {
            writeln!(output, "error: {err:#}")?;
        }
    }
    let dirty = session.dirty_tables();
    if !dirty.is_empty() {
        writeln!(output, "Unsaved changes discarded: {}", dirty.join(", "))?;
    }
    Ok(())
}

fn execute<S, W>(
    session: &mut Session<S>,
    state: &mut ShellState,
    command: ShellCommand,
    output: &mut W,
) -> Result<()>
where
    S: TabularStorage,
    W: Write,
{
    match command {
        ShellCommand::List(args) => {
            let listing = show(session, &args, output)?;
            state.shown.insert(listing.table.clone(), listing);
        }
        ShellCommand::Add(record) => {
            let id = session.add(&record.table, &record.fields)?;
            writeln!(output, "added record #{id}")?;
        }
        ShellCommand::Edit { target, fields } => {
            let listing = state.listing_for(session, &target.table)?;
            let id = listing.resolve(target.position)?;
            session.edit(&target.table, id, &fields)?;
            writeln!(output, "updated record #{id}")?;
        }
        ShellCommand::Remove(target) => {
            let listing = state.listing_for(session, &target.table)?;
            let id = listing.resolve(target.position)?;
            session.remove(&target.table, id)?;
            writeln!(output, "removed record #{id}")?;
        }
        ShellCommand::Save { table: Some(table) } => {
            if session.save(&table)? {
                writeln!(output, "saved {table}")?;
            } else {
                writeln!(output, "{table} has no unsaved changes")?;
            }
        }
        ShellCommand::Save { table: None } => {
            let saved = session.save_all()?;
            writeln!(output, "saved {} table(s)", saved.len())?;
        }
        ShellCommand::Tables => {
            let dirty = session.dirty_tables();
            for kind in &session.registry().kinds {
                let marker = if dirty.contains(&kind.name) { " *" } else { "" };
                writeln!(output, "{}{marker}", kind.name)?;
            }
        }
        ShellCommand::Quit => {}
    }
    Ok(())
}

fn show<S, W>(session: &mut Session<S>, args: &ListArgs, output: &mut W) -> Result<Listing>
where
    S: TabularStorage,
    W: Write,
{
    let request = list_request(args)?;
    let listing = session.list(&args.table, &request)?;
    write!(output, "{}", render(&listing, args.format)?)?;
    Ok(listing)
}
