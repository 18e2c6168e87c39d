use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::store::FieldInput;

pub const DEFAULT_WORKBOOK: &str = "CRM Analyst";

#[derive(Debug, Parser)]
#[command(author, version, about = "Report on and edit a CRM workbook", long_about = None)]
pub struct Cli {
    /// Workbook directory holding one CSV file per sheet
    #[arg(
        short,
        long,
        global = true,
        env = "CRM_SHEETS_WORKBOOK",
        default_value = DEFAULT_WORKBOOK
    )]
    pub workbook: PathBuf,
    /// Table-kind registry (YAML); the builtin CRM tables are used when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Character encoding of the workbook's CSV files (defaults to utf-8)
    #[arg(long = "input-encoding", global = true)]
    pub input_encoding: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the known tables, or write the builtin registry as a YAML template
    Kinds(KindsArgs),
    /// Show a table ranked, labelled, and optionally sorted or filtered
    List(ListArgs),
    /// Add a record to a table and save it
    Add(AddArgs),
    /// Edit the record at a listed position and save it
    Edit(EditArgs),
    /// Remove the record at a listed position and save the table
    Remove(RemoveArgs),
    /// Copy every sheet of an Excel workbook into the workbook directory
    Import(ImportArgs),
    /// Interactive session; changes stay in memory until `save`
    Shell,
}

#[derive(Debug, Args)]
pub struct KindsArgs {
    /// Write the active registry to this YAML file instead of listing it
    #[arg(long)]
    pub write: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Table name, e.g. "VIP Buyer"
    pub table: String,
    /// Display order as `column[:asc|desc]`; defaults to the table's ranking
    #[arg(long)]
    pub sort: Option<String>,
    /// Row filters such as `Transaction Total>=1000` or `Customer Name contains an`
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct RecordFields {
    /// Table name
    pub table: String,
    /// Field assignments `column=value`
    #[arg(long = "set", value_parser = parse_field, action = clap::ArgAction::Append, required = true)]
    pub fields: Vec<FieldInput>,
}

#[derive(Debug, Args)]
pub struct PositionArgs {
    /// Table name
    pub table: String,
    /// 0-based position in the table's listing
    #[arg(allow_negative_numbers = true)]
    pub position: i64,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[command(flatten)]
    pub record: RecordFields,
    /// Apply the change without writing the workbook
    #[arg(long = "no-save")]
    pub no_save: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    #[command(flatten)]
    pub target: PositionArgs,
    /// Field assignments `column=value`
    #[arg(long = "set", value_parser = parse_field, action = clap::ArgAction::Append, required = true)]
    pub fields: Vec<FieldInput>,
    /// Apply the change without writing the workbook
    #[arg(long = "no-save")]
    pub no_save: bool,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub target: PositionArgs,
    /// Apply the change without writing the workbook
    #[arg(long = "no-save")]
    pub no_save: bool,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Excel workbook (xlsx, xlsm, xlsb, xls) to copy sheets from
    pub input: PathBuf,
}

/// One line of the interactive shell.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    /// Show a table
    List(ListArgs),
    /// Add a record (kept in memory)
    Add(RecordFields),
    /// Edit the record at a position of the last listing shown
    Edit {
        #[command(flatten)]
        target: PositionArgs,
        #[arg(long = "set", value_parser = parse_field, action = clap::ArgAction::Append, required = true)]
        fields: Vec<FieldInput>,
    },
    /// Remove the record at a position of the last listing shown
    Remove(PositionArgs),
    /// Write one table, or every table with unsaved changes
    Save { table: Option<String> },
    /// Show the known tables and which have unsaved changes
    Tables,
    /// End the session
    #[command(alias = "exit")]
    Quit,
}

fn parse_field(raw: &str) -> Result<FieldInput, String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected `column=value`, got '{raw}'"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("Missing column name in '{raw}'"));
    }
    Ok((column.to_string(), value.to_string()))
}

/// Splits a shell line into words, honouring single and double quotes.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if let Some(q) = quote {
        return Err(format!("Unterminated {q} quote"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_field_keeps_equals_in_value() {
        assert_eq!(
            parse_field("Notes=a=b").unwrap(),
            ("Notes".to_string(), "a=b".to_string())
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=5").is_err());
    }

    #[test]
    fn split_words_honours_quotes() {
        assert_eq!(
            split_words(r#"add "VIP Buyer" --set 'Customer Name=Ani S' --set Count="""#).unwrap(),
            vec!["add", "VIP Buyer", "--set", "Customer Name=Ani S", "--set", "Count="]
        );
        assert!(split_words("list \"VIP").is_err());
    }

    #[test]
    fn shell_line_parses_negative_positions() {
        let parsed = ShellLine::try_parse_from(["remove", "VIP Buyer", "-1"]).unwrap();
        match parsed.command {
            ShellCommand::Remove(target) => assert_eq!(target.position, -1),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
