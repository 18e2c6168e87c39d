//! CSV plumbing for workbook regions.
//!
//! - **Encoding**: region files exported from spreadsheet tools are often not
//!   UTF-8; reads decode through `encoding_rs`, writes are always UTF-8.
//! - **Quoting**: output uses `QuoteStyle::Always` so currency text such as
//!   `Rp 1,500` survives the round trip.
//! - **Atomic replace**: [`atomic_write`] writes next to the destination and
//!   renames over it, so a crash leaves either the old or the new file.

use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
};

use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use tempfile::NamedTempFile;

pub fn resolve_encoding(label: Option<&str>) -> Option<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes()),
        None => Some(UTF_8),
    }
}

pub fn open_csv_reader<R>(reader: R) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_writer<W>(writer: W) -> csv::Writer<W>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .flexible(false);
    builder.from_writer(writer)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> io::Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to decode text with encoding {}", encoding.name()),
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> io::Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

fn parent_dir_or_dot(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Writes `dest` through a temp file in the same directory, then renames it into
/// place. If `write_fn` fails the temp file is removed and `dest` is untouched.
pub fn atomic_write<F>(dest: &Path, write_fn: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let dir = parent_dir_or_dot(dest);
    let mut tmp = NamedTempFile::new_in(dir)?;
    write_fn(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|err| err.error)?;
    Ok(())
}
