//! CSV export of the canonical record set
//!
//! A thin I/O wrapper around the reconciler's output. The file is written
//! with a UTF-8 BOM so spreadsheet applications detect the encoding, and the
//! `csv` crate handles quoting of embedded commas and newlines.

use crate::error::Result;
use crate::types::CanonicalRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// UTF-8 byte order mark, recognized by spreadsheet applications
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Column headers of the export, in field order
const HEADERS: [&str; 5] = ["Name", "Email", "Position", "Profile_URL", "University"];

/// Write the canonical records to a CSV file at `path`
///
/// The record order is preserved as given (the reconciler already emits a
/// stable order). An empty record set still produces a file with the header
/// row.
pub fn write_csv(records: &[CanonicalRecord], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    out.write_all(UTF8_BOM)?;

    let mut writer = csv::WriterBuilder::new().from_writer(out);

    writer.write_record(HEADERS)?;
    for record in records {
        writer.write_record([
            record.name.as_str(),
            record.email.as_str(),
            record.position.as_str(),
            record.profile_url.as_str(),
            record.institution.as_str(),
        ])?;
    }
    writer.flush()?;

    tracing::info!(records = records.len(), path = %path.display(), "CSV export written");
    Ok(())
}
