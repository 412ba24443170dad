use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ExportOutcome, ModelImport, PopulateOutcome};
use crate::domain::CanonicalRecord;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_record(record: &CanonicalRecord) -> io::Result<()> {
        Self::print_json(record)
    }

    pub fn print_records(records: &[CanonicalRecord]) -> io::Result<()> {
        Self::print_json(&records)
    }

    pub fn print_populate(outcome: &PopulateOutcome) -> io::Result<()> {
        Self::print_json(outcome)
    }

    pub fn print_export(outcome: &ExportOutcome) -> io::Result<()> {
        Self::print_json(outcome)
    }

    pub fn print_import(import: &ModelImport) -> io::Result<()> {
        Self::print_json(import)
    }

    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
