use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::genomics::AnalysisError;

/// Identifier and length of one assembly sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyEntry {
    /// Header text up to the first whitespace.
    pub id: String,
    /// Number of sequence characters.
    pub length: u64,
}

/// Scan FASTA text for entry identifiers and lengths without keeping sequence.
///
/// Fails on sequence data before the first header, on empty entries and on
/// repeated identifiers.
pub fn read_assembly_entries<R: BufRead>(reader: R) -> Result<Vec<AssemblyEntry>, AnalysisError> {
    let mut entries: Vec<AssemblyEntry> = Vec::new();
    let mut seen = HashSet::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if let Some(header) = line.strip_prefix('>') {
            close_entry(entries.last())?;
            let id = header.split_whitespace().next().unwrap_or_default().to_string();
            if id.is_empty() {
                return Err(AnalysisError::Format {
                    line: line_no + 1,
                    message: "FASTA header without identifier".to_string(),
                });
            }
            if !seen.insert(id.clone()) {
                return Err(AnalysisError::DuplicateContig(id));
            }
            entries.push(AssemblyEntry { id, length: 0 });
        } else if !line.is_empty() {
            let entry = entries.last_mut().ok_or_else(|| AnalysisError::Format {
                line: line_no + 1,
                message: "sequence data before the first FASTA header".to_string(),
            })?;
            entry.length += line.len() as u64;
        }
    }
    close_entry(entries.last())?;
    Ok(entries)
}

fn close_entry(entry: Option<&AssemblyEntry>) -> Result<(), AnalysisError> {
    match entry {
        Some(entry) if entry.length == 0 => Err(AnalysisError::EmptyContig(entry.id.clone())),
        _ => Ok(()),
    }
}

/// Open `path` for buffered reading, tagging failures with the path.
pub fn open_input(path: &Path) -> Result<BufReader<File>, AnalysisError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| AnalysisError::Input {
            path: path.to_path_buf(),
            source,
        })
}
