use std::io::BufRead;

use bitvec::prelude::*;

use crate::genomics::AnalysisError;

/// Masked interval read from a repeat annotation (1-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedInterval {
    /// Contig carrying the interval.
    pub contig: String,
    /// First masked base.
    pub begin: u32,
    /// Last masked base.
    pub end: u32,
}

/// Per-contig bit mask of positions excluded from classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatMask {
    bits: BitVec<u64, Lsb0>,
}

impl RepeatMask {
    /// Unmasked contig of `length` bases.
    pub fn new(length: usize) -> Self {
        Self {
            bits: bitvec![u64, Lsb0; 0; length],
        }
    }

    /// Mask `begin..=end` (1-based), clipped to the contig.
    pub fn mark(&mut self, begin: u32, end: u32) {
        let (lo, hi) = if begin <= end { (begin, end) } else { (end, begin) };
        let start = (lo.max(1) - 1) as usize;
        let stop = (hi as usize).min(self.bits.len());
        if start < stop {
            self.bits[start..stop].fill(true);
        }
    }

    /// Whether the 1-based `position` is masked.
    pub fn contains(&self, position: u32) -> bool {
        position
            .checked_sub(1)
            .and_then(|idx| self.bits.get(idx as usize).map(|bit| *bit))
            .unwrap_or(false)
    }

    /// Number of masked bases.
    pub fn masked_bases(&self) -> usize {
        self.bits.count_ones()
    }
}

/// Read intervals from RepeatMasker `.out` text.
///
/// Header rows (`SW ...`, `score ...`) and blank lines are skipped; column 5
/// names the contig and columns 6-7 give the interval.
pub fn read_repeat_intervals<R: BufRead>(reader: R) -> Result<Vec<MaskedInterval>, AnalysisError> {
    let mut intervals = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("SW") || trimmed.starts_with("score") {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let malformed = |reason: &str| AnalysisError::Format {
            line: line_no + 1,
            message: format!("repeat annotation {reason}: '{trimmed}'"),
        };
        if fields.len() < 7 {
            return Err(malformed("has fewer than 7 columns"));
        }
        let begin = fields[5]
            .parse()
            .map_err(|_| malformed("has a non-numeric begin"))?;
        let end = fields[6]
            .parse()
            .map_err(|_| malformed("has a non-numeric end"))?;

        intervals.push(MaskedInterval {
            contig: fields[4].to_string(),
            begin,
            end,
        });
    }
    Ok(intervals)
}
