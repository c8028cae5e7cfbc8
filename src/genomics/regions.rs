use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;

use rust_htslib::faidx;

use crate::genomics::{AnalysisError, Contig};

/// Supplies the sequence on either side of a variant position.
pub trait FlankProvider {
    /// Left and right flanks of `position` (1-based) on `contig`, excluding
    /// the variant base itself.
    fn flanks(&self, contig: &Contig, position: u32) -> Result<(String, String), AnalysisError>;
}

impl<F> FlankProvider for F
where
    F: Fn(&Contig, u32) -> Result<(String, String), AnalysisError>,
{
    fn flanks(&self, contig: &Contig, position: u32) -> Result<(String, String), AnalysisError> {
        self(contig, position)
    }
}

/// 0-based inclusive windows left and right of the 1-based `position`.
///
/// Each flank holds exactly `flank_length` bases and never includes the
/// variant base itself, so an interior site yields `position - flank_length
/// ..= position - 1` and `position + 1 ..= position + flank_length` in 1-based
/// terms. A flank is shorter only where it is clipped at a contig end, and is
/// `None` when no base remains on that side.
pub fn flank_windows(
    contig_length: u64,
    position: u32,
    flank_length: usize,
) -> (Option<RangeInclusive<usize>>, Option<RangeInclusive<usize>>) {
    let length = contig_length as usize;
    let site = (position as usize).saturating_sub(1);

    let left = (site > 0 && flank_length > 0)
        .then(|| site.saturating_sub(flank_length)..=site - 1);

    let right_end = (site + flank_length).min(length.saturating_sub(1));
    let right = (flank_length > 0 && site + 1 < length).then(|| site + 1..=right_end);

    (left, right)
}

/// Flank source backed by an htslib FASTA index (built on demand).
pub struct IndexedAssembly {
    reader: faidx::Reader,
    flank_length: usize,
}

impl fmt::Debug for IndexedAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedAssembly")
            .field("flank_length", &self.flank_length)
            .finish_non_exhaustive()
    }
}

impl IndexedAssembly {
    /// Open (and index if needed) the assembly at `path`.
    pub fn open<P: AsRef<Path>>(path: P, flank_length: usize) -> Result<Self, AnalysisError> {
        let reader = faidx::Reader::from_path(path.as_ref())?;
        Ok(Self {
            reader,
            flank_length,
        })
    }

    fn fetch(&self, name: &str, window: Option<RangeInclusive<usize>>) -> Result<String, AnalysisError> {
        match window {
            Some(window) => Ok(self
                .reader
                .fetch_seq_string(name, *window.start(), *window.end())?),
            None => Ok(String::new()),
        }
    }
}

impl FlankProvider for IndexedAssembly {
    fn flanks(&self, contig: &Contig, position: u32) -> Result<(String, String), AnalysisError> {
        let (left, right) = flank_windows(contig.length(), position, self.flank_length);
        Ok((self.fetch(contig.id(), left)?, self.fetch(contig.id(), right)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_exclude_the_variant_base() {
        let (left, right) = flank_windows(100, 10, 5);
        assert_eq!(left, Some(4..=8));
        assert_eq!(right, Some(10..=14));
    }

    #[test]
    fn interior_windows_span_exactly_flank_length_bases() {
        for flank_length in [1, 5, 30] {
            let (left, right) = flank_windows(1_000, 500, flank_length);
            let (left, right) = (left.unwrap(), right.unwrap());
            assert_eq!(left.clone().count(), flank_length);
            assert_eq!(right.clone().count(), flank_length);
            assert_eq!(*left.end(), 498);
            assert_eq!(*right.start(), 500);
        }
    }

    #[test]
    fn windows_clip_at_contig_ends() {
        let (left, right) = flank_windows(12, 1, 5);
        assert_eq!(left, None);
        assert_eq!(right, Some(1..=5));

        let (left, right) = flank_windows(12, 12, 5);
        assert_eq!(left, Some(6..=10));
        assert_eq!(right, None);

        let (left, right) = flank_windows(12, 3, 5);
        assert_eq!(left, Some(0..=1));
        assert_eq!(right, Some(3..=7));
    }
}
