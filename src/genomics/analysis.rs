use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AnalysisConfig, ConfigError, BG_CARRIER_RATIO_LIMIT};
use crate::genomics::io::{open_input, read_assembly_entries, AssemblyEntry};
use crate::genomics::masking::{read_repeat_intervals, MaskedInterval};
use crate::genomics::{
    BfrCalculator, Contig, ContigPileups, ContigSelector, PileupError, PileupRecord, RepeatMask,
    Sample, ScoreType,
};

/// Errors that abort an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// An input file could not be opened.
    #[error("cannot read {}: {source}", path.display())]
    Input {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// Reading from an already-open stream failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A pileup line could not be parsed.
    #[error("pileup line {line}: {source}")]
    Pileup {
        /// 1-based line number.
        line: usize,
        /// Parse failure.
        source: PileupError,
    },

    /// A FASTA or repeat annotation line is malformed.
    #[error("line {line}: {message}")]
    Format {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// The assembly repeats a sequence identifier.
    #[error("duplicate contig id '{0}' in assembly")]
    DuplicateContig(String),

    /// The assembly holds an entry without sequence.
    #[error("no sequence found for contig '{0}'")]
    EmptyContig(String),

    /// Input refers to a contig absent from the assembly.
    #[error("contig '{0}' is not part of the assembly")]
    UnknownContig(String),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// htslib failed while reading the indexed assembly.
    #[error("indexed assembly error: {0}")]
    Faidx(#[from] rust_htslib::errors::Error),
}

/// Counts reported after ingesting one pileup stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Non-blank lines parsed.
    pub lines: usize,
    /// Variant records stored.
    pub stored: usize,
    /// Variant records dropped for exceeding the maximum depth.
    pub over_max_depth: usize,
}

/// Whole-assembly analysis: ingestion, bulk comparison, selection and
/// verification.
#[derive(Debug, Clone)]
pub struct BulkAnalysis {
    config: AnalysisConfig,
    contigs: Vec<Contig>,
    pileups: Vec<ContigPileups>,
    index: HashMap<String, usize>,
    compared: bool,
}

impl BulkAnalysis {
    /// Create an analysis over assembly entries, in their given order.
    pub fn new<I>(config: AnalysisConfig, entries: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = AssemblyEntry>,
    {
        config.validate()?;

        let mut contigs = Vec::new();
        let mut pileups = Vec::new();
        let mut index = HashMap::new();
        for entry in entries {
            if entry.length == 0 {
                return Err(AnalysisError::EmptyContig(entry.id));
            }
            if index.insert(entry.id.clone(), contigs.len()).is_some() {
                return Err(AnalysisError::DuplicateContig(entry.id));
            }
            pileups.push(ContigPileups::new(entry.id.clone()));
            contigs.push(Contig::new(entry.id, entry.length));
        }

        Ok(Self {
            config,
            contigs,
            pileups,
            index,
            compared: false,
        })
    }

    /// Create an analysis from an assembly FASTA file.
    pub fn from_fasta<P: AsRef<Path>>(config: AnalysisConfig, path: P) -> Result<Self, AnalysisError> {
        let entries = read_assembly_entries(open_input(path.as_ref())?)?;
        info!(path = %path.as_ref().display(), contigs = entries.len(), "loaded assembly");
        Self::new(config, entries)
    }

    /// Configuration in use.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Contigs in assembly order.
    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    /// Contig by identifier.
    pub fn contig(&self, id: &str) -> Option<&Contig> {
        self.index.get(id).map(|&idx| &self.contigs[idx])
    }

    /// Stored pileups of a contig.
    pub fn pileups(&self, id: &str) -> Option<&ContigPileups> {
        self.index.get(id).map(|&idx| &self.pileups[idx])
    }

    /// Whether [`Self::compare_pileups`] has run.
    pub fn is_compared(&self) -> bool {
        self.compared
    }

    fn slot(&self, id: &str) -> Result<usize, AnalysisError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| AnalysisError::UnknownContig(id.to_string()))
    }

    /// Attach masked intervals to their contigs.
    pub fn apply_mask<I>(&mut self, intervals: I) -> Result<usize, AnalysisError>
    where
        I: IntoIterator<Item = MaskedInterval>,
    {
        let mut applied = 0;
        for interval in intervals {
            let idx = self.slot(&interval.contig)?;
            let length = self.contigs[idx].length() as usize;
            let pileups = &mut self.pileups[idx];
            let mut mask = pileups
                .mask()
                .cloned()
                .unwrap_or_else(|| RepeatMask::new(length));
            mask.mark(interval.begin, interval.end);
            pileups.set_mask(mask);
            applied += 1;
        }
        Ok(applied)
    }

    /// Read RepeatMasker output and mask the listed intervals.
    pub fn load_repeat_mask<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, AnalysisError> {
        let intervals = read_repeat_intervals(open_input(path.as_ref())?)?;
        let applied = self.apply_mask(intervals)?;
        info!(path = %path.as_ref().display(), intervals = applied, "applied repeat mask");
        Ok(applied)
    }

    /// Store a parsed record if it passes the maximum-depth ceiling.
    ///
    /// Returns whether the record was kept.
    pub fn store_pileup(&mut self, sample: Sample, record: PileupRecord) -> Result<bool, AnalysisError> {
        let idx = self.slot(record.ref_name())?;
        if self.config.max_depth != 0 && record.coverage() > self.config.max_depth {
            debug!(
                contig = record.ref_name(),
                pos = record.position(),
                coverage = record.coverage(),
                "pileup coverage above max depth"
            );
            return Ok(false);
        }
        self.pileups[idx].insert(sample, record);
        Ok(true)
    }

    /// Stream pileup lines for `sample`, keeping variant records.
    pub fn ingest_pileup<R: BufRead>(&mut self, sample: Sample, reader: R) -> Result<IngestSummary, AnalysisError> {
        let mut summary = IngestSummary::default();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            summary.lines += 1;

            let record = PileupRecord::parse(&line, &self.config).map_err(|source| {
                AnalysisError::Pileup {
                    line: line_no + 1,
                    source,
                }
            })?;
            if !record.is_var(&self.config) {
                continue;
            }
            if self.store_pileup(sample, record)? {
                summary.stored += 1;
            } else {
                summary.over_max_depth += 1;
            }
        }
        Ok(summary)
    }

    /// Ingest a pileup file for `sample`.
    pub fn ingest_pileup_file<P: AsRef<Path>>(
        &mut self,
        sample: Sample,
        path: P,
    ) -> Result<IngestSummary, AnalysisError> {
        info!(%sample, path = %path.as_ref().display(), "processing pileup file");
        let summary = self.ingest_pileup(sample, open_input(path.as_ref())?)?;
        info!(
            %sample,
            lines = summary.lines,
            stored = summary.stored,
            over_max_depth = summary.over_max_depth,
            "pileup ingested"
        );
        Ok(summary)
    }

    /// Compare bulks on every contig and record classified positions.
    ///
    /// In polyploidy mode, parental hemi-SNPs are resolved first for contigs
    /// with parental data.
    pub fn compare_pileups(&mut self) {
        let calc = BfrCalculator::from_config(&self.config);
        let config = &self.config;

        let mut hemi_contigs = 0;
        for (contig, pileups) in self.contigs.iter_mut().zip(self.pileups.iter_mut()) {
            if config.polyploidy && pileups.has_parent_data() {
                pileups.mark_parent_hemisnps(&calc, config);
                hemi_contigs += 1;
            }
            let compared = pileups.bulks_compared(&calc, config);
            let fresh = Contig::new(contig.id(), contig.length());
            *contig = fresh.with_positions(compared);
        }

        self.compared = true;
        info!(
            contigs = self.contigs.len(),
            with_parental_hemisnps = hemi_contigs,
            "bulks compared"
        );
    }

    /// Score of a contig for `score_type` under the current configuration.
    pub fn score(&self, contig: &Contig, score_type: ScoreType) -> f64 {
        ContigSelector::new(&self.config).score(contig, score_type)
    }

    /// Contigs selected for `score_type`, in assembly order.
    pub fn select(&self, score_type: ScoreType) -> Vec<&Contig> {
        let selected = ContigSelector::new(&self.config).select(&self.contigs, score_type);
        if self.config.use_all_contigs {
            info!(%score_type, "no filtering applied to contigs");
        } else {
            info!(
                %score_type,
                selected = selected.len(),
                total = self.contigs.len(),
                "selected contigs"
            );
        }
        selected
    }

    /// Contigs selected by homozygosity enrichment.
    pub fn hmes_frags(&self) -> Vec<&Contig> {
        self.select(ScoreType::Hme)
    }

    /// Contigs selected by bulk frequency ratio.
    pub fn bfr_frags(&self) -> Vec<&Contig> {
        self.select(ScoreType::Bfr)
    }

    /// Drop homozygous positions of HME-selected contigs that fail
    /// re-validation, then return the recomputed HME selection.
    ///
    /// A position is dropped when its mutant record is missing or no longer a
    /// variant, or when the background bulk shows a non-reference ratio above
    /// [`BG_CARRIER_RATIO_LIMIT`].
    pub fn verify_bg_bulk_pileup(&mut self) -> Vec<&Contig> {
        let selected: Vec<usize> = self
            .hmes_frags()
            .into_iter()
            .filter_map(|contig| self.index.get(contig.id()).copied())
            .collect();

        let mut removed = 0;
        for idx in selected {
            let pileups = &self.pileups[idx];
            let config = &self.config;
            let corrected = self.contigs[idx].retain_hm_positions(|pos| {
                let keep = match pileups.records(Sample::MutantBulk).get(&pos) {
                    Some(mutant) if mutant.is_var(config) => pileups
                        .records(Sample::BackgroundBulk)
                        .get(&pos)
                        .map_or(true, |bg| bg.non_ref_ratio() <= BG_CARRIER_RATIO_LIMIT),
                    _ => false,
                };
                if !keep {
                    removed += 1;
                }
                keep
            });
            self.contigs[idx] = corrected;
        }

        info!(removed, "verified homozygous positions against background bulk");
        self.hmes_frags()
    }
}
