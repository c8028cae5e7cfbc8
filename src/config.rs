//! Run-wide configuration for bulk comparison and contig scoring.
//!
//! A single [`AnalysisConfig`] value is built before any pileup is read and
//! passed by reference to every component that needs a threshold. Nothing in
//! the crate mutates it once ingestion has started.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Background-bulk non-reference ratio above which a homozygous call is
/// discarded during verification (a recessive carrier is expected near 1/3).
pub const BG_CARRIER_RATIO_LIMIT: f64 = 0.35;

/// Errors raised when a configuration fails validation.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A smoothing constant must be strictly positive.
    #[error("{name} must be > 0 (got {value})")]
    NonPositiveAdjust {
        /// Name of the offending field.
        name: &'static str,
        /// Value supplied.
        value: f64,
    },

    /// A fraction threshold lies outside `[0, 1]`.
    #[error("{name} must lie within [0, 1] (got {value})")]
    FractionOutOfRange {
        /// Name of the offending field.
        name: &'static str,
        /// Value supplied.
        value: f64,
    },

    /// Heterozygosity window is inverted.
    #[error("ht_low {low} exceeds ht_high {high}")]
    InvertedHetWindow {
        /// Lower heterozygosity bound.
        low: f64,
        /// Upper heterozygosity bound.
        high: f64,
    },

    /// Unknown cross type string.
    #[error("unsupported cross type '{0}' (expected 'back' or 'out')")]
    UnknownCrossType(String),
}

/// Population design used to derive the HME cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CrossType {
    /// Backcross population: cutoff `1/adjust + 1`.
    #[default]
    Back,
    /// Outcross population: cutoff `2/adjust + 1`.
    Out,
}

impl FromStr for CrossType {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "back" => Ok(Self::Back),
            "out" => Ok(Self::Out),
            other => Err(ConfigError::UnknownCrossType(other.to_string())),
        }
    }
}

impl fmt::Display for CrossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Back => f.write_str("back"),
            Self::Out => f.write_str("out"),
        }
    }
}

/// Thresholds and mode flags consumed by the classification engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnalysisConfig {
    /// Smoothing constant for the homozygosity enrichment score.
    pub hmes_adjust: f64,

    /// Smoothing constant for bulk frequency ratios.
    pub bfr_adjust: f64,

    /// Lowest allele fraction still called heterozygous.
    pub ht_low: f64,

    /// Highest allele fraction still called heterozygous.
    pub ht_high: f64,

    /// Minimum pileup coverage for a position to carry fractions.
    pub min_depth: u32,

    /// Maximum pileup coverage accepted at ingestion (0 disables the ceiling).
    pub max_depth: u32,

    /// Minimum number of non-reference bases for a record to be a variant.
    pub min_non_ref_count: u32,

    /// Minimum indel-bearing reads before an indel allele is recorded.
    pub min_indel_count_support: u32,

    /// Fractions at or below this value are treated as sequencing noise.
    pub noise: f64,

    /// Skip positions whose reference base is `N`.
    pub ignore_ambiguous_ref: bool,

    /// Population design for the HME cutoff.
    pub cross_type: CrossType,

    /// Report every contig without evidence pre-filtering.
    pub use_all_contigs: bool,

    /// Keep contigs whose score falls below the cutoff.
    pub include_low_scores: bool,

    /// Resolve homeologous variants via parental hemi-SNPs.
    pub polyploidy: bool,

    /// Bases reported on each side of a selected variant.
    pub flank_length: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            hmes_adjust: 0.5,
            bfr_adjust: 0.05,
            ht_low: 0.2,
            ht_high: 0.9,
            min_depth: 6,
            max_depth: 300,
            min_non_ref_count: 3,
            min_indel_count_support: 3,
            noise: 0.1,
            ignore_ambiguous_ref: true,
            cross_type: CrossType::Back,
            use_all_contigs: false,
            include_low_scores: false,
            polyploidy: false,
            flank_length: 50,
        }
    }
}

impl AnalysisConfig {
    /// Set the heterozygosity window.
    pub fn with_het_window(mut self, ht_low: f64, ht_high: f64) -> Self {
        self.ht_low = ht_low;
        self.ht_high = ht_high;
        self
    }

    /// Set the population design.
    pub fn with_cross_type(mut self, cross_type: CrossType) -> Self {
        self.cross_type = cross_type;
        self
    }

    /// Enable or disable polyploidy (parental hemi-SNP) mode.
    pub fn with_polyploidy(mut self, enabled: bool) -> Self {
        self.polyploidy = enabled;
        self
    }

    /// Set coverage bounds.
    pub fn with_depth_bounds(mut self, min_depth: u32, max_depth: u32) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    /// Set the flank length used by the report.
    pub fn with_flank_length(mut self, flank_length: usize) -> Self {
        self.flank_length = flank_length;
        self
    }

    /// HME cutoff for the configured cross type.
    pub fn hme_cutoff(&self) -> f64 {
        match self.cross_type {
            CrossType::Back => (1.0 / self.hmes_adjust) + 1.0,
            CrossType::Out => (2.0 / self.hmes_adjust) + 1.0,
        }
    }

    /// Check internal consistency of the thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("hmes_adjust", self.hmes_adjust), ("bfr_adjust", self.bfr_adjust)] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveAdjust { name, value });
            }
        }
        for (name, value) in [("ht_low", self.ht_low), ("ht_high", self.ht_high), ("noise", self.noise)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }
        if self.noise >= 1.0 {
            return Err(ConfigError::FractionOutOfRange {
                name: "noise",
                value: self.noise,
            });
        }
        if self.ht_low > self.ht_high {
            return Err(ConfigError::InvertedHetWindow {
                low: self.ht_low,
                high: self.ht_high,
            });
        }
        Ok(())
    }
}
