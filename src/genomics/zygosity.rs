use crate::config::AnalysisConfig;
use crate::genomics::{BaseFractions, PileupRecord};

/// Zygosity call derived from an allele fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Zygosity {
    /// Fraction inside the heterozygosity window.
    Heterozygous,
    /// Fraction above the heterozygosity window.
    Homozygous,
    /// Fraction below the window; the position is not reported.
    Indeterminate,
}

/// Classify an allele fraction against an inclusive heterozygosity window.
pub fn classify(fraction: f64, ht_low: f64, ht_high: f64) -> Zygosity {
    if fraction >= ht_low && fraction <= ht_high {
        Zygosity::Heterozygous
    } else if fraction > ht_high {
        Zygosity::Homozygous
    } else {
        Zygosity::Indeterminate
    }
}

/// Zygosity and fraction of the predominant alternate allele in a pileup.
///
/// Returns `None` when no alternate allele survives the depth and noise
/// filters. Minor alleles at complex loci are not reported separately.
pub fn zygosity_call(record: &PileupRecord, config: &AnalysisConfig) -> Option<(Zygosity, f64)> {
    fraction_call(&record.var_base_frac(config), config)
}

pub(crate) fn fraction_call(
    fractions: &BaseFractions,
    config: &AnalysisConfig,
) -> Option<(Zygosity, f64)> {
    let fraction = fractions.predominant_alt_fraction()?;
    Some((classify(fraction, config.ht_low, config.ht_high), fraction))
}
