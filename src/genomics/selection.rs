use std::fmt;

use crate::config::AnalysisConfig;
use crate::genomics::Contig;

/// Share of ranked contigs (in percent) used to place the BFR cutoff.
const BFR_CUTOFF_PERCENT: f64 = 0.1;

/// Contig score used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreType {
    /// Homozygosity enrichment score.
    Hme,
    /// Bulk frequency ratio score.
    Bfr,
}

impl fmt::Display for ScoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreType::Hme => f.write_str("hme_score"),
            ScoreType::Bfr => f.write_str("bfr_score"),
        }
    }
}

/// Filters contigs by evidence and score cutoff.
#[derive(Debug, Clone, Copy)]
pub struct ContigSelector<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> ContigSelector<'a> {
    /// Selector bound to a configuration.
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Score of `contig` for `score_type`.
    pub fn score(&self, contig: &Contig, score_type: ScoreType) -> f64 {
        match score_type {
            ScoreType::Hme => contig.hme_score(self.config.hmes_adjust),
            ScoreType::Bfr => contig.bfr_score(),
        }
    }

    fn has_evidence(&self, contig: &Contig, score_type: ScoreType) -> bool {
        match score_type {
            ScoreType::Hme => {
                (contig.hm_num() + contig.ht_num()) as f64 > 2.0 * self.config.hmes_adjust
            }
            ScoreType::Bfr => contig.hemi_num() > 0,
        }
    }

    /// Select contigs for `score_type`, preserving input order.
    pub fn select<'c>(&self, contigs: &'c [Contig], score_type: ScoreType) -> Vec<&'c Contig> {
        let candidates: Vec<&Contig> = if self.config.use_all_contigs {
            contigs.iter().collect()
        } else {
            contigs
                .iter()
                .filter(|contig| self.has_evidence(contig, score_type))
                .collect()
        };

        match self.cutoff(&candidates, score_type) {
            Some(cutoff) => candidates
                .into_iter()
                .filter(|contig| self.score(contig, score_type) >= cutoff)
                .collect(),
            None => candidates,
        }
    }

    /// Cutoff applied to `candidates`, or `None` when nothing is filtered.
    pub fn cutoff(&self, candidates: &[&Contig], score_type: ScoreType) -> Option<f64> {
        if self.config.include_low_scores {
            return None;
        }
        match score_type {
            ScoreType::Hme => Some(self.config.hme_cutoff()),
            ScoreType::Bfr => self.bfr_cutoff(candidates),
        }
    }

    /// Score at rank `floor(N * 0.1 / 100)` of the descending BFR scores,
    /// with the rank raised to at least 1.
    fn bfr_cutoff(&self, candidates: &[&Contig]) -> Option<f64> {
        let mut ratios: Vec<f64> = candidates.iter().map(|c| c.bfr_score()).collect();
        if ratios.is_empty() {
            return None;
        }
        ratios.sort_by(|a, b| b.total_cmp(a));
        let rank = ((ratios.len() as f64 * BFR_CUTOFF_PERCENT) / 100.0).floor() as usize;
        Some(ratios[rank.max(1) - 1])
    }
}
