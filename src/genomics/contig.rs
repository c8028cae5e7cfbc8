use std::collections::BTreeMap;

use crate::genomics::ComparedPositions;

/// Assembly fragment with its classified variant positions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Contig {
    id: String,
    length: u64,
    hm_pos: BTreeMap<u32, f64>,
    ht_pos: BTreeMap<u32, f64>,
    hemi_pos: BTreeMap<u32, f64>,
}

impl Contig {
    /// Contig without any classified positions.
    pub fn new(id: impl Into<String>, length: u64) -> Self {
        Self {
            id: id.into(),
            length,
            hm_pos: BTreeMap::new(),
            ht_pos: BTreeMap::new(),
            hemi_pos: BTreeMap::new(),
        }
    }

    /// Same contig carrying the positions from a bulk comparison.
    pub fn with_positions(self, compared: ComparedPositions) -> Self {
        Self {
            hm_pos: compared.hm_pos,
            ht_pos: compared.ht_pos,
            hemi_pos: compared.hemi_pos,
            ..self
        }
    }

    /// Copy of the contig keeping only homozygous positions accepted by `keep`.
    pub fn retain_hm_positions<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(u32) -> bool,
    {
        Self {
            hm_pos: self
                .hm_pos
                .iter()
                .filter(|(pos, _)| keep(**pos))
                .map(|(pos, frac)| (*pos, *frac))
                .collect(),
            ..self.clone()
        }
    }

    /// Identifier from the assembly.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sequence length in bases.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Homozygous positions and fractions.
    pub fn hm_pos(&self) -> &BTreeMap<u32, f64> {
        &self.hm_pos
    }

    /// Heterozygous positions and fractions.
    pub fn ht_pos(&self) -> &BTreeMap<u32, f64> {
        &self.ht_pos
    }

    /// Hemi-SNP positions and ratios.
    pub fn hemi_pos(&self) -> &BTreeMap<u32, f64> {
        &self.hemi_pos
    }

    /// Number of homozygous positions.
    pub fn hm_num(&self) -> usize {
        self.hm_pos.len()
    }

    /// Number of heterozygous positions.
    pub fn ht_num(&self) -> usize {
        self.ht_pos.len()
    }

    /// Number of hemi-SNP positions.
    pub fn hemi_num(&self) -> usize {
        self.hemi_pos.len()
    }

    /// Homozygosity enrichment score: `(hm + adjust) / (ht + adjust)`, or 0
    /// when the contig has no zygosity calls at all.
    pub fn hme_score(&self, hmes_adjust: f64) -> f64 {
        if self.hm_num() == 0 && self.ht_num() == 0 {
            return 0.0;
        }
        (self.hm_num() as f64 + hmes_adjust) / (self.ht_num() as f64 + hmes_adjust)
    }

    /// Arithmetic mean of hemi-SNP ratios, 0 when there are none.
    pub fn bfr_score(&self) -> f64 {
        if self.hemi_pos.is_empty() {
            return 0.0;
        }
        self.hemi_pos.values().sum::<f64>() / self.hemi_pos.len() as f64
    }
}
