use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::config::AnalysisConfig;
use crate::genomics::{zygosity_call, BfrCalculator, PileupRecord, Ratio, RepeatMask, Zygosity};

/// Pileup source a record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sample {
    /// Pool of individuals showing the mutant phenotype.
    MutantBulk,
    /// Pool of wild-type (background) individuals.
    BackgroundBulk,
    /// Mutant parent line.
    MutantParent,
    /// Background parent line.
    BackgroundParent,
}

impl Sample {
    /// Every sample in ingestion order.
    pub const ALL: [Sample; 4] = [
        Sample::MutantBulk,
        Sample::BackgroundBulk,
        Sample::MutantParent,
        Sample::BackgroundParent,
    ];
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sample::MutantBulk => "mut_bulk",
            Sample::BackgroundBulk => "bg_bulk",
            Sample::MutantParent => "mut_parent",
            Sample::BackgroundParent => "bg_parent",
        };
        f.write_str(name)
    }
}

/// Classified positions produced by comparing the two bulks of one contig.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparedPositions {
    /// Homozygous positions and their allele fraction.
    pub hm_pos: BTreeMap<u32, f64>,
    /// Heterozygous positions and their allele fraction.
    pub ht_pos: BTreeMap<u32, f64>,
    /// Hemi-SNP positions and their bulk frequency ratio.
    pub hemi_pos: BTreeMap<u32, f64>,
}

/// Variant pileups of every sample for one contig.
#[derive(Debug, Clone)]
pub struct ContigPileups {
    id: String,
    mut_bulk: BTreeMap<u32, PileupRecord>,
    bg_bulk: BTreeMap<u32, PileupRecord>,
    mut_parent: BTreeMap<u32, PileupRecord>,
    bg_parent: BTreeMap<u32, PileupRecord>,
    parent_hemi: BTreeMap<u32, Ratio>,
    mask: Option<RepeatMask>,
}

impl ContigPileups {
    /// Empty store for contig `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mut_bulk: BTreeMap::new(),
            bg_bulk: BTreeMap::new(),
            mut_parent: BTreeMap::new(),
            bg_parent: BTreeMap::new(),
            parent_hemi: BTreeMap::new(),
            mask: None,
        }
    }

    /// Contig identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Records of one sample keyed by position.
    pub fn records(&self, sample: Sample) -> &BTreeMap<u32, PileupRecord> {
        match sample {
            Sample::MutantBulk => &self.mut_bulk,
            Sample::BackgroundBulk => &self.bg_bulk,
            Sample::MutantParent => &self.mut_parent,
            Sample::BackgroundParent => &self.bg_parent,
        }
    }

    /// Store a record, replacing any earlier record at the same position.
    pub fn insert(&mut self, sample: Sample, record: PileupRecord) {
        let store = match sample {
            Sample::MutantBulk => &mut self.mut_bulk,
            Sample::BackgroundBulk => &mut self.bg_bulk,
            Sample::MutantParent => &mut self.mut_parent,
            Sample::BackgroundParent => &mut self.bg_parent,
        };
        store.insert(record.position(), record);
    }

    /// Attach a repeat mask; masked positions are never classified.
    pub fn set_mask(&mut self, mask: RepeatMask) {
        self.mask = Some(mask);
    }

    /// Repeat mask, if any.
    pub fn mask(&self) -> Option<&RepeatMask> {
        self.mask.as_ref()
    }

    /// Whether `position` falls inside a masked interval.
    pub fn is_masked(&self, position: u32) -> bool {
        self.mask.as_ref().is_some_and(|mask| mask.contains(position))
    }

    /// Parental hemi-SNP positions recorded by [`Self::mark_parent_hemisnps`].
    pub fn parent_hemi(&self) -> &BTreeMap<u32, Ratio> {
        &self.parent_hemi
    }

    /// Whether any parental pileup was stored for this contig.
    pub fn has_parent_data(&self) -> bool {
        !self.mut_parent.is_empty() || !self.bg_parent.is_empty()
    }

    /// Bulk frequency ratios at every parental variant position.
    ///
    /// Positions seen in both parents get a two-sample ratio; positions seen in
    /// only one parent get a single-sample ratio.
    pub fn hemisnps_in_parent(
        &self,
        calc: &BfrCalculator,
        config: &AnalysisConfig,
    ) -> BTreeMap<u32, Ratio> {
        let mut hemi = BTreeMap::new();
        for (pos, mut_record) in &self.mut_parent {
            let mut_frac = mut_record.var_base_frac(config);
            let bg_frac = self.bg_parent.get(pos).map(|r| r.var_base_frac(config));
            hemi.insert(*pos, calc.ratio(&mut_frac, bg_frac.as_ref()));
        }
        for (pos, bg_record) in &self.bg_parent {
            hemi.entry(*pos)
                .or_insert_with(|| calc.ratio(&bg_record.var_base_frac(config), None));
        }
        hemi
    }

    /// Record parental hemi-SNPs before bulk comparison.
    pub fn mark_parent_hemisnps(&mut self, calc: &BfrCalculator, config: &AnalysisConfig) {
        self.parent_hemi = self.hemisnps_in_parent(calc, config);
    }

    /// Compare mutant and background bulks at every mutant variant position.
    ///
    /// A position homozygous in both bulks is dropped. In polyploidy mode,
    /// known parental hemi-SNPs are scored by bulk frequency ratio instead of
    /// zygosity; loci whose ratio is indeterminate are skipped.
    pub fn bulks_compared(&self, calc: &BfrCalculator, config: &AnalysisConfig) -> ComparedPositions {
        let mut compared = ComparedPositions::default();

        for (&pos, mut_record) in &self.mut_bulk {
            if self.is_masked(pos) {
                trace!(contig = %self.id, pos, "skipping masked position");
                continue;
            }

            if config.polyploidy && self.parent_hemi.contains_key(&pos) {
                let mut_frac = mut_record.var_base_frac(config);
                let bg_frac = self.bg_bulk.get(&pos).map(|r| r.var_base_frac(config));
                match calc.ratio(&mut_frac, bg_frac.as_ref()) {
                    Ratio::Value(bfr) => {
                        compared.hemi_pos.insert(pos, bfr);
                    }
                    Ratio::Indeterminate => {
                        trace!(contig = %self.id, pos, "complex hemi-SNP locus");
                    }
                }
                continue;
            }

            if let Some((zygosity, fraction)) = self.compare_pileup(pos, mut_record, config) {
                match zygosity {
                    Zygosity::Homozygous => {
                        compared.hm_pos.insert(pos, fraction);
                    }
                    Zygosity::Heterozygous => {
                        compared.ht_pos.insert(pos, fraction);
                    }
                    Zygosity::Indeterminate => {}
                }
            }
        }

        compared
    }

    fn compare_pileup(
        &self,
        pos: u32,
        mut_record: &PileupRecord,
        config: &AnalysisConfig,
    ) -> Option<(Zygosity, f64)> {
        let (mut_type, fraction) = zygosity_call(mut_record, config)?;

        let bg_type = self
            .bg_bulk
            .get(&pos)
            .and_then(|bg| zygosity_call(bg, config))
            .map(|(zygosity, _)| zygosity);

        if mut_type == Zygosity::Homozygous && bg_type == Some(Zygosity::Homozygous) {
            trace!(contig = %self.id, pos, "homozygous in both bulks");
            return None;
        }
        Some((mut_type, fraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str, config: &AnalysisConfig) -> PileupRecord {
        PileupRecord::parse(line, config).expect("valid pileup line")
    }

    fn store(config: &AnalysisConfig) -> ContigPileups {
        let mut pileups = ContigPileups::new("ctg1");
        pileups.insert(Sample::MutantBulk, record("ctg1\t10\tC\t10\tTTTTTTTTTT\tIIIIIIIIII", config));
        pileups.insert(Sample::MutantBulk, record("ctg1\t20\tT\t10\tAAAAA.....\tIIIIIIIIII", config));
        pileups.insert(Sample::MutantBulk, record("ctg1\t30\tC\t10\tGGGGGGGGGG\tIIIIIIIIII", config));
        pileups.insert(Sample::BackgroundBulk, record("ctg1\t30\tC\t10\tGGGGGGGGGG\tIIIIIIIIII", config));
        pileups.insert(Sample::MutantBulk, record("ctg1\t40\tA\t10\t.......,GG\tIIIIIIIIII", config));
        pileups
    }

    #[test]
    fn shared_homozygous_positions_are_dropped() {
        let config = AnalysisConfig::default();
        let calc = BfrCalculator::from_config(&config);
        let compared = store(&config).bulks_compared(&calc, &config);

        assert_eq!(compared.hm_pos.keys().copied().collect::<Vec<_>>(), vec![10]);
        assert_eq!(compared.ht_pos.keys().copied().collect::<Vec<_>>(), vec![20, 40]);
        assert!(!compared.hm_pos.contains_key(&30));
        assert!(compared.hemi_pos.is_empty());
    }

    #[test]
    fn masked_positions_are_not_classified() {
        let config = AnalysisConfig::default();
        let calc = BfrCalculator::from_config(&config);
        let mut pileups = store(&config);
        let mut mask = RepeatMask::new(100);
        mask.mark(5, 15);
        pileups.set_mask(mask);

        let compared = pileups.bulks_compared(&calc, &config);
        assert!(compared.hm_pos.is_empty());
        assert_eq!(compared.ht_pos.len(), 2);
    }

    #[test]
    fn parental_hemisnps_route_positions_to_bfr() {
        let config = AnalysisConfig::default().with_polyploidy(true);
        let calc = BfrCalculator::from_config(&config);
        let mut pileups = store(&config);
        pileups.insert(Sample::MutantParent, record("ctg1\t20\tT\t10\t.....AAAAA\tIIIIIIIIII", &config));
        pileups.insert(Sample::BackgroundParent, record("ctg1\t20\tT\t10\t.......AAA\tIIIIIIIIII", &config));
        pileups.insert(Sample::BackgroundParent, record("ctg1\t55\tG\t10\t.....CCCCC\tIIIIIIIIII", &config));
        pileups.insert(Sample::BackgroundBulk, record("ctg1\t20\tT\t10\t.........A\tIIIIIIIIII", &config));

        let parent_hemi = pileups.hemisnps_in_parent(&calc, &config);
        assert_eq!(parent_hemi.keys().copied().collect::<Vec<_>>(), vec![20, 55]);
        // 0.55/1.05 over 0.35/1.05
        let both = parent_hemi[&20].value().unwrap();
        assert!((both - 0.55 / 0.35).abs() < 1e-9);

        pileups.mark_parent_hemisnps(&calc, &config);
        let compared = pileups.bulks_compared(&calc, &config);
        assert!(compared.hemi_pos.contains_key(&20));
        assert!(!compared.ht_pos.contains_key(&20));
        // mutant {ref .5, A .5}; background {ref .9} with no A: 0.05/0.95
        let expected = (0.55 / 1.05) / (0.05 / 0.95);
        assert!((compared.hemi_pos[&20] - expected).abs() < 1e-9);
    }

    #[test]
    fn parental_hemisnps_ignored_without_polyploidy() {
        let config = AnalysisConfig::default();
        let calc = BfrCalculator::from_config(&config);
        let mut pileups = store(&config);
        pileups.insert(Sample::MutantParent, record("ctg1\t20\tT\t10\t.....AAAAA\tIIIIIIIIII", &config));
        pileups.mark_parent_hemisnps(&calc, &config);

        let compared = pileups.bulks_compared(&calc, &config);
        assert!(compared.hemi_pos.is_empty());
        assert!(compared.ht_pos.contains_key(&20));
    }

    #[test]
    fn hemisnp_without_background_record_uses_single_map_ratio() {
        let config = AnalysisConfig::default().with_polyploidy(true);
        let calc = BfrCalculator::from_config(&config);
        let mut pileups = store(&config);
        pileups.insert(Sample::MutantParent, record("ctg1\t20\tT\t10\t.....AAAAA\tIIIIIIIIII", &config));
        assert!(!pileups.records(Sample::BackgroundBulk).contains_key(&20));

        pileups.mark_parent_hemisnps(&calc, &config);
        let compared = pileups.bulks_compared(&calc, &config);
        assert!(!compared.ht_pos.contains_key(&20));
        // mutant {ref .5, A .5}: (0.55 / 1.05) / 0.05
        let expected = (0.55 / 1.05) / 0.05;
        assert!((compared.hemi_pos[&20] - expected).abs() < 1e-9);
    }

    #[test]
    fn indeterminate_bulk_ratio_leaves_hemisnp_unclassified() {
        let config = AnalysisConfig::default().with_polyploidy(true);
        let calc = BfrCalculator::from_config(&config);
        let mut pileups = store(&config);
        pileups.insert(Sample::MutantParent, record("ctg1\t50\tT\t10\t.....AAAAA\tIIIIIIIIII", &config));
        pileups.insert(Sample::MutantBulk, record("ctg1\t50\tT\t10\tAAAACCCC..\tIIIIIIIIII", &config));
        pileups.insert(Sample::BackgroundBulk, record("ctg1\t50\tT\t10\tAAACCCC...\tIIIIIIIIII", &config));

        pileups.mark_parent_hemisnps(&calc, &config);
        assert!(pileups.parent_hemi().contains_key(&50));
        let compared = pileups.bulks_compared(&calc, &config);
        assert!(!compared.hemi_pos.contains_key(&50));
        assert!(!compared.hm_pos.contains_key(&50));
        assert!(!compared.ht_pos.contains_key(&50));
        assert_eq!(compared.hm_pos.keys().copied().collect::<Vec<_>>(), vec![10]);
    }
}
