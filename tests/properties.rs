use proptest::prelude::*;

use bulkrank::genomics::{
    classify, AlleleTag, BaseFractions, BfrCalculator, ComparedPositions, ContigSelector,
};
use bulkrank::{AnalysisConfig, Contig, PileupRecord, Ratio, ScoreType, Zygosity};

fn snp_base() -> impl Strategy<Value = char> {
    prop_oneof![
        Just('.'),
        Just(','),
        Just('A'),
        Just('c'),
        Just('G'),
        Just('t'),
    ]
}

fn clean_map(alt: AlleleTag) -> impl Strategy<Value = BaseFractions> {
    (0.11f64..1.0, prop::bool::ANY).prop_map(move |(alt_frac, with_ref)| {
        let mut entries = vec![(alt, alt_frac)];
        if with_ref && alt_frac < 0.89 {
            entries.push((AlleleTag::Ref, 1.0 - alt_frac));
        }
        entries.into_iter().collect()
    })
}

fn contig_with_counts(id: String, hm: u32, ht: u32, hemi: Vec<f64>) -> Contig {
    Contig::new(id, 10_000).with_positions(ComparedPositions {
        hm_pos: (0..hm).map(|p| (p + 1, 1.0)).collect(),
        ht_pos: (0..ht).map(|p| (p + 5_001, 0.5)).collect(),
        hemi_pos: hemi
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i as u32 + 9_001, v))
            .collect(),
    })
}

proptest! {
    #[test]
    fn classification_partitions_the_unit_interval(
        fraction in 0.0f64..=1.0,
        low in 0.0f64..=1.0,
        width in 0.0f64..=1.0,
    ) {
        let high = (low + width).min(1.0);
        let expected = if fraction >= low && fraction <= high {
            Zygosity::Heterozygous
        } else if fraction > high {
            Zygosity::Homozygous
        } else {
            Zygosity::Indeterminate
        };
        prop_assert_eq!(classify(fraction, low, high), expected);
    }

    #[test]
    fn clean_two_map_ratio_is_at_least_one(
        mutant in clean_map(AlleleTag::C),
        background in clean_map(AlleleTag::C),
        adjust in 0.01f64..0.5,
    ) {
        let calc = BfrCalculator::new(adjust);
        match calc.ratio(&mutant, Some(&background)) {
            Ratio::Value(bfr) => prop_assert!(bfr >= 1.0, "bfr {} below 1", bfr),
            Ratio::Indeterminate => prop_assert!(false, "clean maps must yield a ratio"),
        }
    }

    #[test]
    fn ratio_ignores_sample_order(
        mutant in clean_map(AlleleTag::G),
        reference_only in 0.11f64..=1.0,
    ) {
        let calc = BfrCalculator::new(0.05);
        let background: BaseFractions = [(AlleleTag::Ref, reference_only)].into_iter().collect();
        let forward = calc.ratio(&mutant, Some(&background)).value().unwrap();
        let backward = calc.ratio(&background, Some(&mutant)).value().unwrap();
        prop_assert!((forward - backward).abs() < 1e-12);
    }

    #[test]
    fn hme_score_matches_formula(hm in 0u32..50, ht in 0u32..50, adjust in 0.05f64..2.0) {
        let contig = contig_with_counts("ctg".to_string(), hm, ht, Vec::new());
        let score = contig.hme_score(adjust);
        if hm == 0 && ht == 0 {
            prop_assert_eq!(score, 0.0);
        } else {
            let expected = (hm as f64 + adjust) / (ht as f64 + adjust);
            prop_assert!((score - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn selection_is_idempotent_and_ordered(
        shapes in prop::collection::vec(
            (0u32..8, 0u32..8, prop::collection::vec(1.0f64..40.0, 0..4)),
            1..40,
        ),
    ) {
        let contigs: Vec<Contig> = shapes
            .into_iter()
            .enumerate()
            .map(|(i, (hm, ht, hemi))| contig_with_counts(format!("ctg{i:03}"), hm, ht, hemi))
            .collect();
        let config = AnalysisConfig::default();
        let selector = ContigSelector::new(&config);

        for score_type in [ScoreType::Hme, ScoreType::Bfr] {
            let ids = |selected: Vec<&Contig>| -> Vec<String> {
                selected.into_iter().map(|c| c.id().to_string()).collect()
            };
            let first = ids(selector.select(&contigs, score_type));
            let second = ids(selector.select(&contigs, score_type));
            prop_assert_eq!(&first, &second);

            let mut sorted = first.clone();
            sorted.sort();
            prop_assert_eq!(first, sorted, "selection must keep assembly order");
        }
    }

    #[test]
    fn snp_counts_cover_every_read(bases in prop::collection::vec(snp_base(), 1..60)) {
        let read_bases: String = bases.iter().collect();
        let line = format!(
            "ctg1\t7\tA\t{}\t{}\t{}",
            bases.len(),
            read_bases,
            "I".repeat(bases.len())
        );
        let record = PileupRecord::parse(&line, &AnalysisConfig::default()).unwrap();
        let counts = record.bases_hash();
        let total = counts.reference + counts.a + counts.c + counts.g + counts.t;
        prop_assert_eq!(total as usize, bases.len());
        prop_assert_eq!(counts.indel, None);

        let mismatches = bases.iter().filter(|b| b.is_ascii_alphabetic()).count();
        prop_assert_eq!(record.non_ref_count() as usize, mismatches);
    }
}
