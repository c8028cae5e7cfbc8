use crate::config::AnalysisConfig;
use crate::genomics::{AlleleTag, BaseFractions};

/// Outcome of a bulk frequency ratio computation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Ratio {
    /// Ratio of the two allele fractions, always `>= 1` for two-map inputs.
    Value(f64),
    /// Neither input looked like a single-alternate locus.
    Indeterminate,
}

impl Ratio {
    /// Numeric value, if one was computed.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Indeterminate => None,
        }
    }
}

/// Shape of a fraction map as seen by the ratio selection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HemiShape {
    /// `{ref, alt}`.
    WithRef(AlleleTag),
    /// `{alt}`.
    AltOnly(AlleleTag),
    Other,
}

fn hemi_shape(fractions: &BaseFractions) -> HemiShape {
    match (fractions.hemi_alt(), fractions.len()) {
        (Some(alt), 2) => HemiShape::WithRef(alt),
        (Some(alt), 1) => HemiShape::AltOnly(alt),
        _ => HemiShape::Other,
    }
}

/// Computes bulk frequency ratios at hemi-SNP loci.
#[derive(Debug, Clone, Copy)]
pub struct BfrCalculator {
    adjust: f64,
}

impl BfrCalculator {
    /// Calculator with an explicit smoothing constant.
    pub fn new(adjust: f64) -> Self {
        Self { adjust }
    }

    /// Calculator using the configured `bfr_adjust`.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.bfr_adjust)
    }

    /// Smoothing constant in use.
    pub fn adjust(&self) -> f64 {
        self.adjust
    }

    /// Ratio between two samples, or a single-sample ratio when `other` is
    /// absent.
    ///
    /// With two maps, a `{ref, alt}` map is preferred over an `{alt}` map, and
    /// the first sample is preferred over the second at equal shape.
    pub fn ratio(&self, first: &BaseFractions, other: Option<&BaseFractions>) -> Ratio {
        match other {
            Some(second) => match (hemi_shape(first), hemi_shape(second)) {
                (HemiShape::WithRef(alt), _) => Ratio::Value(self.two_map(first, alt, second)),
                (_, HemiShape::WithRef(alt)) => Ratio::Value(self.two_map(second, alt, first)),
                (HemiShape::AltOnly(alt), _) => Ratio::Value(self.two_map(first, alt, second)),
                (_, HemiShape::AltOnly(alt)) => Ratio::Value(self.two_map(second, alt, first)),
                _ => Ratio::Indeterminate,
            },
            None => match hemi_shape(first) {
                HemiShape::WithRef(alt) | HemiShape::AltOnly(alt) => {
                    Ratio::Value(self.fraction(first, alt) / self.adjust)
                }
                HemiShape::Other => Ratio::Indeterminate,
            },
        }
    }

    /// Smoothed fraction of `alt` against the reference allele in `fractions`.
    ///
    /// A missing reference entry counts as zero. A missing `alt` entry yields
    /// `adjust / (ref + adjust)`.
    pub fn fraction(&self, fractions: &BaseFractions, alt: AlleleTag) -> f64 {
        let reference = fractions.get(AlleleTag::Ref).unwrap_or(0.0);
        match fractions.get(alt) {
            Some(alt_frac) => (alt_frac + self.adjust) / (alt_frac + reference + self.adjust),
            None => self.adjust / (reference + self.adjust),
        }
    }

    fn two_map(&self, clean: &BaseFractions, alt: AlleleTag, other: &BaseFractions) -> f64 {
        let frac_1 = self.fraction(clean, alt);
        let frac_2 = self.fraction(other, alt);
        frac_1.max(frac_2) / frac_1.min(frac_2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(AlleleTag, f64)]) -> BaseFractions {
        entries.iter().copied().collect()
    }

    fn approx(ratio: Ratio, expected: f64) {
        let value = ratio.value().expect("ratio should be numeric");
        assert!(
            (value - expected).abs() < 5e-3,
            "expected {expected}, got {value}"
        );
    }

    #[test]
    fn both_maps_with_reference() {
        let calc = BfrCalculator::new(0.05);
        let mutant = map(&[(AlleleTag::Ref, 0.75), (AlleleTag::C, 0.25)]);
        let background = map(&[(AlleleTag::Ref, 0.32), (AlleleTag::C, 0.68)]);
        approx(calc.ratio(&mutant, Some(&background)), 2.43);
    }

    #[test]
    fn background_reference_map_wins_over_alt_only_mutant() {
        let calc = BfrCalculator::new(0.05);
        let mutant = map(&[(AlleleTag::C, 0.95)]);
        let background = map(&[(AlleleTag::Ref, 0.32), (AlleleTag::A, 0.68)]);
        approx(calc.ratio(&mutant, Some(&background)), 1.44);
    }

    #[test]
    fn alt_only_against_reference_only() {
        let calc = BfrCalculator::new(0.05);
        let mutant = map(&[(AlleleTag::C, 0.95)]);
        let background = map(&[(AlleleTag::Ref, 0.95)]);
        let value = calc.ratio(&mutant, Some(&background)).value().unwrap();
        assert!((value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn complex_mutant_uses_clean_background() {
        let calc = BfrCalculator::new(0.05);
        let mutant = map(&[(AlleleTag::C, 0.35), (AlleleTag::Ref, 0.55), (AlleleTag::A, 0.10)]);
        let background = map(&[(AlleleTag::A, 0.95)]);
        approx(calc.ratio(&mutant, Some(&background)), 4.67);
    }

    #[test]
    fn complex_maps_are_indeterminate() {
        let calc = BfrCalculator::new(0.05);
        let complex = map(&[(AlleleTag::C, 0.35), (AlleleTag::Ref, 0.55), (AlleleTag::A, 0.10)]);
        assert_eq!(calc.ratio(&complex, Some(&complex.clone())), Ratio::Indeterminate);
        assert_eq!(calc.ratio(&complex, None), Ratio::Indeterminate);
    }

    #[test]
    fn single_map_ratio_divides_by_adjust() {
        let calc = BfrCalculator::new(0.05);
        let parent = map(&[(AlleleTag::Ref, 0.5), (AlleleTag::T, 0.5)]);
        // (0.5 + 0.05) / (1.0 + 0.05) / 0.05
        approx(calc.ratio(&parent, None), 10.476);
    }

    #[test]
    fn configured_adjust_scales_single_map_ratio() {
        let config = AnalysisConfig {
            bfr_adjust: 0.1,
            ..AnalysisConfig::default()
        };
        let calc = BfrCalculator::from_config(&config);
        assert_eq!(calc.adjust(), 0.1);

        let parent = map(&[(AlleleTag::G, 1.0)]);
        let expected = calc.fraction(&parent, AlleleTag::G) / calc.adjust();
        assert_eq!(calc.ratio(&parent, None), Ratio::Value(expected));
        approx(calc.ratio(&parent, None), 10.0);
    }

    #[test]
    fn ratio_is_direction_agnostic() {
        let calc = BfrCalculator::new(0.05);
        let a = map(&[(AlleleTag::Ref, 0.75), (AlleleTag::C, 0.25)]);
        let b = map(&[(AlleleTag::Ref, 0.32), (AlleleTag::C, 0.68)]);
        let forward = calc.ratio(&a, Some(&b)).value().unwrap();
        let backward = calc.ratio(&b, Some(&a)).value().unwrap();
        assert!((forward - backward).abs() < 1e-12);
        assert!(forward >= 1.0);
    }
}
