use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::config::AnalysisConfig;

/// Nucleotide alphabet (including IUPAC ambiguity codes) allowed inside an
/// indel token.
const INDEL_ALPHABET: &[u8] = b"acgtryswkmbdhvnACGTRYSWKMBDHVN";

fn is_snp_mismatch(base: u8) -> bool {
    matches!(base, b'a' | b'c' | b'g' | b't' | b'A' | b'C' | b'G' | b'T')
}

/// Errors raised while parsing a single pileup line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PileupError {
    /// The line has fewer than the six mandatory columns.
    #[error("expected 6 tab-separated fields, found {0}")]
    MissingField(usize),

    /// A numeric column failed to parse.
    #[error("invalid {field} '{value}'")]
    InvalidInteger {
        /// Column name.
        field: &'static str,
        /// Raw column text.
        value: String,
    },

    /// The reference base column is empty.
    #[error("empty reference base")]
    EmptyReferenceBase,

    /// An indel token lacks its length prefix or is shorter than announced.
    #[error("malformed indel token '{0}'")]
    MalformedIndel(String),
}

/// Allele label used as key of a [`BaseFractions`] map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AlleleTag {
    /// Read agrees with the reference base.
    Ref,
    /// Adenine mismatch.
    A,
    /// Cytosine mismatch.
    C,
    /// Guanine mismatch.
    G,
    /// Thymine mismatch.
    T,
    /// Insertion or deletion starting after this position.
    Indel,
}

impl AlleleTag {
    /// Label as written in reports and bindings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ref => "ref",
            Self::A => "A",
            Self::C => "C",
            Self::G => "G",
            Self::T => "T",
            Self::Indel => "indel",
        }
    }
}

impl fmt::Display for AlleleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlleleTag {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ref" => Ok(Self::Ref),
            "A" | "a" => Ok(Self::A),
            "C" | "c" => Ok(Self::C),
            "G" | "g" => Ok(Self::G),
            "T" | "t" => Ok(Self::T),
            "indel" => Ok(Self::Indel),
            other => Err(format!("unknown allele tag '{other}'")),
        }
    }
}

/// Which kind of indel a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndelKind {
    /// `+N<bases>` tokens.
    Insertion,
    /// `-N<bases>` tokens.
    Deletion,
}

impl IndelKind {
    /// Delimiter character introducing the indel in the read-base string.
    pub fn delimiter(&self) -> char {
        match self {
            Self::Insertion => '+',
            Self::Deletion => '-',
        }
    }

    fn detect(read_bases: &str) -> Option<Self> {
        if read_bases.contains('+') {
            Some(Self::Insertion)
        } else if read_bases.contains('-') {
            Some(Self::Deletion)
        } else {
            None
        }
    }
}

/// Per-allele read counts observed at a pileup position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaseCounts {
    /// Reads matching the reference (`.` and `,`).
    pub reference: u32,
    /// Reads showing `A`/`a`.
    pub a: u32,
    /// Reads showing `C`/`c`.
    pub c: u32,
    /// Reads showing `G`/`g`.
    pub g: u32,
    /// Reads showing `T`/`t`.
    pub t: u32,
    /// Indel-bearing reads, present only when support reaches the configured minimum.
    pub indel: Option<u32>,
}

impl BaseCounts {
    fn count_snp_bases(read_bases: &str) -> Self {
        let mut counts = Self::default();
        for base in read_bases.bytes() {
            match base {
                b'.' | b',' => counts.reference += 1,
                b'a' | b'A' => counts.a += 1,
                b'c' | b'C' => counts.c += 1,
                b'g' | b'G' => counts.g += 1,
                b't' | b'T' => counts.t += 1,
                _ => {}
            }
        }
        counts
    }

    /// Count for a single allele, `None` when the indel slot is absent.
    pub fn get(&self, tag: AlleleTag) -> Option<u32> {
        match tag {
            AlleleTag::Ref => Some(self.reference),
            AlleleTag::A => Some(self.a),
            AlleleTag::C => Some(self.c),
            AlleleTag::G => Some(self.g),
            AlleleTag::T => Some(self.t),
            AlleleTag::Indel => self.indel,
        }
    }

    /// Iterate over every populated allele slot.
    pub fn iter(&self) -> impl Iterator<Item = (AlleleTag, u32)> + '_ {
        [
            AlleleTag::Ref,
            AlleleTag::A,
            AlleleTag::C,
            AlleleTag::G,
            AlleleTag::T,
            AlleleTag::Indel,
        ]
        .into_iter()
        .filter_map(|tag| self.get(tag).map(|count| (tag, count)))
    }

    /// Most frequent non-reference allele, if any read supports one.
    ///
    /// Ties resolve to the earliest tag in `A, C, G, T, indel` order.
    pub fn predominant_alt(&self) -> Option<AlleleTag> {
        let mut best: Option<(AlleleTag, u32)> = None;
        for (tag, count) in self.iter().filter(|(tag, _)| *tag != AlleleTag::Ref) {
            if count > best.map_or(0, |(_, c)| c) {
                best = Some((tag, count));
            }
        }
        best.map(|(tag, _)| tag)
    }
}

/// Allele fractions at one position, keyed by [`AlleleTag`].
///
/// Only alleles above the noise threshold are present, so the map may be
/// empty (low depth), hold a single allele, or several (complex locus).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseFractions(BTreeMap<AlleleTag, f64>);

impl BaseFractions {
    /// Empty fraction map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Fraction recorded for `tag`.
    pub fn get(&self, tag: AlleleTag) -> Option<f64> {
        self.0.get(&tag).copied()
    }

    /// Whether `tag` is present.
    pub fn contains(&self, tag: AlleleTag) -> bool {
        self.0.contains_key(&tag)
    }

    /// Number of alleles stored.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no allele passed the depth/noise filters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (AlleleTag, f64)> + '_ {
        self.0.iter().map(|(tag, frac)| (*tag, *frac))
    }

    /// Largest non-reference fraction (the predominant alternate allele).
    pub fn predominant_alt_fraction(&self) -> Option<f64> {
        self.iter()
            .filter(|(tag, _)| *tag != AlleleTag::Ref)
            .map(|(_, frac)| frac)
            .fold(None, |acc: Option<f64>, frac| Some(acc.map_or(frac, |a| a.max(frac))))
    }

    /// The single alternate allele of a hemi-SNP-shaped map.
    ///
    /// A map qualifies when it holds exactly one non-reference allele, either
    /// alone or paired with `ref`.
    pub fn hemi_alt(&self) -> Option<AlleleTag> {
        let mut alts = self.0.keys().filter(|tag| **tag != AlleleTag::Ref);
        let alt = *alts.next()?;
        if alts.next().is_some() {
            return None;
        }
        Some(alt)
    }
}

impl FromIterator<(AlleleTag, f64)> for BaseFractions {
    fn from_iter<I: IntoIterator<Item = (AlleleTag, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One parsed pileup line.
#[derive(Debug, Clone, PartialEq)]
pub struct PileupRecord {
    ref_name: String,
    position: u32,
    ref_base: char,
    coverage: u32,
    read_bases: String,
    base_qualities: String,
    counts: BaseCounts,
    indel_kind: Option<IndelKind>,
    non_ref_count: u32,
}

impl PileupRecord {
    /// Parse a tab-separated pileup line.
    ///
    /// Read-start markers (with their mapping-quality byte), read ends and
    /// deleted-base placeholders are stripped before counting.
    pub fn parse(line: &str, config: &AnalysisConfig) -> Result<Self, PileupError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 6 {
            return Err(PileupError::MissingField(fields.len()));
        }

        let position = parse_number(fields[1], "position")?;
        let ref_base = fields[2]
            .chars()
            .next()
            .ok_or(PileupError::EmptyReferenceBase)?;
        let coverage = parse_number(fields[3], "coverage")?;
        let read_bases = normalize_read_bases(fields[4]);

        let indel_kind = IndelKind::detect(&read_bases);
        let (counts, non_ref_count) = match indel_kind {
            Some(kind) => count_indel_bases(&read_bases, kind, config.min_indel_count_support)?,
            None => (
                BaseCounts::count_snp_bases(&read_bases),
                read_bases.bytes().filter(|b| is_snp_mismatch(*b)).count() as u32,
            ),
        };

        Ok(Self {
            ref_name: fields[0].to_string(),
            position,
            ref_base,
            coverage,
            read_bases,
            base_qualities: fields[5].to_string(),
            counts,
            indel_kind,
            non_ref_count,
        })
    }

    /// Contig name.
    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    /// 1-based position.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Reference base character.
    pub fn ref_base(&self) -> char {
        self.ref_base
    }

    /// Depth reported by the pileup itself.
    pub fn coverage(&self) -> u32 {
        self.coverage
    }

    /// Read-base string after marker removal.
    pub fn read_bases(&self) -> &str {
        &self.read_bases
    }

    /// Base-quality string as read.
    pub fn base_qualities(&self) -> &str {
        &self.base_qualities
    }

    /// Allele counts.
    pub fn bases_hash(&self) -> &BaseCounts {
        &self.counts
    }

    /// Indel type carried by the record.
    pub fn indel_kind(&self) -> Option<IndelKind> {
        self.indel_kind
    }

    /// Non-reference base count (indel-adjusted when the record carries indels).
    pub fn non_ref_count(&self) -> u32 {
        self.non_ref_count
    }

    /// Non-reference count over pileup depth.
    pub fn non_ref_ratio(&self) -> f64 {
        if self.coverage == 0 {
            return 0.0;
        }
        self.non_ref_count as f64 / self.coverage as f64
    }

    /// Allele fractions above noise, or an empty map below minimum depth.
    pub fn var_base_frac(&self, config: &AnalysisConfig) -> BaseFractions {
        if self.coverage == 0 || self.coverage < config.min_depth {
            return BaseFractions::new();
        }
        let coverage = self.coverage as f64;
        self.counts
            .iter()
            .map(|(tag, count)| (tag, count as f64 / coverage))
            .filter(|(_, frac)| *frac > config.noise)
            .collect()
    }

    /// Whether the record passes the variant-candidate filters.
    pub fn is_var(&self, config: &AnalysisConfig) -> bool {
        if self.ref_base == '*' {
            return false;
        }
        if config.ignore_ambiguous_ref && self.ref_base.eq_ignore_ascii_case(&'n') {
            return false;
        }
        self.coverage >= config.min_depth && self.non_ref_count >= config.min_non_ref_count
    }

    /// Predominant non-reference allele rendered for reports.
    pub fn consensus_alt(&self) -> String {
        match self.counts.predominant_alt() {
            Some(AlleleTag::Indel) => self
                .indel_kind
                .map(|kind| kind.delimiter().to_string())
                .unwrap_or_else(|| AlleleTag::Indel.to_string()),
            Some(tag) => tag.to_string(),
            None => self.ref_base.to_string(),
        }
    }
}

fn parse_number(value: &str, field: &'static str) -> Result<u32, PileupError> {
    value.trim().parse().map_err(|_| PileupError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

fn normalize_read_bases(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '^' => {
                chars.next();
            }
            '$' | '*' => {}
            other => out.push(other),
        }
    }
    out
}

/// Split an indel token into its announced length and the bases that follow
/// the indel sequence.
fn split_indel_token(token: &str) -> Result<(usize, &str), PileupError> {
    let digits = token.bytes().take_while(u8::is_ascii_digit).count();
    let malformed = || PileupError::MalformedIndel(token.to_string());

    let rest = &token[digits..];
    if digits == 0 || !rest.bytes().next().is_some_and(|b| INDEL_ALPHABET.contains(&b)) {
        return Err(malformed());
    }
    let length: usize = token[..digits].parse().map_err(|_| malformed())?;
    let span = rest.as_bytes().get(..length).ok_or_else(malformed)?;
    // every spanned byte is ASCII, so `length` is a char boundary
    if !span.iter().all(|b| INDEL_ALPHABET.contains(b)) {
        return Err(malformed());
    }
    Ok((length, &rest[length..]))
}

fn count_indel_bases(
    read_bases: &str,
    kind: IndelKind,
    min_support: u32,
) -> Result<(BaseCounts, u32), PileupError> {
    let mut tokens = read_bases.split(kind.delimiter());
    let mut snp_bases = String::with_capacity(read_bases.len());
    snp_bases.push_str(tokens.next().unwrap_or_default());

    let mut spanned = 0usize;
    for token in tokens {
        let (length, remainder) = split_indel_token(token)?;
        spanned += length;
        snp_bases.push_str(remainder);
    }

    let occurrences = read_bases.matches(kind.delimiter()).count();
    let mut counts = BaseCounts::count_snp_bases(&snp_bases);
    if occurrences as u32 >= min_support {
        counts.indel = Some(occurrences as u32);
    }

    let alphabet = read_bases
        .bytes()
        .filter(|b| INDEL_ALPHABET.contains(b))
        .count();
    let non_ref = (alphabet + occurrences).saturating_sub(spanned) as u32;
    Ok((counts, non_ref))
}
