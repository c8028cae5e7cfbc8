//! Python bindings that expose the bulk analysis via PyO3.
use std::collections::HashMap;
use std::path::PathBuf;

use pyo3::{
    exceptions::{PyRuntimeError, PyValueError},
    prelude::*,
    types::PyModule,
};

use crate::config::{AnalysisConfig, CrossType};
use crate::genomics::{
    classify, AlleleTag, BaseFractions, BfrCalculator, BulkAnalysis, Sample, ScoreType, Zygosity,
};

fn runtime_err(err: impl ToString) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

fn parse_sample(name: &str) -> PyResult<Sample> {
    Sample::ALL
        .into_iter()
        .find(|sample| sample.to_string() == name)
        .ok_or_else(|| PyValueError::new_err(format!("unknown sample '{name}'")))
}

fn parse_score_type(name: &str) -> PyResult<ScoreType> {
    match name {
        "hme" => Ok(ScoreType::Hme),
        "bfr" => Ok(ScoreType::Bfr),
        other => Err(PyValueError::new_err(format!(
            "unknown score type '{other}' (expected 'hme' or 'bfr')"
        ))),
    }
}

fn to_fractions(map: HashMap<String, f64>) -> PyResult<BaseFractions> {
    map.into_iter()
        .map(|(tag, frac)| {
            tag.parse::<AlleleTag>()
                .map(|tag| (tag, frac))
                .map_err(PyValueError::new_err)
        })
        .collect()
}

/// Zygosity of an allele fraction: `"het"`, `"hom"` or `None`.
#[pyfunction]
#[pyo3(signature = (fraction, ht_low = 0.2, ht_high = 0.9))]
pub fn zygosity(fraction: f64, ht_low: f64, ht_high: f64) -> Option<&'static str> {
    match classify(fraction, ht_low, ht_high) {
        Zygosity::Heterozygous => Some("het"),
        Zygosity::Homozygous => Some("hom"),
        Zygosity::Indeterminate => None,
    }
}

/// Bulk frequency ratio of one or two fraction dicts (keys `ref`, `A`, ...).
///
/// Returns `None` at complex loci.
#[pyfunction]
#[pyo3(signature = (first, other = None, adjust = 0.05))]
pub fn bfr(
    first: HashMap<String, f64>,
    other: Option<HashMap<String, f64>>,
    adjust: f64,
) -> PyResult<Option<f64>> {
    let first = to_fractions(first)?;
    let other = other.map(to_fractions).transpose()?;
    Ok(BfrCalculator::new(adjust).ratio(&first, other.as_ref()).value())
}

/// Python-facing wrapper around a whole-assembly analysis.
#[pyclass(name = "BulkAnalysis")]
#[derive(Debug)]
pub struct PyBulkAnalysis {
    inner: BulkAnalysis,
}

#[pymethods]
impl PyBulkAnalysis {
    #[new]
    #[pyo3(signature = (assembly, cross_type = "back", polyploidy = false))]
    /// Load the assembly FASTA with default thresholds.
    pub fn new(assembly: PathBuf, cross_type: &str, polyploidy: bool) -> PyResult<Self> {
        let cross_type: CrossType = cross_type
            .parse()
            .map_err(|err: crate::config::ConfigError| PyValueError::new_err(err.to_string()))?;
        let config = AnalysisConfig::default()
            .with_cross_type(cross_type)
            .with_polyploidy(polyploidy);
        let inner = BulkAnalysis::from_fasta(config, assembly).map_err(runtime_err)?;
        Ok(Self { inner })
    }

    /// Mask intervals listed in a RepeatMasker `.out` file.
    pub fn load_repeat_mask(&mut self, path: PathBuf) -> PyResult<usize> {
        self.inner.load_repeat_mask(path).map_err(runtime_err)
    }

    /// Ingest a pileup for `sample` (`mut_bulk`, `bg_bulk`, `mut_parent`,
    /// `bg_parent`).
    ///
    /// Returns:
    ///     `(lines, stored, over_max_depth)`.
    pub fn ingest(&mut self, sample: &str, path: PathBuf) -> PyResult<(usize, usize, usize)> {
        let sample = parse_sample(sample)?;
        let summary = self
            .inner
            .ingest_pileup_file(sample, path)
            .map_err(runtime_err)?;
        Ok((summary.lines, summary.stored, summary.over_max_depth))
    }

    /// Compare the bulks on every contig.
    pub fn compare(&mut self) {
        self.inner.compare_pileups();
    }

    /// Selected contigs as `(id, score)` pairs in assembly order.
    pub fn selected(&self, score_type: &str) -> PyResult<Vec<(String, f64)>> {
        let score_type = parse_score_type(score_type)?;
        Ok(self
            .inner
            .select(score_type)
            .into_iter()
            .map(|contig| (contig.id().to_string(), self.inner.score(contig, score_type)))
            .collect())
    }

    /// Re-verify homozygous positions against the background bulk and return
    /// the recomputed HME selection.
    pub fn verify(&mut self) -> Vec<(String, f64)> {
        let ids: Vec<String> = self
            .inner
            .verify_bg_bulk_pileup()
            .into_iter()
            .map(|contig| contig.id().to_string())
            .collect();
        ids.into_iter()
            .filter_map(|id| {
                let contig = self.inner.contig(&id)?;
                Some((id.clone(), self.inner.score(contig, ScoreType::Hme)))
            })
            .collect()
    }
}

/// Create Python module.
#[pymodule]
pub fn bulkrank_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(zygosity, m)?)?;
    m.add_function(wrap_pyfunction!(bfr, m)?)?;
    m.add_class::<PyBulkAnalysis>()?;
    Ok(())
}
