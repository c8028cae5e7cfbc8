use anyhow::{anyhow, Context, Result};
use std::io::Write;

use super::{BulkAnalysis, Contig, FlankProvider, Sample, ScoreType};

const HEADER: &str = "score\tallele_frequency\tsequence_id\tposition\treference_base\tcoverage\tbases\tbase_qualities\tleft_flank_sequence\talt_base\tright_flank_sequence\n";

fn report_positions(contig: &Contig, score_type: ScoreType) -> impl Iterator<Item = (u32, f64)> + '_ {
    let positions = match score_type {
        ScoreType::Hme => contig.hm_pos(),
        ScoreType::Bfr => contig.hemi_pos(),
    };
    positions.iter().map(|(pos, value)| (*pos, *value))
}

/// Write one row per retained position of every selected contig.
///
/// Rows follow assembly order, then position order.
pub fn write_report<W: Write>(
    writer: &mut W,
    analysis: &BulkAnalysis,
    score_type: ScoreType,
    flanks: &dyn FlankProvider,
) -> Result<usize> {
    writer.write_all(HEADER.as_bytes())?;

    let mut rows = 0;
    for contig in analysis.select(score_type) {
        let score = analysis.score(contig, score_type);
        let pileups = analysis
            .pileups(contig.id())
            .ok_or_else(|| anyhow!("no pileups stored for {}", contig.id()))?;

        for (pos, value) in report_positions(contig, score_type) {
            let Some(record) = pileups.records(Sample::MutantBulk).get(&pos) else {
                continue;
            };
            let (left, right) = flanks
                .flanks(contig, pos)
                .with_context(|| format!("failed to fetch flanks for {}:{}", contig.id(), pos))?;

            let line = format!(
                "{score:.4}\t{value:.4}\t{id}\t{pos}\t{ref_base}\t{coverage}\t{bases}\t{quals}\t{left}\t{alt}\t{right}\n",
                id = contig.id(),
                ref_base = record.ref_base(),
                coverage = record.coverage(),
                bases = record.read_bases(),
                quals = record.base_qualities(),
                alt = record.consensus_alt(),
            );
            writer.write_all(line.as_bytes())?;
            rows += 1;
        }
    }

    writer.flush()?;
    Ok(rows)
}

/// Render the report into a string (useful for tests and snapshots).
pub fn render_report(
    analysis: &BulkAnalysis,
    score_type: ScoreType,
    flanks: &dyn FlankProvider,
) -> Result<String> {
    let mut buffer = Vec::new();
    write_report(&mut buffer, analysis, score_type, flanks)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered report is not valid UTF-8"))
}
