use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use dashmap::{DashMap, DashSet};
use log::info;
use serde::Serialize;

use config::{write_collection, DEBUG_SUFFIX, STATS_SUFFIX, UNKNOWN_GENE};

use crate::core::Resolution;
use crate::outcome::Outcome;
use crate::record::CircRna;

/// one output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub name: String,
    pub offset: u64,
    pub coordinates: String,
}

pub struct ParallelAccumulator {
    pub results: DashMap<String, Conversion>,
    pub outcomes: DashMap<String, Outcome>,
    pub pending: DashSet<String>,
}

impl ParallelAccumulator {
    pub fn new(records: &[CircRna]) -> Self {
        let pending = DashSet::with_capacity(records.len());
        records.iter().for_each(|circ| {
            pending.insert(circ.id.clone());
        });

        Self {
            results: DashMap::with_capacity(records.len()),
            outcomes: DashMap::with_capacity(records.len()),
            pending,
        }
    }

    /// first recorded outcome is terminal; returns the one in place
    pub fn record(&self, id: &str, outcome: Outcome) -> Outcome {
        *self.outcomes.entry(id.to_string()).or_insert(outcome)
    }

    pub fn resolve(&self, circ: &CircRna, resolution: &Resolution, outcome: Outcome) {
        self.record(&circ.id, outcome);
        self.finish(
            circ,
            Conversion {
                name: resolution.name(),
                offset: resolution.offset,
                coordinates: circ.coordinates.clone(),
            },
        );
    }

    pub fn retire_legacy(&self, circ: &CircRna, outcome: Outcome) {
        self.record(&circ.id, outcome);
        self.finish(
            circ,
            Conversion {
                name: UNKNOWN_GENE.to_string(),
                offset: 0,
                coordinates: circ.coordinates.clone(),
            },
        );
    }

    fn finish(&self, circ: &CircRna, conversion: Conversion) {
        self.results.insert(circ.id.clone(), conversion);
        self.pending.remove(&circ.id);
    }

    pub fn is_resolved(&self, id: &str) -> bool {
        self.results.contains_key(id)
    }

    pub fn outcome(&self, id: &str) -> Option<Outcome> {
        self.outcomes.get(id).map(|o| *o)
    }

    /// `id, name, offset, coordinates, outcome`, sorted by id
    pub fn rows(&self) -> Vec<String> {
        let mut rows = self
            .results
            .iter()
            .map(|entry| {
                let outcome = self
                    .outcome(entry.key())
                    .map_or_else(|| "NA".to_string(), |o| o.to_string());
                (
                    entry.key().clone(),
                    format!(
                        "{}\t{}\t{}\t{}\t{}",
                        entry.key(),
                        entry.name,
                        entry.offset,
                        entry.coordinates,
                        outcome
                    ),
                )
            })
            .collect::<Vec<_>>();

        rows.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        rows.into_iter().map(|(_, row)| row).collect()
    }

    pub fn stats(&self) -> ConversionStats {
        let mut outcomes = Outcome::ALL
            .iter()
            .map(|o| (o.to_string(), 0))
            .collect::<BTreeMap<_, _>>();

        self.outcomes.iter().for_each(|entry| {
            *outcomes.entry(entry.value().to_string()).or_insert(0) += 1;
        });

        ConversionStats {
            total: self.results.len(),
            pending: self.pending.len(),
            outcomes,
        }
    }
}

pub struct ParallelCounter {
    pub processed: AtomicU32,
    pub routed: AtomicU32,
}

impl ParallelCounter {
    pub fn inc_processed(&self, count: u32) {
        self.processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_routed(&self) {
        self.routed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_counters(&self) -> (u32, u32) {
        (
            self.processed.load(Ordering::Relaxed),
            self.routed.load(Ordering::Relaxed),
        )
    }

    pub fn reset(&self) {
        self.processed.store(0, Ordering::Relaxed);
        self.routed.store(0, Ordering::Relaxed);
    }
}

impl Default for ParallelCounter {
    fn default() -> Self {
        Self {
            processed: AtomicU32::new(0),
            routed: AtomicU32::new(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub total: usize,
    pub pending: usize,
    pub outcomes: BTreeMap<String, usize>,
}

/// `<output>.stats.json`
pub fn stats_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".");
    name.push(STATS_SUFFIX);
    PathBuf::from(name)
}

pub fn write_results(accumulator: &ParallelAccumulator, output: &Path) -> Result<ConversionStats> {
    write_collection(&accumulator.rows(), output)?;

    let stats = accumulator.stats();
    for (outcome, count) in stats.outcomes.iter() {
        info!("{:<20} {}", outcome, count);
    }

    let path = stats_path(output);
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, &stats)?;
    writer.flush()?;

    Ok(stats)
}

/// merged evidence rows plus the circRNA span carrying its new name
pub fn write_debug_bed(dir: &Path, circ: &CircRna, resolution: &Resolution) -> Result<()> {
    let fname = circ
        .id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "-_.".contains(c) { c } else { '_' })
        .collect::<String>();

    let mut writer = BufWriter::new(File::create(dir.join(format!("{}.{}", fname, DEBUG_SUFFIX)))?);
    for line in resolution.evidence.iter() {
        writeln!(writer, "{}", line)?;
    }
    writeln!(
        writer,
        "{}\t{}\t{}\t{}\t0\t{}",
        circ.chrom,
        circ.start,
        circ.stop,
        resolution.name(),
        resolution.strand
    )?;

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::Token;
    use crate::record::SequenceState;
    use config::Strand;

    fn circ(id: &str) -> CircRna {
        CircRna {
            id: id.to_string(),
            chrom: "1".to_string(),
            start: 100,
            stop: 200,
            strand: None,
            coordinates: "chr1:100|200".to_string(),
            sequence: SequenceState::Missing,
            legacy: false,
        }
    }

    fn resolution() -> Resolution {
        Resolution {
            gene: "ABC".to_string(),
            strand: Strand::Forward,
            tokens: vec![Token::exon(1)],
            offset: 0,
            evidence: vec!["1\t100\t200\tABC!01!1!100!200!E!1\t0\t+".to_string()],
            intron_only: false,
        }
    }

    #[test]
    fn test_first_outcome_is_terminal() {
        let records = vec![circ("b"), circ("a")];
        let acc = ParallelAccumulator::new(&records);

        assert_eq!(acc.record("a", Outcome::NoBlastHit), Outcome::NoBlastHit);
        acc.resolve(&records[1], &resolution(), Outcome::Bedtools);

        assert_eq!(acc.outcome("a"), Some(Outcome::NoBlastHit));
        assert_eq!(acc.pending.len(), 1);
        assert!(acc.is_resolved("a"));
        assert!(!acc.is_resolved("b"));
    }

    #[test]
    fn test_rows_are_sorted_by_id() {
        let records = vec![circ("b"), circ("a")];
        let acc = ParallelAccumulator::new(&records);

        acc.resolve(&records[0], &resolution(), Outcome::BlastHit);
        acc.retire_legacy(&records[1], Outcome::OldGenome);

        assert_eq!(
            acc.rows(),
            vec![
                "a\tNA\t0\tchr1:100|200\tOLD_GENOME".to_string(),
                "b\tcircABC(1)\t0\tchr1:100|200\tBLAST_HIT".to_string(),
            ]
        );
        assert!(acc.pending.is_empty());
    }

    #[test]
    fn test_stats_count_every_outcome() {
        let records = vec![circ("a"), circ("b"), circ("c")];
        let acc = ParallelAccumulator::new(&records);

        acc.resolve(&records[0], &resolution(), Outcome::BlastHit);
        acc.resolve(&records[1], &resolution(), Outcome::BlastHit);
        acc.resolve(&records[2], &resolution(), Outcome::Bedtools);

        let stats = acc.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.outcomes["BLAST_HIT"], 2);
        assert_eq!(stats.outcomes["BEDTOOLS"], 1);
        assert_eq!(stats.outcomes["OLD_GENOME"], 0);
        assert_eq!(stats.outcomes.len(), Outcome::ALL.len());
    }

    #[test]
    fn test_write_results_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("mapping.tsv");

        let records = vec![circ("a")];
        let acc = ParallelAccumulator::new(&records);
        acc.resolve(&records[0], &resolution(), Outcome::BlastHit);

        write_results(&acc, &output).unwrap();

        let table = std::fs::read_to_string(&output).unwrap();
        assert_eq!(table, "a\tcircABC(1)\t0\tchr1:100|200\tBLAST_HIT\n");

        let stats = std::fs::read_to_string(stats_path(&output)).unwrap();
        let stats: serde_json::Value = serde_json::from_str(&stats).unwrap();
        assert_eq!(stats["outcomes"]["BLAST_HIT"], 1);
        assert_eq!(stats["pending"], 0);
    }

    #[test]
    fn test_debug_bed() {
        let dir = tempfile::tempdir().unwrap();
        write_debug_bed(dir.path(), &circ("hsa-ABC_1|x"), &resolution()).unwrap();

        let bed = std::fs::read_to_string(dir.path().join("hsa-ABC_1_x.bed")).unwrap();
        let lines = bed.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "1\t100\t200\tcircABC(1)\t0\t+");
    }
}
