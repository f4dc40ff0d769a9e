//! circRNA annotation and sequence tables

use std::fmt::Debug;
use std::path::Path;

use anyhow::Result;
use circ_pack::normalize_chrom;
use config::{
    reader, Strand, INTERGENIC_MARKER, LEGACY_ID, MIN_TABLE_FIELDS, PARTIAL_SEQUENCE,
};
use hashbrown::{HashMap, HashSet};
use log::{info, warn};
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceState {
    Full(String),
    Partial,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircRna {
    pub id: String,
    pub chrom: String,
    pub start: u64,
    pub stop: u64,
    pub strand: Option<Strand>,
    pub coordinates: String,
    pub sequence: SequenceState,
    pub legacy: bool,
}

impl CircRna {
    /// parse one annotation row: `source_id, circ_id, coordinates, legacy_coordinates[, strand]`
    pub fn parse(line: &str) -> Result<Self, String> {
        let fields = line.trim_end_matches(&['\r', '\n'][..]).split('\t').collect::<Vec<_>>();
        if fields.len() < MIN_TABLE_FIELDS + 1 {
            return Err(format!(
                "expected at least {} fields, found {}",
                MIN_TABLE_FIELDS + 1,
                fields.len()
            ));
        }

        let strand = match fields.get(4).map(|s| s.trim()) {
            Some(s) if !s.is_empty() && s != "." => Some(s.parse::<Strand>()?),
            _ => None,
        };

        if fields[1] == LEGACY_ID {
            let legacy = fields[3].trim();
            if legacy.is_empty() {
                return Err("legacy record without legacy coordinates".to_string());
            }

            return Ok(Self {
                id: legacy.to_string(),
                chrom: String::new(),
                start: 0,
                stop: 0,
                strand,
                coordinates: legacy.to_string(),
                sequence: SequenceState::Missing,
                legacy: true,
            });
        }

        let (chrom, start, stop) = parse_coordinates(fields[2])?;

        Ok(Self {
            id: fields[1].to_string(),
            chrom,
            start,
            stop,
            strand,
            coordinates: fields[2].to_string(),
            sequence: SequenceState::Missing,
            legacy: false,
        })
    }

    /// `hsa-GENE_0001` -> `GENE`; intergenic and unstructured ids have none
    pub fn gene_hint(&self) -> Option<&str> {
        if self.is_intergenic() {
            return None;
        }

        let (_, rest) = self.id.split_once('-')?;
        let gene = rest.split('_').next()?;

        if gene.is_empty() {
            None
        } else {
            Some(gene)
        }
    }

    pub fn is_intergenic(&self) -> bool {
        self.id.contains(INTERGENIC_MARKER)
    }

    pub fn span(&self) -> u64 {
        self.stop - self.start
    }
}

/// `chr1:100|200` -> ("1", 100, 200)
pub fn parse_coordinates(coordinates: &str) -> Result<(String, u64, u64), String> {
    let (chrom, span) = coordinates
        .split_once(':')
        .ok_or_else(|| format!("cannot parse coordinates: {}", coordinates))?;
    let (start, stop) = span
        .split_once('|')
        .ok_or_else(|| format!("cannot parse coordinates: {}", coordinates))?;

    let pos = |x: &str| {
        x.trim()
            .parse::<u64>()
            .map_err(|_| format!("cannot parse coordinate {} in {}", x, coordinates))
    };

    let (start, stop) = (pos(start)?, pos(stop)?);
    if start > stop {
        return Err(format!("start > stop in {}", coordinates));
    }

    Ok((normalize_chrom(chrom).to_string(), start, stop))
}

fn body(contents: &str) -> Vec<&str> {
    contents
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .collect()
}

pub fn parse_circrnas(contents: &str) -> Vec<CircRna> {
    let records = body(contents)
        .par_iter()
        .filter_map(|line| {
            CircRna::parse(line)
                .map_err(|e| warn!("{} from: {}", e, line))
                .ok()
        })
        .collect::<Vec<_>>();

    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|circ| {
            let fresh = seen.insert(circ.id.clone());
            if !fresh {
                warn!("Duplicated circRNA id {}, keeping the first row", circ.id);
            }
            fresh
        })
        .collect()
}

/// `source_id, circ_id, sequence`
pub fn parse_sequences(contents: &str) -> HashMap<String, SequenceState> {
    body(contents)
        .par_iter()
        .filter_map(|line| {
            let fields = line.trim_end_matches(&['\r', '\n'][..]).split('\t').collect::<Vec<_>>();
            if fields.len() < MIN_TABLE_FIELDS {
                warn!("Missing sequence fields from: {}", line);
                return None;
            }

            let state = match fields[2].trim() {
                "" => SequenceState::Missing,
                PARTIAL_SEQUENCE => SequenceState::Partial,
                seq => SequenceState::Full(seq.to_string()),
            };

            Some((fields[1].to_string(), state))
        })
        .collect()
}

pub fn load_circrnas<P: AsRef<Path> + Debug + Send>(table: P, sequences: P) -> Result<Vec<CircRna>> {
    let (table, sequences) = rayon::join(|| reader(table), || reader(sequences));

    let mut records = parse_circrnas(&table?);
    let sequences = parse_sequences(&sequences?);

    records.par_iter_mut().for_each(|circ| {
        if let Some(state) = sequences.get(&circ.id) {
            circ.sequence = state.clone();
        }
    });

    if records.is_empty() {
        anyhow::bail!("No circRNA records found in the annotation table!");
    }

    info!(
        "circRNAs loaded: {} ({} with full sequence)",
        records.len(),
        records
            .iter()
            .filter(|c| matches!(c.sequence, SequenceState::Full(_)))
            .count()
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(
            parse_coordinates("chr1:100|200"),
            Ok(("1".to_string(), 100, 200))
        );
        assert!(parse_coordinates("chr1:200|100").is_err());
        assert!(parse_coordinates("chr1-100-200").is_err());
    }

    #[test]
    fn test_gene_hint() {
        let circ = CircRna::parse("src\thsa-MYC_0002\tchr8:100|200\tchr8:50|150").unwrap();
        assert_eq!(circ.gene_hint(), Some("MYC"));
        assert!(!circ.is_intergenic());

        let circ = CircRna::parse("src\thsa-intergenic_0002\tchr8:100|200\t").unwrap();
        assert_eq!(circ.gene_hint(), None);
        assert!(circ.is_intergenic());

        let circ = CircRna::parse("src\tcirc0001\tchr8:100|200\t").unwrap();
        assert_eq!(circ.gene_hint(), None);
    }

    #[test]
    fn test_legacy_record_uses_legacy_coordinates() {
        let circ = CircRna::parse("src\t-\tchr8:100|200\tchr8:50|150").unwrap();

        assert!(circ.legacy);
        assert_eq!(circ.id, "chr8:50|150");
        assert_eq!(circ.coordinates, "chr8:50|150");
    }

    #[test]
    fn test_optional_strand_column() {
        let circ = CircRna::parse("src\thsa-A_1\tchr1:1|2\t\t-").unwrap();
        assert_eq!(circ.strand, Some(Strand::Reverse));

        let circ = CircRna::parse("src\thsa-A_1\tchr1:1|2\t").unwrap();
        assert_eq!(circ.strand, None);
    }

    #[test]
    fn test_short_row_reports_field_count() {
        let err = CircRna::parse("src\thsa-A_1\tchr1:1|2").unwrap_err();
        assert_eq!(err, "expected at least 4 fields, found 3");
    }

    #[test]
    fn test_load_circrnas_attaches_sequences() {
        let mut table = NamedTempFile::new().unwrap();
        write!(
            table,
            "source\tid\tcoordinates\tlegacy\n\
             a\thsa-ABC_0001\tchr1:100|200\tchr1:10|20\n\
             b\thsa-ABC_0002\tchr1:300|400\tchr1:30|40\n\
             c\thsa-ABC_0001\tchr1:500|600\tchr1:50|60\n\
             d\thsa-ABC_0003\tchr1:700|800\tchr1:70|80\n"
        )
        .unwrap();

        let mut sequences = NamedTempFile::new().unwrap();
        write!(
            sequences,
            "source\tid\tsequence\n\
             a\thsa-ABC_0001\tACGTACGT\n\
             b\thsa-ABC_0002\tpartial\n"
        )
        .unwrap();

        let records = load_circrnas(table.path(), sequences.path()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sequence, SequenceState::Full("ACGTACGT".into()));
        assert_eq!(records[0].start, 100);
        assert_eq!(records[1].sequence, SequenceState::Partial);
        assert_eq!(records[2].sequence, SequenceState::Missing);
    }
}
