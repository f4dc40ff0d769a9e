use config::{Strand, MIN_BED_FIELDS, MIN_NAME_FIELDS, NAME_SEPARATOR};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

/// malformed reference rows
#[derive(Debug, Error, PartialEq)]
pub enum BedError {
    #[error("empty line")]
    Empty,
    #[error("expected at least {expected} fields, found {found}")]
    MissingFields { expected: usize, found: usize },
    #[error("cannot parse coordinate: {0}")]
    Coordinate(String),
    #[error("unknown feature kind: {0}")]
    Kind(String),
    #[error("cannot parse ordinal: {0}")]
    Ordinal(String),
    #[error("{0}")]
    Strand(String),
}

/// kind tag carried in the reference name field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    Exon,
    Intron,
    Utr5,
    Utr3,
    Gene,
}

impl FeatureKind {
    /// exon-like rows that are subtracted from gene bodies
    pub fn is_exonic(&self) -> bool {
        matches!(self, FeatureKind::Exon | FeatureKind::Utr5 | FeatureKind::Utr3)
    }

    /// rows never used as structural tokens
    pub fn is_anchor(&self) -> bool {
        matches!(self, FeatureKind::Utr5 | FeatureKind::Utr3 | FeatureKind::Gene)
    }
}

impl FromStr for FeatureKind {
    type Err = BedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "E" => Ok(FeatureKind::Exon),
            "RI" => Ok(FeatureKind::Intron),
            "U5" => Ok(FeatureKind::Utr5),
            "U3" => Ok(FeatureKind::Utr3),
            "G" => Ok(FeatureKind::Gene),
            _ => Err(BedError::Kind(s.to_string())),
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Exon => write!(f, "E"),
            FeatureKind::Intron => write!(f, "RI"),
            FeatureKind::Utr5 => write!(f, "U5"),
            FeatureKind::Utr3 => write!(f, "U3"),
            FeatureKind::Gene => write!(f, "G"),
        }
    }
}

/// strip the optional 'chr' prefix so circRNA tables and references agree
pub fn normalize_chrom(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

/// 1-based, inclusive genomic span
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomicInterval {
    pub chrom: String,
    pub start: u64,
    pub stop: u64,
    pub strand: Strand,
}

impl GenomicInterval {
    pub fn new(chrom: &str, start: u64, stop: u64, strand: Strand) -> Self {
        let (start, stop) = if start <= stop {
            (start, stop)
        } else {
            (stop, start)
        };

        Self {
            chrom: normalize_chrom(chrom).to_string(),
            start,
            stop,
            strand,
        }
    }

    /// inclusive overlap against [start, stop] on chrom
    #[inline(always)]
    pub fn overlaps(&self, chrom: &str, start: u64, stop: u64) -> bool {
        self.chrom == normalize_chrom(chrom) && self.start <= stop && self.stop >= start
    }

    /// number of bases between the edges
    #[inline(always)]
    pub fn span(&self) -> u64 {
        self.stop - self.start
    }
}

/// one row of the reference annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceFeature {
    pub gene: String,
    pub gene_id: String,
    pub interval: GenomicInterval,
    pub kind: FeatureKind,
    pub ordinal: Option<u32>,
    pub label: String,
}

impl ReferenceFeature {
    pub fn new(
        gene: &str,
        gene_id: &str,
        interval: GenomicInterval,
        kind: FeatureKind,
        ordinal: Option<u32>,
    ) -> Self {
        let mut label = format!(
            "{gene}{sep}{gene_id}{sep}{}{sep}{}{sep}{}{sep}{kind}",
            interval.chrom,
            interval.start,
            interval.stop,
            sep = NAME_SEPARATOR
        );

        if let Some(ordinal) = ordinal {
            label.push(NAME_SEPARATOR);
            label.push_str(&ordinal.to_string());
        }

        Self {
            gene: gene.to_string(),
            gene_id: gene_id.to_string(),
            interval,
            kind,
            ordinal,
            label,
        }
    }

    /// parse a 6-column reference row; positions come from the name field
    pub fn parse(line: &str) -> Result<Self, BedError> {
        if line.trim().is_empty() {
            return Err(BedError::Empty);
        }

        let fields = line.trim_end().split('\t').collect::<Vec<_>>();
        if fields.len() < MIN_BED_FIELDS {
            return Err(BedError::MissingFields {
                expected: MIN_BED_FIELDS,
                found: fields.len(),
            });
        }

        let strand = fields[5].parse::<Strand>().map_err(BedError::Strand)?;
        Self::from_label(fields[3], strand)
    }

    /// rebuild a feature from its `gene!gene_id!chrom!start!stop!kind[!ordinal]` label
    pub fn from_label(label: &str, strand: Strand) -> Result<Self, BedError> {
        let name = label.split(NAME_SEPARATOR).collect::<Vec<_>>();
        if name.len() < MIN_NAME_FIELDS {
            return Err(BedError::MissingFields {
                expected: MIN_NAME_FIELDS,
                found: name.len(),
            });
        }

        let coord = |field: &str| {
            field
                .parse::<u64>()
                .map_err(|_| BedError::Coordinate(field.to_string()))
        };

        let kind = name[5].parse::<FeatureKind>()?;
        let ordinal = match name.get(6) {
            Some(field) if !field.is_empty() => Some(
                field
                    .parse::<u32>()
                    .map_err(|_| BedError::Ordinal(field.to_string()))?,
            ),
            _ => None,
        };

        Ok(Self {
            gene: name[0].to_string(),
            gene_id: name[1].to_string(),
            interval: GenomicInterval::new(name[2], coord(name[3])?, coord(name[4])?, strand),
            kind,
            ordinal,
            label: label.to_string(),
        })
    }

    #[inline(always)]
    pub fn start(&self) -> u64 {
        self.interval.start
    }

    #[inline(always)]
    pub fn stop(&self) -> u64 {
        self.interval.stop
    }

    #[inline(always)]
    pub fn strand(&self) -> Strand {
        self.interval.strand
    }

    /// annotated length, inclusive
    #[inline(always)]
    pub fn length(&self) -> u64 {
        self.interval.span() + 1
    }

    /// 6-column BED row
    pub fn line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t0\t{}",
            self.interval.chrom,
            self.interval.start,
            self.interval.stop,
            self.label,
            self.interval.strand
        )
    }
}
