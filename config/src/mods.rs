use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// genomic strand of a feature or circRNA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn is_reverse(&self) -> bool {
        matches!(self, Strand::Reverse)
    }
}

impl FromStr for Strand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "plus" => Ok(Strand::Forward),
            "-" | "minus" => Ok(Strand::Reverse),
            _ => Err(format!("ERROR: Strand is not + or -: {}", s)),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// half-open [start, end) range of rows handed to a single worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRegion {
    pub start: usize,
    pub end: usize,
}

impl ChunkRegion {
    /// split `total` rows into consecutive regions of at most `size` rows
    pub fn partition(total: usize, size: usize) -> Vec<ChunkRegion> {
        let size = size.max(1);

        (0..total)
            .step_by(size)
            .map(|start| ChunkRegion {
                start,
                end: (start + size).min(total),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_from_blast_and_bed_notation() {
        assert_eq!("+".parse::<Strand>().unwrap(), Strand::Forward);
        assert_eq!("minus".parse::<Strand>().unwrap(), Strand::Reverse);
        assert!(".".parse::<Strand>().is_err());
        assert_eq!(Strand::Reverse.to_string(), "-");
    }

    #[test]
    fn test_chunk_partition_covers_all_rows() {
        let chunks = ChunkRegion::partition(25, 10);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], ChunkRegion { start: 0, end: 10 });
        assert_eq!(chunks[2], ChunkRegion { start: 20, end: 25 });
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 25);
    }

    #[test]
    fn test_chunk_partition_empty_input() {
        assert!(ChunkRegion::partition(0, 10).is_empty());
        assert_eq!(ChunkRegion::partition(3, 0).len(), 3);
    }
}
