use serde::Serialize;
use thiserror::Error;

use std::fmt;

use crate::align::AlignError;

/// terminal classification of a circRNA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    BlastHit,
    Bedtools,
    NoBlastHit,
    EmptyBlastDb,
    EmptyBedIntersect,
    Partial,
    Intergenic,
    OldGenome,
}

impl Outcome {
    pub const ALL: [Outcome; 8] = [
        Outcome::BlastHit,
        Outcome::Bedtools,
        Outcome::NoBlastHit,
        Outcome::EmptyBlastDb,
        Outcome::EmptyBedIntersect,
        Outcome::Partial,
        Outcome::Intergenic,
        Outcome::OldGenome,
    ];
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Outcome::BlastHit => "BLAST_HIT",
            Outcome::Bedtools => "BEDTOOLS",
            Outcome::NoBlastHit => "NO_BLAST_HIT",
            Outcome::EmptyBlastDb => "EMPTY_BLAST_DB",
            Outcome::EmptyBedIntersect => "EMPTY_BED_INTERSECT",
            Outcome::Partial => "PARTIAL",
            Outcome::Intergenic => "INTERGENIC",
            Outcome::OldGenome => "OLD_GENOME",
        };

        write!(f, "{}", tag)
    }
}

/// expected reasons a circRNA leaves the evidence path
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no sequence available")]
    NoSequence,
    #[error("sequence is partial")]
    PartialSequence,
    #[error("intergenic circRNA")]
    Intergenic,
    #[error("no candidate features for gene {0}")]
    EmptySearchSpace(String),
    #[error("no candidate feature intersects the circRNA")]
    EmptyIntersection,
    #[error("no usable alignment hit")]
    NoAlignmentHit,
    #[error("legacy record")]
    LegacyRecord,
}

impl RouteError {
    /// outcome recorded when routing; `None` leaves the record unclassified
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            RouteError::NoSequence => None,
            RouteError::PartialSequence => Some(Outcome::Partial),
            RouteError::Intergenic => Some(Outcome::Intergenic),
            RouteError::EmptySearchSpace(_) => Some(Outcome::EmptyBlastDb),
            RouteError::EmptyIntersection => Some(Outcome::EmptyBedIntersect),
            RouteError::NoAlignmentHit => Some(Outcome::NoBlastHit),
            RouteError::LegacyRecord => Some(Outcome::OldGenome),
        }
    }

    /// split adapter failures into routable ones and fatal ones
    pub fn from_align(err: AlignError) -> Result<RouteError, AlignError> {
        match err {
            AlignError::NoSequence(_) => Ok(RouteError::NoSequence),
            AlignError::EmptySearchSpace(id) => Ok(RouteError::EmptySearchSpace(id)),
            fatal => Err(fatal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_tags() {
        assert_eq!(Outcome::BlastHit.to_string(), "BLAST_HIT");
        assert_eq!(Outcome::EmptyBedIntersect.to_string(), "EMPTY_BED_INTERSECT");
        assert_eq!(
            serde_json::to_string(&Outcome::OldGenome).unwrap(),
            "\"OLD_GENOME\""
        );
    }

    #[test]
    fn test_route_error_outcomes() {
        assert_eq!(RouteError::NoSequence.outcome(), None);
        assert_eq!(RouteError::PartialSequence.outcome(), Some(Outcome::Partial));
        assert_eq!(
            RouteError::EmptySearchSpace("ABC".into()).outcome(),
            Some(Outcome::EmptyBlastDb)
        );
        assert_eq!(RouteError::LegacyRecord.outcome(), Some(Outcome::OldGenome));
    }

    #[test]
    fn test_fatal_alignment_errors_are_not_routed() {
        assert_eq!(
            RouteError::from_align(AlignError::NoSequence("x".into())).ok(),
            Some(RouteError::NoSequence)
        );
        assert!(RouteError::from_align(AlignError::ToolNotFound("blastn".into())).is_err());
    }
}
