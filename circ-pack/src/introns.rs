use config::Strand;
use hashbrown::HashMap;
use rayon::prelude::*;

use crate::record::{FeatureKind, GenomicInterval, ReferenceFeature};

type ExonicTrack = (Vec<(u64, u64)>, u64);

/// Derives retained-intron candidates as gene bodies minus exonic rows
///
/// Rows are handled as half-open intervals, the same way the interval
/// subtraction of the annotation preparation step treats them. Every exon or
/// UTR on the same chromosome and strand is subtracted, regardless of gene.
///
/// # Arguments
///
/// * `features` - reference rows, gene bodies and exonic rows mixed
///
/// # Returns
///
/// * `Vec<ReferenceFeature>` - one `RI` feature per remaining gene piece
///
/// # Example
///
/// ```rust, ignore
/// let introns = derive_introns(&features);
/// assert!(introns.iter().all(|f| f.kind == FeatureKind::Intron));
/// ```
pub fn derive_introns(features: &[ReferenceFeature]) -> Vec<ReferenceFeature> {
    let tracks = exonic_tracks(features);

    let mut introns = features
        .par_iter()
        .filter(|f| f.kind == FeatureKind::Gene)
        .flat_map_iter(|gene| {
            let key = (gene.interval.chrom.clone(), gene.strand());
            let pieces = match tracks.get(&key) {
                Some(track) => subtract(gene.start(), gene.stop(), track),
                None => vec![(gene.start(), gene.stop())],
            };

            pieces.into_iter().map(move |(start, stop)| {
                ReferenceFeature::new(
                    &gene.gene,
                    &gene.gene_id,
                    GenomicInterval::new(&gene.interval.chrom, start, stop, gene.strand()),
                    FeatureKind::Intron,
                    None,
                )
            })
        })
        .collect::<Vec<_>>();

    introns.par_sort_unstable_by(|a, b| {
        (&a.interval.chrom, a.start(), a.stop()).cmp(&(&b.interval.chrom, b.start(), b.stop()))
    });

    introns
}

/// exonic rows per (chrom, strand), sorted by start, with the longest row length
fn exonic_tracks(features: &[ReferenceFeature]) -> HashMap<(String, Strand), ExonicTrack> {
    let mut tracks: HashMap<(String, Strand), ExonicTrack> = HashMap::new();

    for feature in features.iter().filter(|f| f.kind.is_exonic()) {
        let track = tracks
            .entry((feature.interval.chrom.clone(), feature.strand()))
            .or_default();

        track.0.push((feature.start(), feature.stop()));
        track.1 = track.1.max(feature.interval.span());
    }

    tracks
        .par_iter_mut()
        .for_each(|(_, (rows, _))| rows.sort_unstable());

    tracks
}

/// half-open [start, stop) minus the union of every overlapping row
#[inline(always)]
fn subtract(start: u64, stop: u64, track: &ExonicTrack) -> Vec<(u64, u64)> {
    let (rows, max_span) = track;

    let lower = rows.partition_point(|(s, _)| *s < start.saturating_sub(*max_span));
    let upper = rows.partition_point(|(s, _)| *s < stop);

    let mut pieces = Vec::new();
    let mut cursor = start;

    for &(s, e) in rows[lower..upper].iter() {
        if e <= start {
            continue;
        }

        if s > cursor {
            pieces.push((cursor, s));
        }
        cursor = cursor.max(e);

        if cursor >= stop {
            break;
        }
    }

    if cursor < stop {
        pieces.push((cursor, stop));
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, start: u64, stop: u64, strand: &str, ordinal: Option<u32>) -> ReferenceFeature {
        let ordinal = ordinal.map(|o| format!("!{}", o)).unwrap_or_default();
        let line = format!(
            "1\t{start}\t{stop}\tGENE!000001!1!{start}!{stop}!{kind}{ordinal}\t0\t{strand}"
        );
        ReferenceFeature::parse(&line).unwrap()
    }

    #[test]
    fn test_derive_introns_between_exons() {
        let features = vec![
            row("G", 100, 1000, "+", None),
            row("E", 100, 200, "+", Some(1)),
            row("E", 400, 500, "+", Some(2)),
            row("E", 800, 1000, "+", Some(3)),
        ];

        let introns = derive_introns(&features);
        let spans = introns
            .iter()
            .map(|i| (i.start(), i.stop()))
            .collect::<Vec<_>>();

        assert_eq!(spans, vec![(200, 400), (500, 800)]);
        assert!(introns.iter().all(|i| i.kind == FeatureKind::Intron));
        assert_eq!(introns[0].label, "GENE!000001!1!200!400!RI");
    }

    #[test]
    fn test_derive_introns_is_strand_aware() {
        let features = vec![
            row("G", 100, 1000, "+", None),
            row("E", 100, 200, "+", Some(1)),
            row("E", 400, 500, "-", Some(1)),
        ];

        let introns = derive_introns(&features);
        let spans = introns
            .iter()
            .map(|i| (i.start(), i.stop()))
            .collect::<Vec<_>>();

        assert_eq!(spans, vec![(200, 1000)]);
    }

    #[test]
    fn test_derive_introns_merges_overlapping_exons() {
        let features = vec![
            row("G", 100, 1000, "-", None),
            row("E", 150, 300, "-", Some(2)),
            row("E", 250, 350, "-", Some(3)),
            row("U3", 900, 1000, "-", Some(1)),
        ];

        let introns = derive_introns(&features);
        let spans = introns
            .iter()
            .map(|i| (i.start(), i.stop()))
            .collect::<Vec<_>>();

        assert_eq!(spans, vec![(100, 150), (350, 900)]);
    }

    #[test]
    fn test_gene_without_exons_is_one_intron() {
        let features = vec![row("G", 100, 1000, "+", None)];
        let introns = derive_introns(&features);

        assert_eq!(introns.len(), 1);
        assert_eq!((introns[0].start(), introns[0].stop()), (100, 1000));
    }
}
