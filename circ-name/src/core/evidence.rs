//! Evidence path: names a circRNA from its alignment hits
//!
//! Hits are filtered to one best row per feature, projected back to genomic
//! coordinates and reconciled into an ordered token list. Boundary offsets
//! are measured against the annotated edges of the outer tokens; large
//! offsets trigger a search for a better exon in a flanking window and, when
//! none fits, the far side becomes a novel exon.

use circ_pack::{intersect, FeatureKind, ReferenceFeature};
use config::{
    Strand, CATASTROPHIC_OFFSET, FIX_FLANK, INTRON_COVERAGE_THRESHOLD, MATERIAL_OFFSET,
    PREFILTER_FLANK,
};
use hashbrown::HashMap;
use log::debug;

use super::fit::{best_fit, replace_far_sides, side_fits, Fit};
use super::token::{flank_novel, Boundary, Label, Side, Token};
use super::Resolution;
use crate::align::{Aligner, AlignmentHit, AlignmentQuery};
use crate::outcome::RouteError;
use crate::record::{CircRna, SequenceState};

/// one projected hit
#[derive(Debug, Clone)]
struct Evidence<'a> {
    feature: &'a ReferenceFeature,
    start: u64,
    stop: u64,
    intronic: bool,
    token: Token,
}

impl Evidence<'_> {
    fn line(&self, chrom: &str) -> String {
        format!(
            "{}\t{}\t{}\t{}\t0\t{}",
            chrom,
            self.start,
            self.stop,
            self.feature.label,
            self.feature.strand()
        )
    }
}

/// route one circRNA through the aligner; fatal adapter errors propagate
pub fn resolve_with_alignment<A: Aligner + ?Sized>(
    circ: &CircRna,
    gene_features: &[&ReferenceFeature],
    aligner: &A,
) -> anyhow::Result<Result<Resolution, RouteError>> {
    if circ.legacy {
        return Ok(Err(RouteError::LegacyRecord));
    }

    let sequence = match &circ.sequence {
        SequenceState::Full(seq) => seq.as_str(),
        SequenceState::Partial => return Ok(Err(RouteError::PartialSequence)),
        SequenceState::Missing => return Ok(Err(RouteError::NoSequence)),
    };

    if circ.is_intergenic() {
        return Ok(Err(RouteError::Intergenic));
    }

    let Some(gene) = circ.gene_hint() else {
        return Ok(Err(RouteError::EmptySearchSpace(circ.id.clone())));
    };

    if gene_features.is_empty() {
        return Ok(Err(RouteError::EmptySearchSpace(gene.to_string())));
    }

    let body = gene_features
        .iter()
        .copied()
        .filter(|f| f.kind != FeatureKind::Gene);
    let candidates = intersect(
        body,
        &circ.chrom,
        circ.start.saturating_sub(PREFILTER_FLANK),
        circ.stop + PREFILTER_FLANK,
    );

    if candidates.is_empty() {
        return Ok(Err(RouteError::EmptyIntersection));
    }

    let query = AlignmentQuery {
        id: &circ.id,
        coordinates: &circ.coordinates,
        sequence: Some(sequence),
        candidates: candidates.iter().map(|f| f.label.as_str()).collect(),
    };

    let hits = match aligner.align(&query) {
        Ok(hits) => hits,
        Err(err) => return Ok(Err(RouteError::from_align(err)?)),
    };

    let strand = circ
        .strand
        .or_else(|| candidates.last().map(|f| f.strand()))
        .unwrap_or_default();

    Ok(reconcile_hits(circ, gene, strand, &hits, gene_features))
}

/// keep the highest identity row per feature, first seen wins ties
fn best_hits<'a>(
    hits: &'a [AlignmentHit],
    features: &HashMap<&str, &'a ReferenceFeature>,
) -> Vec<(&'a AlignmentHit, &'a ReferenceFeature)> {
    let mut kept: Vec<(&AlignmentHit, &ReferenceFeature)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for hit in hits {
        let Some(&feature) = features.get(hit.subject.as_str()) else {
            debug!("{}: hit outside candidate set {}", hit.query, hit.subject);
            continue;
        };

        if feature.kind.is_anchor() {
            continue;
        }

        match slots.get(hit.subject.as_str()) {
            Some(&idx) => {
                if hit.identity > kept[idx].0.identity {
                    kept[idx] = (hit, feature);
                }
            }
            None => {
                slots.insert(hit.subject.as_str(), kept.len());
                kept.push((hit, feature));
            }
        }
    }

    kept
}

fn project<'a>(hit: &AlignmentHit, feature: &'a ReferenceFeature) -> Evidence<'a> {
    let (lo, hi) = hit.subject_span();
    let start = feature.start() + lo.saturating_sub(1);
    let stop = feature.start() + hi;

    let (intronic, label) = match (feature.kind, feature.ordinal) {
        (FeatureKind::Intron, _) => {
            let coverage = (hi - lo) as f64 / feature.interval.span().max(1) as f64;
            if coverage < INTRON_COVERAGE_THRESHOLD {
                (true, Label::Novel)
            } else {
                (true, Label::Intron)
            }
        }
        (FeatureKind::Exon, Some(ordinal)) => (false, Label::Exon(ordinal)),
        _ => (false, Label::Novel),
    };

    Evidence {
        feature,
        start,
        stop,
        intronic,
        token: Token::new(label),
    }
}

/// flag exon edges encroached by an intronic interval
fn mark_encroached(evidence: &mut [Evidence]) {
    let introns = evidence
        .iter()
        .filter(|e| e.intronic)
        .map(|e| (e.start, e.stop))
        .collect::<Vec<_>>();

    for exon in evidence.iter_mut().filter(|e| e.token.ordinal().is_some()) {
        for &(start, stop) in &introns {
            if start < exon.stop && exon.stop < stop {
                exon.token.right.flag = true;
            } else if start < exon.start && exon.start < stop {
                exon.token.left.flag = true;
            }
        }
    }
}

/// drop intervals contained in an earlier one, genomic order
fn merge_contained(mut evidence: Vec<Evidence>) -> Vec<Evidence> {
    evidence.sort_by(|a, b| a.start.cmp(&b.start).then(b.stop.cmp(&a.stop)));

    let mut reach = 0;
    let mut merged: Vec<Evidence> = Vec::with_capacity(evidence.len());
    for ev in evidence {
        if !merged.is_empty() && ev.stop <= reach {
            continue;
        }
        reach = reach.max(ev.stop);
        merged.push(ev);
    }

    merged
}

/// rebuild one side against the closest exon in the flanking window
fn refit(tokens: &mut Vec<Token>, side: Side, fit: Fit) {
    let end = match side {
        Side::Start => 0,
        Side::Stop => tokens.len() - 1,
    };

    // same exon: only the modifier moves, encroachment flags stay
    if tokens[end].ordinal() == Some(fit.ordinal) {
        tokens[end].edge_mut(side).boundary = fit.boundary();
        return;
    }

    let token = fit.token(side);
    let single = tokens.len() == 1;

    match (side, single) {
        (Side::Start, true) => {
            tokens[0].strip(Side::Start);
            tokens.insert(0, token);
        }
        (Side::Stop, true) => {
            tokens[0].strip(Side::Stop);
            tokens.push(token);
        }
        (Side::Start, false) => tokens[0] = token,
        (Side::Stop, false) => {
            let last = tokens.len() - 1;
            tokens[last] = token;
        }
    }
}

pub fn reconcile_hits(
    circ: &CircRna,
    gene: &str,
    strand: Strand,
    hits: &[AlignmentHit],
    gene_features: &[&ReferenceFeature],
) -> Result<Resolution, RouteError> {
    let by_label = gene_features
        .iter()
        .map(|f| (f.label.as_str(), *f))
        .collect::<HashMap<_, _>>();

    let mut evidence = best_hits(hits, &by_label)
        .into_iter()
        .map(|(hit, feature)| project(hit, feature))
        .collect::<Vec<_>>();

    if evidence.is_empty() {
        return Err(RouteError::NoAlignmentHit);
    }

    mark_encroached(&mut evidence);
    let merged = merge_contained(evidence);
    let lines = merged.iter().map(|e| e.line(&circ.chrom)).collect::<Vec<_>>();

    let intron_only = matches!(merged.as_slice(), [only] if only.token.label == Label::Intron);

    let first = merged[0].feature;
    let last = merged[merged.len() - 1].feature;
    let mut tokens = merged.into_iter().map(|e| e.token).collect::<Vec<_>>();

    let (mut start_offset, mut stop_offset) = (0, 0);
    if let Some(token) = tokens.first_mut().filter(|t| !t.is_novel()) {
        let ext = first.start() as i64 - circ.start as i64;
        token.left.boundary = Boundary::from_extension(ext);
        start_offset = ext.unsigned_abs();
    }
    if let Some(token) = tokens.last_mut().filter(|t| !t.is_novel()) {
        let ext = circ.stop as i64 - last.stop() as i64;
        token.right.boundary = Boundary::from_extension(ext);
        stop_offset = ext.unsigned_abs();
    }

    if start_offset > MATERIAL_OFFSET || stop_offset > MATERIAL_OFFSET {
        let window = intersect(
            gene_features.iter().copied(),
            &circ.chrom,
            circ.start.saturating_sub(FIX_FLANK),
            circ.stop + FIX_FLANK,
        );

        let start_fit = (start_offset > MATERIAL_OFFSET)
            .then(|| best_fit(&side_fits(&window, Side::Start, circ.start, circ.stop)))
            .flatten();
        let stop_fit = (stop_offset > MATERIAL_OFFSET)
            .then(|| best_fit(&side_fits(&window, Side::Stop, circ.start, circ.stop)))
            .flatten();

        match (start_fit, stop_fit) {
            (Some(s), Some(t)) if s.ordinal == t.ordinal && tokens.len() == 1 => {
                if tokens[0].ordinal() != Some(s.ordinal) {
                    tokens[0] = Token::exon(s.ordinal);
                }
                tokens[0].left.boundary = s.boundary();
                tokens[0].right.boundary = t.boundary();
            }
            (s, t) => {
                if let Some(s) = s {
                    refit(&mut tokens, Side::Start, s);
                }
                if let Some(t) = t {
                    refit(&mut tokens, Side::Stop, t);
                }
            }
        }

        start_offset = start_fit.map_or(start_offset, |f| f.offset());
        stop_offset = stop_fit.map_or(stop_offset, |f| f.offset());
    }

    replace_far_sides(
        &mut tokens,
        (start_offset, stop_offset),
        CATASTROPHIC_OFFSET,
        flank_novel,
    );

    Ok(Resolution {
        gene: gene.to_string(),
        strand,
        tokens,
        offset: start_offset.max(stop_offset),
        evidence: lines,
        intron_only,
    })
}
