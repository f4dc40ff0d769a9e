//! Coordinate path: names a circRNA from the exons around its edges

use std::collections::BTreeSet;

use circ_pack::{intersect, FeatureKind, FeatureStore, ReferenceFeature};
use config::{CATASTROPHIC_OFFSET, FIX_FLANK, SINGLE_NOVEL_SPAN, UNKNOWN_GENE};

use super::fit::{best_fit, best_pair, replace_far_sides, side_fits, Fit};
use super::token::{Side, Token};
use super::Resolution;
use crate::record::CircRna;

/// the combined same-exon pair is kept unless a standalone fit is strictly closer
fn settle(standalone: Option<Fit>, paired: Option<Fit>) -> Option<Fit> {
    match (standalone, paired) {
        (Some(best), Some(pair)) if best.offset() < pair.offset() => Some(best),
        (_, Some(pair)) => Some(pair),
        (best, None) => best,
    }
}

fn recover_gene(window: &[&ReferenceFeature]) -> String {
    let exonic = window
        .iter()
        .filter(|f| f.kind == FeatureKind::Exon)
        .map(|f| f.gene.as_str())
        .collect::<BTreeSet<_>>();

    let genes = if exonic.is_empty() {
        window.iter().map(|f| f.gene.as_str()).collect::<BTreeSet<_>>()
    } else {
        exonic
    };

    if genes.is_empty() {
        UNKNOWN_GENE.to_string()
    } else {
        genes.into_iter().collect::<Vec<_>>().join("|")
    }
}

pub fn resolve_by_coordinates(circ: &CircRna, store: &FeatureStore) -> Resolution {
    let (lower, upper) = (circ.start.saturating_sub(FIX_FLANK), circ.stop + FIX_FLANK);
    let hint = circ.gene_hint();

    let window = match hint {
        Some(gene) => intersect(store.features_for_gene(gene), &circ.chrom, lower, upper),
        None => store.features_in_window(&circ.chrom, lower, upper),
    };

    let starts = side_fits(&window, Side::Start, circ.start, circ.stop);
    let stops = side_fits(&window, Side::Stop, circ.start, circ.stop);
    let pair = best_pair(&starts, &stops);

    let start = settle(best_fit(&starts), pair.map(|(s, _)| s));
    let stop = settle(best_fit(&stops), pair.map(|(_, t)| t));

    let mut tokens = match (start, stop) {
        (Some(s), Some(t)) if s.ordinal == t.ordinal => {
            vec![s.token(Side::Start).with_boundary(Side::Stop, t.boundary())]
        }
        (Some(s), Some(t)) => vec![s.token(Side::Start), t.token(Side::Stop)],
        (Some(s), None) => vec![s.token(Side::Start), Token::novel()],
        (None, Some(t)) => vec![Token::novel(), t.token(Side::Stop)],
        (None, None) if circ.span() > SINGLE_NOVEL_SPAN => vec![Token::novel()],
        (None, None) => vec![Token::novel(), Token::novel()],
    };

    let offsets = (
        start.map_or(0, |f| f.offset()),
        stop.map_or(0, |f| f.offset()),
    );
    replace_far_sides(&mut tokens, offsets, CATASTROPHIC_OFFSET, |tokens| {
        *tokens = vec![Token::novel(), Token::novel()];
    });

    let gene = match hint {
        Some(gene) => gene.to_string(),
        None => recover_gene(&window),
    };

    let strand = circ
        .strand
        .or_else(|| window.last().map(|f| f.strand()))
        .unwrap_or_default();

    Resolution {
        gene,
        strand,
        tokens,
        offset: offsets.0.max(offsets.1),
        evidence: window.iter().map(|f| f.line()).collect(),
        intron_only: false,
    }
}
