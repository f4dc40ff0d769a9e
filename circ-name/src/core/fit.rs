//! Exon boundary fitting shared by both resolver paths

use circ_pack::{FeatureKind, ReferenceFeature};

use super::token::{fallback_side, Boundary, Side, Token};

/// candidate exon for one side of a circRNA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    pub ordinal: u32,
    /// > 0 when the circRNA reaches past the exon edge
    pub extension: i64,
}

impl Fit {
    pub fn offset(&self) -> u64 {
        self.extension.unsigned_abs()
    }

    pub fn boundary(&self) -> Option<Boundary> {
        Boundary::from_extension(self.extension)
    }

    pub fn token(&self, side: Side) -> Token {
        Token::exon(self.ordinal).with_boundary(side, self.boundary())
    }
}

/// signed distance between a circRNA edge and the matching feature edge
pub fn extension(side: Side, start: u64, stop: u64, feature: &ReferenceFeature) -> i64 {
    match side {
        Side::Start => feature.start() as i64 - start as i64,
        Side::Stop => stop as i64 - feature.stop() as i64,
    }
}

/// one fit per numbered exon, in the order given
pub fn side_fits(features: &[&ReferenceFeature], side: Side, start: u64, stop: u64) -> Vec<Fit> {
    features
        .iter()
        .filter(|f| f.kind == FeatureKind::Exon)
        .filter_map(|f| {
            f.ordinal.map(|ordinal| Fit {
                ordinal,
                extension: extension(side, start, stop, f),
            })
        })
        .collect()
}

/// smallest absolute distance wins, ties go to the smallest ordinal
pub fn best_fit(fits: &[Fit]) -> Option<Fit> {
    fits.iter()
        .min_by_key(|fit| (fit.offset(), fit.ordinal))
        .copied()
}

/// same-exon pair minimizing the combined distance of both edges
pub fn best_pair(starts: &[Fit], stops: &[Fit]) -> Option<(Fit, Fit)> {
    starts
        .iter()
        .flat_map(|s| {
            stops
                .iter()
                .filter(move |t| t.ordinal == s.ordinal)
                .map(move |t| (*s, *t))
        })
        .min_by_key(|(s, t)| (s.offset() + t.offset(), s.ordinal))
}

/// final side offsets past `limit` turn that side into a novel exon
pub fn replace_far_sides(
    tokens: &mut Vec<Token>,
    offsets: (u64, u64),
    limit: u64,
    both: impl FnOnce(&mut Vec<Token>),
) {
    match (offsets.0 > limit, offsets.1 > limit) {
        (true, true) => both(tokens),
        (true, false) => fallback_side(tokens, Side::Start),
        (false, true) => fallback_side(tokens, Side::Stop),
        (false, false) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::flank_novel;
    use config::Strand;

    fn exon(start: u64, stop: u64, ordinal: u32) -> ReferenceFeature {
        let line = format!(
            "1\t{start}\t{stop}\tABC!01!1!{start}!{stop}!E!{ordinal}\t0\t+"
        );
        ReferenceFeature::parse(&line).unwrap()
    }

    #[test]
    fn test_extension_signs() {
        let feature = exon(100, 200, 1);

        assert_eq!(extension(Side::Start, 90, 200, &feature), 10);
        assert_eq!(extension(Side::Start, 110, 200, &feature), -10);
        assert_eq!(extension(Side::Stop, 100, 215, &feature), 15);
        assert_eq!(extension(Side::Stop, 100, 150, &feature), -50);
    }

    #[test]
    fn test_best_fit_breaks_ties_by_ordinal() {
        let fits = vec![
            Fit { ordinal: 4, extension: 20 },
            Fit { ordinal: 2, extension: -20 },
            Fit { ordinal: 3, extension: 35 },
        ];

        assert_eq!(best_fit(&fits), Some(Fit { ordinal: 2, extension: -20 }));
        assert_eq!(best_fit(&[]), None);
    }

    #[test]
    fn test_best_pair_requires_same_exon() {
        let starts = vec![Fit { ordinal: 1, extension: 0 }, Fit { ordinal: 2, extension: 500 }];
        let stops = vec![Fit { ordinal: 2, extension: 3 }, Fit { ordinal: 3, extension: 1 }];

        let (s, t) = best_pair(&starts, &stops).unwrap();
        assert_eq!((s.ordinal, t.ordinal), (2, 2));
        assert_eq!(s.offset() + t.offset(), 503);
    }

    #[test]
    fn test_side_fits_ignore_unnumbered_rows() {
        let e1 = exon(100, 200, 1);
        let gene = ReferenceFeature::parse("1\t100\t900\tABC!01!1!100!900!G\t0\t+").unwrap();

        let fits = side_fits(&[&e1, &gene], Side::Start, 100, 200);
        assert_eq!(fits, vec![Fit { ordinal: 1, extension: 0 }]);
    }

    #[test]
    fn test_replace_far_sides() {
        let mut tokens = vec![Fit { ordinal: 2, extension: 1500 }.token(Side::Start)];
        replace_far_sides(&mut tokens, (1500, 0), 1000, flank_novel);

        let rendered = tokens
            .iter()
            .map(|t| t.render(Strand::Forward))
            .collect::<Vec<_>>();
        assert_eq!(rendered, vec!["NE", "2"]);
    }
}
