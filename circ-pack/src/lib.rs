//! Reference interval store for circRNA naming
//!
//! Holds the exon (E), UTR (U5/U3), retained-intron (RI) and gene-body (G)
//! rows of the prepared reference annotation. Rows are indexed by gene name
//! and by chromosome, so a circRNA can be reconciled against the features of
//! its candidate gene or against a genomic window. The store is read-only
//! once built and is shared by every worker.

use std::fmt::Debug;
use std::path::Path;

use config::{get_progress_bar, reader};
use hashbrown::HashMap;
use log::{info, warn};
use rayon::prelude::*;

pub mod introns;
pub mod record;

pub use introns::derive_introns;
pub use record::{normalize_chrom, BedError, FeatureKind, GenomicInterval, ReferenceFeature};

pub fn par_reader<P: AsRef<Path> + Debug + Sync + Send>(
    files: &[P],
) -> Result<String, anyhow::Error> {
    let contents = files
        .par_iter()
        .map(reader)
        .collect::<Result<Vec<String>, std::io::Error>>()?;

    Ok(contents.concat())
}

pub fn parse_features(contents: &str) -> Vec<ReferenceFeature> {
    let pb = get_progress_bar(contents.lines().count() as u64, "Parsing reference BED");
    let features = contents
        .par_lines()
        .filter(|x| !x.starts_with('#') && !x.trim().is_empty())
        .filter_map(|x| {
            pb.inc(1);
            ReferenceFeature::parse(x)
                .map_err(|e| warn!("{} from: {}", e, x))
                .ok()
        })
        .collect::<Vec<_>>();

    pb.finish_and_clear();
    info!("Reference features parsed: {}", features.len());

    features
}

#[derive(Debug, Default)]
struct ChromIndex {
    rows: Vec<usize>,
    max_span: u64,
}

/// read-only feature store keyed by gene and chromosome
#[derive(Debug, Default)]
pub struct FeatureStore {
    features: Vec<ReferenceFeature>,
    by_gene: HashMap<String, Vec<usize>>,
    by_chrom: HashMap<String, ChromIndex>,
    by_label: HashMap<String, usize>,
}

impl FeatureStore {
    /// index a set of features; introns are derived once if none are present
    pub fn new(mut features: Vec<ReferenceFeature>) -> Self {
        if !features.iter().any(|f| f.kind == FeatureKind::Intron) {
            let introns = derive_introns(&features);
            info!("No intron rows in reference, derived {}", introns.len());
            features.extend(introns);
        }

        features.par_sort_unstable_by(|a, b| {
            (&a.interval.chrom, a.start(), b.stop(), &a.label).cmp(&(
                &b.interval.chrom,
                b.start(),
                a.stop(),
                &b.label,
            ))
        });

        let mut by_gene: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_chrom: HashMap<String, ChromIndex> = HashMap::new();
        let mut by_label = HashMap::with_capacity(features.len());

        for (idx, feature) in features.iter().enumerate() {
            by_gene.entry(feature.gene.clone()).or_default().push(idx);
            by_label.insert(feature.label.clone(), idx);

            let chrom = by_chrom.entry(feature.interval.chrom.clone()).or_default();
            chrom.rows.push(idx);
            chrom.max_span = chrom.max_span.max(feature.interval.span());
        }

        Self {
            features,
            by_gene,
            by_chrom,
            by_label,
        }
    }

    pub fn from_paths<P: AsRef<Path> + Debug + Sync + Send>(
        paths: &[P],
    ) -> Result<Self, anyhow::Error> {
        let contents = par_reader(paths)?;
        let features = parse_features(&contents);

        if features.is_empty() {
            anyhow::bail!("Reference BED provided but no features found in {:?}", paths);
        }

        Ok(Self::new(features))
    }

    /// every feature annotated to `gene`; empty for unknown genes
    pub fn features_for_gene(&self, gene: &str) -> Vec<&ReferenceFeature> {
        self.by_gene
            .get(gene)
            .map(|rows| rows.iter().map(|&idx| &self.features[idx]).collect())
            .unwrap_or_default()
    }

    /// every feature overlapping [start, stop] on chrom, inclusive, in genomic order
    pub fn features_in_window(&self, chrom: &str, start: u64, stop: u64) -> Vec<&ReferenceFeature> {
        let Some(index) = self.by_chrom.get(normalize_chrom(chrom)) else {
            return Vec::new();
        };

        let lower = index
            .rows
            .partition_point(|&idx| self.features[idx].start() < start.saturating_sub(index.max_span));
        let upper = index
            .rows
            .partition_point(|&idx| self.features[idx].start() <= stop);

        index.rows[lower..upper]
            .iter()
            .map(|&idx| &self.features[idx])
            .filter(|f| f.interval.overlaps(chrom, start, stop))
            .collect()
    }

    pub fn feature(&self, label: &str) -> Option<&ReferenceFeature> {
        self.by_label.get(label).map(|&idx| &self.features[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceFeature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// restrict an already selected feature set to [start, stop] on chrom
pub fn intersect<'a, I>(features: I, chrom: &str, start: u64, stop: u64) -> Vec<&'a ReferenceFeature>
where
    I: IntoIterator<Item = &'a ReferenceFeature>,
{
    features
        .into_iter()
        .filter(|f| f.interval.overlaps(chrom, start, stop))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const REFERENCE: &str = "\
1\t100\t1000\tGENE1!000001!1!100!1000!G\t0\t+
1\t100\t200\tGENE1!000001!1!100!200!E!1\t0\t+
1\t400\t500\tGENE1!000001!1!400!500!E!2\t0\t+
1\t800\t1000\tGENE1!000001!1!800!1000!E!3\t0\t+
1\t5000\t6000\tGENE2!000002!1!5000!6000!G\t0\t-
1\t5000\t5100\tGENE2!000002!1!5000!5100!E!2\t0\t-
1\t5900\t6000\tGENE2!000002!1!5900!6000!E!1\t0\t-
";

    fn store() -> FeatureStore {
        FeatureStore::new(parse_features(REFERENCE))
    }

    #[test]
    fn test_store_derives_introns_once() {
        let store = store();

        let introns = store
            .iter()
            .filter(|f| f.kind == FeatureKind::Intron)
            .count();
        assert_eq!(introns, 3);
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_features_for_gene() {
        let store = store();

        assert_eq!(store.features_for_gene("GENE2").len(), 4);
        assert!(store.features_for_gene("UNKNOWN").is_empty());
    }

    #[test]
    fn test_features_in_window_is_inclusive() {
        let store = store();

        let hits = store.features_in_window("chr1", 500, 500);
        let labels = hits.iter().map(|f| f.label.as_str()).collect::<Vec<_>>();

        assert!(labels.contains(&"GENE1!000001!1!400!500!E!2"));
        assert!(labels.contains(&"GENE1!000001!1!500!800!RI"));
        assert!(labels.contains(&"GENE1!000001!1!100!1000!G"));
        assert_eq!(hits.len(), 3);

        assert!(store.features_in_window("2", 0, 10_000).is_empty());
        assert!(store.features_in_window("1", 1001, 4999).is_empty());
    }

    #[test]
    fn test_window_results_are_in_genomic_order() {
        let store = store();
        let hits = store.features_in_window("1", 0, 10_000);

        assert!(hits.windows(2).all(|w| w[0].start() <= w[1].start()));
    }

    #[test]
    fn test_feature_by_label() {
        let store = store();

        let feature = store.feature("GENE2!000002!1!5900!6000!E!1").unwrap();
        assert_eq!(feature.ordinal, Some(1));
        assert!(store.feature("GENE2!000002!1!1!2!E!9").is_none());
    }

    #[test]
    fn test_intersect_restricts_gene_features() {
        let store = store();
        let hits = intersect(store.features_for_gene("GENE1"), "1", 150, 450);

        assert!(hits.iter().all(|f| f.gene == "GENE1"));
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn test_from_paths() {
        let mut file = tempfile::Builder::new().suffix(".bed").tempfile().unwrap();
        write!(file, "{}", REFERENCE).unwrap();
        writeln!(file, "malformed\tline").unwrap();

        let store = FeatureStore::from_paths(&[file.path()]).unwrap();
        assert_eq!(store.features_for_gene("GENE1").len(), 6);
    }
}
