//! Batch conversion of circRNA ids into structural names
//!
//! Records are split into fixed-size chunks and resolved in two phases on
//! the rayon pool. Phase one names every circRNA with a usable sequence from
//! its alignment evidence; records it cannot name are routed on with their
//! reason. Phase two names everything still pending from the reference
//! exons around its coordinates and retires legacy records.

use std::path::{Path, PathBuf};

use anyhow::Result;
use circ_pack::FeatureStore;
use config::{get_progress_bar, write_collection, ChunkRegion, Strand};
use log::{debug, info};
use rayon::prelude::*;

use crate::align::{Aligner, BlastAligner};
use crate::cli::{ConvertArgs, IntronArgs};
use crate::outcome::{Outcome, RouteError};
use crate::record::{load_circrnas, CircRna};
use crate::utils::{write_debug_bed, write_results, ParallelAccumulator, ParallelCounter};

pub mod evidence;
pub mod fallback;
pub mod fit;
pub mod token;

use evidence::resolve_with_alignment;
use fallback::resolve_by_coordinates;
use token::render_name;

/// resolved structure of one circRNA
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub gene: String,
    pub strand: Strand,
    /// genomic order
    pub tokens: Vec<token::Token>,
    pub offset: u64,
    pub evidence: Vec<String>,
    /// the merged evidence was a single retained intron
    pub intron_only: bool,
}

impl Resolution {
    pub fn name(&self) -> String {
        if self.intron_only {
            render_name(&self.gene, &[token::Token::novel()], self.strand)
        } else {
            render_name(&self.gene, &self.tokens, self.strand)
        }
    }
}

pub fn convert_circrnas(args: ConvertArgs) -> Result<ParallelAccumulator> {
    info!("Converting circRNA ids into structural names...");

    let (records, store) = rayon::join(
        || load_circrnas(&args.circatlas, &args.sequence),
        || FeatureStore::from_paths(&[&args.bedfile]),
    );
    let (records, store) = (records?, store?);

    if let Some(dir) = &args.debug_dir {
        std::fs::create_dir_all(dir)?;
    }

    let aligner = BlastAligner::new(args.blast.clone()).with_tools(&args.blastn, &args.aliastool);
    let accumulator = run_batch(
        &records,
        &store,
        &aligner,
        args.chunk_size,
        args.debug_dir.as_deref(),
    )?;

    let stats = write_results(&accumulator, &args.output)?;
    info!("circRNAs written: {}", stats.total);

    Ok(accumulator)
}

/// both phases over an already loaded working set
pub fn run_batch<A: Aligner>(
    records: &[CircRna],
    store: &FeatureStore,
    aligner: &A,
    chunk_size: usize,
    debug_dir: Option<&Path>,
) -> Result<ParallelAccumulator> {
    let accumulator = ParallelAccumulator::new(records);
    let counter = ParallelCounter::default();
    let regions = ChunkRegion::partition(records.len(), chunk_size);

    info!(
        "Dispatching {} circRNAs in {} chunks",
        records.len(),
        regions.len()
    );

    let pb = get_progress_bar(records.len() as u64, "Resolving from alignments");
    regions.par_iter().try_for_each(|region| -> Result<()> {
        for circ in &records[region.start..region.end] {
            align_one(circ, store, aligner, &accumulator, &counter, debug_dir)?;
        }

        counter.inc_processed(region.len() as u32);
        pb.inc(region.len() as u64);
        Ok(())
    })?;
    pb.finish_and_clear();

    let (processed, routed) = counter.get_counters();
    info!(
        "Evidence phase: {} processed, {} routed to coordinates, {} remaining",
        processed,
        routed,
        accumulator.pending.len()
    );

    counter.reset();
    let pb = get_progress_bar(records.len() as u64, "Resolving from coordinates");
    regions.par_iter().try_for_each(|region| -> Result<()> {
        for circ in &records[region.start..region.end] {
            place_one(circ, store, &accumulator, debug_dir)?;
        }

        counter.inc_processed(region.len() as u32);
        pb.inc(region.len() as u64);
        Ok(())
    })?;
    pb.finish_and_clear();

    let (processed, _) = counter.get_counters();
    info!(
        "Coordinate phase: {} processed, {} remaining",
        processed,
        accumulator.pending.len()
    );

    if !accumulator.pending.is_empty() {
        anyhow::bail!(
            "{} circRNAs left without an outcome",
            accumulator.pending.len()
        );
    }

    Ok(accumulator)
}

fn align_one<A: Aligner>(
    circ: &CircRna,
    store: &FeatureStore,
    aligner: &A,
    accumulator: &ParallelAccumulator,
    counter: &ParallelCounter,
    debug_dir: Option<&Path>,
) -> Result<()> {
    if circ.legacy {
        return Ok(());
    }

    let features = circ
        .gene_hint()
        .map(|gene| store.features_for_gene(gene))
        .unwrap_or_default();

    match resolve_with_alignment(circ, &features, aligner)? {
        Ok(resolution) => {
            if let Some(dir) = debug_dir {
                write_debug_bed(dir, circ, &resolution)?;
            }
            accumulator.resolve(circ, &resolution, Outcome::BlastHit);
        }
        Err(route) => {
            debug!("{}: {}", circ.id, route);
            counter.inc_routed();
            if let Some(outcome) = route.outcome() {
                accumulator.record(&circ.id, outcome);
            }
        }
    }

    Ok(())
}

fn place_one(
    circ: &CircRna,
    store: &FeatureStore,
    accumulator: &ParallelAccumulator,
    debug_dir: Option<&Path>,
) -> Result<()> {
    if circ.legacy {
        if let Some(outcome) = RouteError::LegacyRecord.outcome() {
            accumulator.retire_legacy(circ, outcome);
        }
        return Ok(());
    }

    if accumulator.is_resolved(&circ.id) {
        return Ok(());
    }

    let resolution = resolve_by_coordinates(circ, store);
    if let Some(dir) = debug_dir {
        write_debug_bed(dir, circ, &resolution)?;
    }
    accumulator.resolve(circ, &resolution, Outcome::Bedtools);

    Ok(())
}

/// write the reference with derived introns
pub fn derive_reference(args: IntronArgs) -> Result<PathBuf> {
    info!("Deriving introns from {:?}...", args.bedfile);

    let store = FeatureStore::from_paths(&[&args.bedfile])?;
    let lines = store.iter().map(|f| f.line()).collect::<Vec<_>>();
    write_collection(&lines, &args.output)?;

    Ok(args.output)
}
