pub mod fns;
pub mod mods;

pub use fns::*;
pub use mods::*;

// numeric values
pub const MIN_THREADS: usize = 1;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_CHUNK_SIZE: usize = 10000;
pub const MIN_BED_FIELDS: usize = 6;
pub const MIN_NAME_FIELDS: usize = 6;
pub const MIN_TABLE_FIELDS: usize = 3;

// windows [bp]
pub const PREFILTER_FLANK: u64 = 200;
pub const FIX_FLANK: u64 = 1000;

// thresholds
pub const MATERIAL_OFFSET: u64 = 100;
pub const CATASTROPHIC_OFFSET: u64 = 1000;
pub const SINGLE_NOVEL_SPAN: u64 = 1000;
pub const INTRON_COVERAGE_THRESHOLD: f64 = 0.5;

// markers
pub const NAME_SEPARATOR: char = '!';
pub const QUERY_SEPARATOR: char = '@';
pub const PARTIAL_SEQUENCE: &str = "partial";
pub const INTERGENIC_MARKER: &str = "intergenic";
pub const LEGACY_ID: &str = "-";
pub const UNKNOWN_GENE: &str = "NA";
pub const NOVEL_EXON: &str = "NE";
pub const RETAINED_INTRON: &str = "RI";

// external tools
pub const BLASTN: &str = "blastn";
pub const BLAST_ALIASTOOL: &str = "blastdb_aliastool";
pub const BLAST_OUTFMT: &str =
    "6 qseqid sseqid qstart qend sstart send sstrand gaps mismatch pident qseq";

// file names
pub const DEFAULT_OUTPUT: &str = "circrna_mapping.tsv";
pub const STATS_SUFFIX: &str = "stats.json";
pub const DEBUG_SUFFIX: &str = "bed";
