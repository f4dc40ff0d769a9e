use clap::{Parser, Subcommand};
use config::{ArgCheck, CliError, DEFAULT_CHUNK_SIZE, DEFAULT_OUTPUT, DEFAULT_WORKERS};
use config::{BLASTN, BLAST_ALIASTOOL, MIN_THREADS};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubArgs,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        global = true,
        default_value_t = DEFAULT_WORKERS
    )]
    pub threads: usize,
}

impl Args {
    pub fn check_threads(&self) -> Result<(), CliError> {
        if self.threads < MIN_THREADS {
            return Err(CliError::InvalidInput(format!(
                "ERROR: threads must be at least {}",
                MIN_THREADS
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Subcommand)]
pub enum SubArgs {
    #[command(name = "convert")]
    Convert {
        #[command(flatten)]
        args: ConvertArgs,
    },
    #[command(name = "introns")]
    Introns {
        #[command(flatten)]
        args: IntronArgs,
    },
}

#[derive(Debug, Parser)]
pub struct ConvertArgs {
    #[arg(
        short = 'c',
        long = "circatlas",
        required = true,
        value_name = "PATH",
        help = "Path to circRNA annotation table [source_id, circ_id, coordinates, legacy_coordinates]"
    )]
    pub circatlas: PathBuf,

    #[arg(
        short = 's',
        long = "sequence",
        required = true,
        value_name = "PATH",
        help = "Path to circRNA sequence table [source_id, circ_id, sequence]"
    )]
    pub sequence: PathBuf,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        default_value = DEFAULT_OUTPUT,
        help = "Path to output mapping table"
    )]
    pub output: PathBuf,

    #[arg(
        short = 'b',
        long = "blast",
        required = true,
        value_name = "PATH",
        help = "Path prefix of the BLAST database built from the reference features"
    )]
    pub blast: PathBuf,

    #[arg(
        short = 'B',
        long = "bedfile",
        required = true,
        value_name = "PATH",
        help = "Path to reference BED file [gene!gene_id!chrom!start!stop!kind[!ordinal]]"
    )]
    pub bedfile: PathBuf,

    #[arg(
        short = 'C',
        long = "chunksize",
        value_name = "ROWS",
        default_value_t = DEFAULT_CHUNK_SIZE,
        help = "Number of circRNAs handed to a worker at once"
    )]
    pub chunk_size: usize,

    #[arg(
        long = "blastn",
        value_name = "EXEC",
        default_value = BLASTN,
        help = "blastn executable"
    )]
    pub blastn: String,

    #[arg(
        long = "aliastool",
        value_name = "EXEC",
        default_value = BLAST_ALIASTOOL,
        help = "blastdb_aliastool executable"
    )]
    pub aliastool: String,

    #[arg(
        long = "debug-dir",
        value_name = "DIR",
        help = "Directory for per-circRNA evidence BED files"
    )]
    pub debug_dir: Option<PathBuf>,
}

impl ArgCheck for ConvertArgs {
    fn check_tuning(&self) -> Result<(), CliError> {
        if self.chunk_size == 0 {
            return Err(CliError::InvalidInput(
                "ERROR: chunk size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn get_ref(&self) -> Vec<&PathBuf> {
        vec![&self.bedfile]
    }

    fn get_query(&self) -> Vec<&PathBuf> {
        vec![&self.circatlas, &self.sequence]
    }
}

#[derive(Debug, Parser)]
pub struct IntronArgs {
    #[arg(
        short = 'B',
        long = "bedfile",
        required = true,
        value_name = "PATH",
        help = "Path to reference BED file with exon, UTR and gene rows"
    )]
    pub bedfile: PathBuf,

    #[arg(
        short = 'o',
        long = "output",
        required = true,
        value_name = "PATH",
        help = "Path to output BED file including derived introns"
    )]
    pub output: PathBuf,
}

impl ArgCheck for IntronArgs {
    fn get_ref(&self) -> Vec<&PathBuf> {
        vec![&self.bedfile]
    }

    fn get_query(&self) -> Vec<&PathBuf> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_defaults() {
        let args = Args::parse_from([
            "circ-name", "convert", "-c", "atlas.tsv", "-s", "seq.tsv", "-b", "db", "-B", "ref.bed",
        ]);

        assert_eq!(args.threads, DEFAULT_WORKERS);
        match args.command {
            SubArgs::Convert { args } => {
                assert_eq!(args.chunk_size, DEFAULT_CHUNK_SIZE);
                assert_eq!(args.output, PathBuf::from(DEFAULT_OUTPUT));
                assert_eq!(args.blastn, BLASTN);
                assert!(args.debug_dir.is_none());
            }
            SubArgs::Introns { .. } => panic!("expected convert"),
        }
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let args = ConvertArgs::parse_from([
            "convert", "-c", "a", "-s", "b", "-b", "db", "-B", "ref.bed", "-C", "0",
        ]);

        assert!(args.check_tuning().is_err());
    }

    #[test]
    fn test_missing_inputs_fail_validation() {
        let args = IntronArgs::parse_from(["introns", "-B", "missing.bed", "-o", "out.bed"]);
        assert!(args.check().is_err());
    }
}
