//! Alignment adapter
//!
//! Aligns a circRNA spliced sequence against a restricted subset of the
//! reference feature database. The default implementation shells out to
//! BLAST+; tests and alternative backends implement [`Aligner`] directly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::Command;

use config::{Strand, BLAST_ALIASTOOL, BLAST_OUTFMT, BLASTN, QUERY_SEPARATOR};
use log::debug;
use tempfile::NamedTempFile;
use thiserror::Error;

const HIT_FIELDS: usize = 11;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("no usable sequence for {0}")]
    NoSequence(String),
    #[error("empty search space for {0}")]
    EmptySearchSpace(String),
    #[error("{0} not found in PATH")]
    ToolNotFound(String),
    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: String, stderr: String },
    #[error("cannot parse alignment row: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// one tabular alignment row
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentHit {
    pub query: String,
    pub subject: String,
    pub q_start: u64,
    pub q_end: u64,
    pub s_start: u64,
    pub s_end: u64,
    pub strand: Strand,
    pub gaps: u32,
    pub mismatches: u32,
    pub identity: f64,
    pub aligned: String,
}

impl AlignmentHit {
    pub fn parse(line: &str) -> Result<Self, AlignError> {
        let fields = line.trim_end().split('\t').collect::<Vec<_>>();
        if fields.len() < HIT_FIELDS {
            return Err(AlignError::Parse(line.to_string()));
        }

        let bad = || AlignError::Parse(line.to_string());
        let pos = |x: &str| x.parse::<u64>().map_err(|_| bad());
        let count = |x: &str| x.parse::<u32>().map_err(|_| bad());

        let identity = fields[9].parse::<f64>().map_err(|_| bad())?;
        if !(0.0..=100.0).contains(&identity) {
            return Err(bad());
        }

        Ok(Self {
            query: fields[0].to_string(),
            subject: fields[1].to_string(),
            q_start: pos(fields[2])?,
            q_end: pos(fields[3])?,
            s_start: pos(fields[4])?,
            s_end: pos(fields[5])?,
            strand: fields[6].parse::<Strand>().map_err(|_| bad())?,
            gaps: count(fields[7])?,
            mismatches: count(fields[8])?,
            identity,
            aligned: fields[10].to_string(),
        })
    }

    /// subject-relative span, lowest position first
    pub fn subject_span(&self) -> (u64, u64) {
        (self.s_start.min(self.s_end), self.s_start.max(self.s_end))
    }
}

pub fn parse_hits(contents: &str) -> Result<Vec<AlignmentHit>, AlignError> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(AlignmentHit::parse)
        .collect()
}

/// what the adapter needs to know about one circRNA
#[derive(Debug, Clone)]
pub struct AlignmentQuery<'a> {
    pub id: &'a str,
    pub coordinates: &'a str,
    pub sequence: Option<&'a str>,
    pub candidates: Vec<&'a str>,
}

pub trait Aligner: Send + Sync {
    /// run the backend on a validated query; hits come back unsorted
    fn run(&self, id: &str, fasta: &str, candidates: &[&str]) -> Result<Vec<AlignmentHit>, AlignError>;

    fn align(&self, query: &AlignmentQuery) -> Result<Vec<AlignmentHit>, AlignError> {
        let sequence = match query.sequence {
            Some(seq) if !seq.is_empty() => seq,
            _ => return Err(AlignError::NoSequence(query.id.to_string())),
        };

        if query.candidates.is_empty() {
            return Err(AlignError::EmptySearchSpace(query.id.to_string()));
        }

        let fasta = format!(
            ">{}{}{}\n{}\n",
            query.id, QUERY_SEPARATOR, query.coordinates, sequence
        );

        self.run(query.id, &fasta, &query.candidates)
    }
}

/// BLAST+ backend: blastdb_aliastool builds the restriction list, blastn aligns
#[derive(Debug, Clone)]
pub struct BlastAligner {
    pub db: PathBuf,
    pub blastn: String,
    pub aliastool: String,
}

impl BlastAligner {
    pub fn new(db: PathBuf) -> Self {
        Self {
            db,
            blastn: BLASTN.to_string(),
            aliastool: BLAST_ALIASTOOL.to_string(),
        }
    }

    pub fn with_tools(mut self, blastn: &str, aliastool: &str) -> Self {
        self.blastn = blastn.to_string();
        self.aliastool = aliastool.to_string();
        self
    }
}

fn execute(tool: &str, cmd: &mut Command) -> Result<Vec<u8>, AlignError> {
    let output = cmd.output().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AlignError::ToolNotFound(tool.to_string()),
        _ => AlignError::Io(e),
    })?;

    if !output.status.success() {
        return Err(AlignError::ToolFailed {
            tool: tool.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

impl Aligner for BlastAligner {
    fn run(&self, id: &str, fasta: &str, candidates: &[&str]) -> Result<Vec<AlignmentHit>, AlignError> {
        // every handle is removed on drop, whichever branch returns
        let mut query = NamedTempFile::new()?;
        query.write_all(fasta.as_bytes())?;
        query.flush()?;

        let ids = NamedTempFile::new()?;
        {
            let mut writer = BufWriter::new(File::create(ids.path())?);
            for label in candidates {
                writeln!(writer, "{}", label)?;
            }
            writer.flush()?;
        }

        let seqidlist = tempfile::Builder::new().suffix(".bsl").tempfile()?;
        let hits = NamedTempFile::new()?;

        execute(
            &self.aliastool,
            Command::new(&self.aliastool)
                .arg("-seqid_file_in")
                .arg(ids.path())
                .arg("-seqid_file_out")
                .arg(seqidlist.path()),
        )?;

        execute(
            &self.blastn,
            Command::new(&self.blastn)
                .arg("-query")
                .arg(query.path())
                .arg("-db")
                .arg(&self.db)
                .arg("-seqidlist")
                .arg(seqidlist.path())
                .arg("-outfmt")
                .arg(BLAST_OUTFMT)
                .arg("-out")
                .arg(hits.path()),
        )?;

        let contents = std::fs::read_to_string(hits.path())?;
        let hits = parse_hits(&contents)?;
        debug!("{}: {} alignment rows", id, hits.len());

        Ok(hits)
    }
}
