use anyhow::Result;
use clap::Parser;
use config::ArgCheck;
use std::path::PathBuf;

pub mod align;
pub mod cli;
pub mod core;
pub mod outcome;
pub mod record;
pub mod utils;

pub use align::{Aligner, AlignmentHit, BlastAligner};
pub use outcome::{Outcome, RouteError};

/// run `convert` from raw arguments and return the output table path
pub fn lib_circ_name(args: Vec<String>) -> Result<PathBuf> {
    let args = cli::ConvertArgs::parse_from(args);
    args.check()?;

    let output = args.output.clone();
    crate::core::convert_circrnas(args)?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lib_rejects_missing_inputs() {
        let args = ["convert", "-c", "nope.tsv", "-s", "nope.tsv", "-b", "db", "-B", "nope.bed"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert!(lib_circ_name(args).is_err());
    }
}
