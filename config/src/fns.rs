use flate2::read::MultiGzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// read a whole plain or gzip-compressed file into memory
pub fn reader<P: AsRef<Path> + Debug>(file: P) -> Result<String, std::io::Error> {
    let path = file.as_ref();
    let handle = File::open(path)?;
    let mut contents = String::new();

    match path.extension() {
        Some(ext) if ext == "gz" => {
            MultiGzDecoder::new(handle).read_to_string(&mut contents)?;
        }
        _ => {
            BufReader::new(handle).read_to_string(&mut contents)?;
        }
    }

    Ok(contents)
}

/// write any collection of lines to a file
pub fn write_collection<T, P>(data: &[T], fname: P) -> Result<(), std::io::Error>
where
    T: AsRef<str>,
    P: AsRef<Path> + Debug,
{
    log::info!("Records in {:?}: {}. Writing...", fname, data.len());
    let f = File::create(fname.as_ref())?;
    let mut writer = BufWriter::new(f);

    for line in data.iter() {
        writeln!(writer, "{}", line.as_ref())?;
    }

    writer.flush()
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        self.check_dbs()?;
        self.check_tuning()
    }

    fn check_dbs(&self) -> Result<(), CliError> {
        if self.get_ref().is_empty() {
            let err = "No reference files provided".to_string();
            return Err(CliError::InvalidInput(err));
        }
        for db in self.get_ref() {
            validate_bed(db)?;
        }

        for query in self.get_query() {
            validate(query)?;
        }

        Ok(())
    }

    fn check_tuning(&self) -> Result<(), CliError> {
        Ok(())
    }

    fn get_ref(&self) -> Vec<&PathBuf>;
    fn get_query(&self) -> Vec<&PathBuf>;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument validation
pub fn validate(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} does not exist",
            arg
        )));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a file",
            arg
        )));
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}

/// argument validation for BED inputs [.bed or .bed.gz]
pub fn validate_bed(arg: &PathBuf) -> Result<(), CliError> {
    let fname = arg
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or_default();

    if !(fname.ends_with(".bed") || fname.ends_with(".bed.gz")) {
        return Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is not a BED file",
            arg
        )));
    }

    validate(arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    #[test]
    fn test_reader_plain_and_gzip() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("ref.bed");
        std::fs::write(&plain, "1\t10\t20\n").unwrap();

        let gz = dir.path().join("ref.bed.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(b"1\t10\t20\n").unwrap();
        encoder.finish().unwrap();

        assert_eq!(reader(&plain).unwrap(), "1\t10\t20\n");
        assert_eq!(reader(&gz).unwrap(), "1\t10\t20\n");
    }

    #[test]
    fn test_validate_bed_rejects_other_extensions() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "content").unwrap();

        let path = file.path().to_path_buf();
        assert!(validate(&path).is_ok());
        assert!(validate_bed(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_file() {
        let file = tempfile::Builder::new().suffix(".bed").tempfile().unwrap();
        let path = file.path().to_path_buf();

        assert!(matches!(validate_bed(&path), Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn test_write_collection() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.tsv");

        write_collection(&["a\tb", "c\td"], &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "a\tb\nc\td\n");
    }
}
