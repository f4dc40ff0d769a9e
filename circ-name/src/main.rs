//! circ-name: structural names for circRNAs
//!
//! `convert` resolves every circRNA of an annotation table into a
//! `circGENE(tokens)` name, first from BLAST evidence against the reference
//! features and then, for everything left, from the exons around its
//! coordinates. `introns` writes a reference BED completed with the introns
//! derived from its gene bodies.

use clap::Parser;
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use circ_name::cli::{Args, SubArgs};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap_or_else(|e| {
        eprintln!("ERROR: cannot start logger: {}", e);
        std::process::exit(1);
    });

    let args: Args = Args::parse();
    args.check_threads().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .unwrap_or_else(|e| {
            error!("{}", e);
            std::process::exit(1);
        });

    match args.command {
        SubArgs::Convert { args } => {
            use circ_name::core::convert_circrnas;

            args.check().unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });

            convert_circrnas(args).unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });
        }
        SubArgs::Introns { args } => {
            use circ_name::core::derive_reference;

            args.check().unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });

            let output = derive_reference(args).unwrap_or_else(|e| {
                error!("{}", e);
                std::process::exit(1);
            });
            info!("Reference with introns written to {:?}", output);
        }
    }

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
