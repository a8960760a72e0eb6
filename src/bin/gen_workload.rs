//! Pre-generate a producer-consumer workload directory

use std::path::PathBuf;

use clap::Parser;

use concurrency_bench::workload::{FileWorkload, DEFAULT_FILE_LEN};

/// Write deterministic `file_NNNNNN.bin` files, skipping ones that exist
#[derive(Parser, Debug)]
#[command(name = "gen-workload", version, about)]
struct Args {
    /// Target directory
    #[arg(long = "dir", env = "BENCH_DIR", default_value = "bench-data")]
    dir: PathBuf,

    /// Number of files
    #[arg(long = "count", default_value_t = 1000)]
    count: u64,

    /// Bytes per file
    #[arg(long = "file-size", env = "BENCH_FILE_SIZE", default_value_t = DEFAULT_FILE_LEN)]
    file_size: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if args.file_size == 0 {
        eprintln!("--file-size must be at least 1");
        std::process::exit(1);
    }

    let workload = FileWorkload::new(&args.dir).with_file_len(args.file_size);
    let created = workload.ensure_files(args.count)?;

    println!(
        "{}: {} files present, {} created",
        args.dir.display(),
        args.count,
        created
    );
    Ok(())
}
