//! strake CLI - inspect and stream values out of a segment file
//!
//! This binary provides command-line interfaces for:
//! - ls: list segments, their columns, and row counts
//! - cat: stream one column's decoded values

use std::fs::File;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use strake_format::limits::Limits;
use strake_io::row_reader::{ReadError, RowReader};
use strake_io::select::{execute, Predicate};
use strake_io::region::RegionPool;

#[derive(Parser)]
#[command(name = "strake")]
#[command(about = "Inspect and stream values out of a strake segment file")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List segments, their columns, and row counts
    Ls {
        /// Input file
        input: String,
    },
    /// Stream values for one column, one per output line
    Cat {
        /// Input file
        input: String,
        /// Column id to extract
        #[arg(long)]
        column: u32,
        /// Print `<null>` instead of skipping null values
        #[arg(long)]
        show_nulls: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ls { input } => run_ls(&input),
        Commands::Cat {
            input,
            column,
            show_nulls,
        } => run_cat(&input, column, show_nulls),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_ls(input: &str) -> Result<(), CliError> {
    let mapped = map_file(input)?;
    let mut reader = RowReader::from_mapped(&mapped, Limits::default());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut segment_index = 0u64;
    while !reader.end()? {
        let row = reader.get_row()?;
        let columns: Vec<u32> = row.iter().map(|(column_id, _)| *column_id).collect();
        writeln!(out, "segment {segment_index}: columns {columns:?}")?;

        let mut rows_in_segment = 1u64;
        while !reader.end_of_segment()? {
            reader.get_row()?;
            rows_in_segment += 1;
        }
        writeln!(out, "  rows: {rows_in_segment}")?;
        segment_index += 1;
    }

    Ok(())
}

fn run_cat(input: &str, column: u32, show_nulls: bool) -> Result<(), CliError> {
    let mapped = map_file(input)?;
    let mut reader = RowReader::from_mapped(&mapped, Limits::default());
    let pool = RegionPool::new();

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} {pos} values streamed").expect("valid template"),
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut count = 0u64;

    let filters: Vec<(u32, Box<dyn Predicate>)> = Vec::new();
    execute(&mut reader, &[column], &filters, &pool, |row| {
        let value = row.iter().find(|(c, _)| *c == column).and_then(|(_, v)| *v);
        match value {
            Some(bytes) => writeln!(out, "{}", String::from_utf8_lossy(bytes))?,
            None if show_nulls => writeln!(out, "<null>")?,
            None => {}
        }
        count += 1;
        progress.set_position(count);
        Ok(())
    })
    .map_err(|e| CliError::Select(e.to_string()))?;

    progress.finish_and_clear();
    Ok(())
}

fn map_file(path: &str) -> Result<memmap2::Mmap, CliError> {
    let file = File::open(path)?;
    // SAFETY: the mapping is read-only and the file is not expected to be
    // mutated concurrently by another process while this process holds it.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    Ok(mmap)
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("read error: {0}")]
    Read(#[from] ReadError),
    #[error("select error: {0}")]
    Select(String),
}
