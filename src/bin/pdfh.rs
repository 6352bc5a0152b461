//! pdfh - Page-level PDF manipulation
//!
//! Each subcommand loads its inputs, runs one transform and writes the result.
//! When the output path is omitted the input file is replaced in place.
//!
//! Usage:
//!   pdfh merge a.pdf b.pdf scans/ out.pdf
//!   pdfh split in.pdf part.pdf --group-size 2
//!   pdfh rotate in.pdf -d 90 -p 1-3
//!   pdfh delete in.pdf out.pdf -e 2 --negate

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use rayon::prelude::*;

use pdfh::transform::{self, Grouping, PageSelection, Rotation};
use pdfh::writer::{self, WriterConfig};
use pdfh::{Document, Error, Result};

/// Reorder, duplicate, delete, extract, rotate and combine PDF pages.
#[derive(Parser, Debug)]
#[command(name = "pdfh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Concatenate documents; directories expand to the PDF files they contain
    Merge {
        /// Input files or directories, followed by the output file
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        options: OutputArgs,
    },

    /// Split a document into several, written as <stem>_<n>.pdf
    Split {
        /// Input file
        input: PathBuf,
        /// Output name template
        output: PathBuf,

        /// Pages per output document
        #[arg(long, conflicts_with = "groups")]
        group_size: Option<usize>,

        /// Explicit comma-separated group sizes
        #[arg(long, value_delimiter = ',')]
        groups: Option<Vec<usize>>,

        #[command(flatten)]
        options: OutputArgs,
    },

    /// Repeat the whole document N times
    Dupe {
        /// Input file
        input: PathBuf,
        /// Output file (defaults to the input)
        output: Option<PathBuf>,

        /// Number of copies
        #[arg(short = 'n', long)]
        count: usize,

        #[command(flatten)]
        options: OutputArgs,
    },

    /// Rotate pages by a multiple of 90 degrees
    Rotate {
        /// Input file
        input: PathBuf,
        /// Output file (defaults to the input)
        output: Option<PathBuf>,

        /// Degrees clockwise; negative values rotate counter-clockwise
        #[arg(short = 'd', long, allow_negative_numbers = true)]
        degrees: i64,

        #[command(flatten)]
        pages: OptionalPages,

        #[command(flatten)]
        options: OutputArgs,
    },

    /// Delete the selected pages
    Delete {
        /// Input file
        input: PathBuf,
        /// Output file (defaults to the input)
        output: Option<PathBuf>,

        #[command(flatten)]
        pages: RequiredPages,

        /// Keep the selected pages and delete all others
        #[arg(long)]
        negate: bool,

        #[command(flatten)]
        options: OutputArgs,
    },

    /// Reverse the page order
    Reverse {
        /// Input file
        input: PathBuf,
        /// Output file (defaults to the input)
        output: Option<PathBuf>,

        #[command(flatten)]
        options: OutputArgs,
    },

    /// Copy the selected pages, in the given order, into a new document
    Extract {
        /// Input file
        input: PathBuf,
        /// Output file
        output: PathBuf,

        #[command(flatten)]
        pages: RequiredPages,

        #[command(flatten)]
        options: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Compress uncompressed streams with FlateDecode
    #[arg(short = 'c', long)]
    compress: bool,

    /// Write a cross-reference stream instead of a table
    #[arg(long)]
    xref_stream: bool,
}

impl OutputArgs {
    fn config(&self) -> WriterConfig {
        WriterConfig::default()
            .with_compress(self.compress)
            .with_xref_stream(self.xref_stream)
    }
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct RequiredPages {
    /// Page ranges, e.g. 1-3,5,8-
    #[arg(short = 'p', long)]
    pages: Option<PageSelection>,

    /// Every Nth page
    #[arg(short = 'e', long)]
    every: Option<usize>,
}

#[derive(Args, Debug)]
#[group(required = false, multiple = false)]
struct OptionalPages {
    /// Page ranges, e.g. 1-3,5,8- (default: all pages)
    #[arg(short = 'p', long)]
    pages: Option<PageSelection>,

    /// Every Nth page
    #[arg(short = 'e', long)]
    every: Option<usize>,
}

fn selection(pages: Option<PageSelection>, every: Option<usize>) -> PageSelection {
    match (pages, every) {
        (Some(pages), _) => pages,
        (None, Some(n)) => PageSelection::Every(n),
        (None, None) => PageSelection::All,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let category = err.category();
            eprintln!("pdfh: {}: {}", category.label(), err);
            ExitCode::from(category.exit_code() as u8)
        },
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Merge { mut paths, options } => {
            // clap guarantees at least two paths
            let target = paths.pop().unwrap_or_default();
            let inputs = expand_inputs(&paths)?;
            log::info!("Merging {} files into {}", inputs.len(), target.display());
            let docs = inputs
                .par_iter()
                .map(Document::open)
                .collect::<Result<Vec<_>>>()?;
            let merged = transform::merge(docs)?;
            writer::save(&merged, &target, &options.config())
        },
        Command::Split {
            input,
            output,
            group_size,
            groups,
            options,
        } => {
            let grouping = match (group_size, groups) {
                (Some(n), _) => Grouping::Chunks(n),
                (None, Some(sizes)) => Grouping::Groups(sizes),
                (None, None) => Grouping::Single,
            };
            let doc = Document::open(&input)?;
            let parts = transform::split(&doc, &grouping)?;
            let config = options.config();
            parts
                .par_iter()
                .enumerate()
                .try_for_each(|(i, part)| writer::save(part, numbered_path(&output, i + 1), &config))
        },
        Command::Dupe {
            input,
            output,
            count,
            options,
        } => {
            let doc = transform::dupe(Document::open(&input)?, count)?;
            save_or_replace(&doc, &input, output, &options)
        },
        Command::Rotate {
            input,
            output,
            degrees,
            pages,
            options,
        } => {
            let rotation = Rotation::from_degrees(degrees)?;
            let selection = selection(pages.pages, pages.every);
            let doc = transform::rotate(Document::open(&input)?, rotation, &selection)?;
            save_or_replace(&doc, &input, output, &options)
        },
        Command::Delete {
            input,
            output,
            pages,
            negate,
            options,
        } => {
            let selection = selection(pages.pages, pages.every);
            let doc = transform::delete(Document::open(&input)?, &selection, negate)?;
            save_or_replace(&doc, &input, output, &options)
        },
        Command::Reverse {
            input,
            output,
            options,
        } => {
            let doc = transform::reverse(Document::open(&input)?)?;
            save_or_replace(&doc, &input, output, &options)
        },
        Command::Extract {
            input,
            output,
            pages,
            options,
        } => {
            let selection = selection(pages.pages, pages.every);
            let doc = transform::extract(Document::open(&input)?, &selection)?;
            writer::save(&doc, &output, &options.config())
        },
    }
}

fn save_or_replace(
    doc: &Document,
    input: &Path,
    output: Option<PathBuf>,
    options: &OutputArgs,
) -> Result<()> {
    let target = output.unwrap_or_else(|| input.to_path_buf());
    writer::save(doc, target, &options.config())
}

/// Replace each directory with the `.pdf` files directly inside it, sorted by name.
fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if !path.is_dir() {
            inputs.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?.path();
            let is_pdf = entry
                .extension()
                .is_some_and(|ext| ext == "pdf" || ext == "PDF");
            if is_pdf && entry.is_file() {
                found.push(entry);
            }
        }
        found.sort();
        log::debug!("{} contains {} PDF files", path.display(), found.len());
        inputs.extend(found);
    }
    if inputs.is_empty() {
        return Err(Error::EmptyResult("no input files".to_string()));
    }
    Ok(inputs)
}

/// `dir/name.pdf` with n = 3 becomes `dir/name_3.pdf`.
fn numbered_path(template: &Path, n: usize) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "split".to_string());
    template.with_file_name(format!("{}_{}.pdf", stem, n))
}
