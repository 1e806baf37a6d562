use anyhow::{Context, Result};
use clap::Parser;
use csw_request::context::{ElementSetName, ResultType};
use csw_request::{compile, AxisConvention, LikeOptions, Reprojector, RequestContext, SearchCriteria};
use rayon::ThreadPoolBuilder;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Search criteria JSON file, or a directory of them
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory; a single request goes to stdout when omitted
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Element set of the returned records: brief, summary or full
    #[arg(long, default_value = "full")]
    element_set: ElementSetName,

    /// hits, results or validate
    #[arg(long, default_value = "results")]
    result_type: ResultType,

    #[arg(long, default_value_t = 10_000)]
    max_records: u32,

    #[arg(long, default_value_t = 1)]
    start_position: u32,

    /// Coordinate system the catalogue indexes its bounding boxes in
    #[arg(long, default_value = "EPSG:4326")]
    target_crs: String,

    /// Write spatial operands in the target system's authority axis order
    /// instead of easting first
    #[arg(long)]
    authority_axis: bool,

    /// Do not indent the generated XML
    #[arg(long)]
    compact: bool,
}

impl Args {
    fn request_context(&self) -> RequestContext {
        RequestContext::new()
            .with_element_set(self.element_set)
            .with_result_type(self.result_type)
            .with_paging(self.start_position, self.max_records)
            .with_target_crs(self.target_crs.as_str())
            .with_indent(!self.compact)
    }

    fn reprojector(&self) -> Reprojector {
        let convention = if self.authority_axis {
            AxisConvention::Authority
        } else {
            AxisConvention::EastingFirst
        };
        Reprojector::new().with_target_convention(convention)
    }
}

fn main() -> Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let args = Args::parse();
    let start_time = std::time::Instant::now();

    // Thread pool
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    // Output directory
    if let Some(output) = &args.output {
        fs::create_dir_all(output)
            .with_context(|| format!("Cannot create output directory {:?}", output))?;
    }

    // Input path
    if args.input.is_file() {
        info!("Processing criteria file: {:?}", args.input);
        match &args.output {
            Some(output) => {
                let stem = args
                    .input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("request");
                process_file(&args.input, &output.join(format!("{}.xml", stem)), &args)?;
            }
            None => {
                let document = build_request(&args.input, &args)?;
                std::io::stdout()
                    .write_all(document.as_bytes())
                    .context("Failed to write request to stdout")?;
            }
        }
    } else if args.input.is_dir() {
        let Some(output) = &args.output else {
            anyhow::bail!("Directory input requires --output");
        };
        info!("Processing directory: {:?}", args.input);
        process_directory(&args.input, output, &args)?;
    } else {
        error!("Invalid input path: {:?}", args.input);
        anyhow::bail!("Input path must be a file or directory");
    }

    // Elapsed time
    info!("Total processing time: {:?}", start_time.elapsed());
    Ok(())
}

fn build_request(path: &Path, args: &Args) -> Result<String> {
    let json = fs::read_to_string(path).with_context(|| format!("Cannot read {:?}", path))?;
    let criteria: SearchCriteria =
        serde_json::from_str(&json).with_context(|| format!("Invalid search criteria in {:?}", path))?;

    let context = args.request_context();
    let filter = criteria.to_filter(&context, &LikeOptions::default(), &args.reprojector())?;
    let document = compile(&context, Some(&filter))?;
    Ok(document)
}

fn process_file(path: &Path, output_path: &Path, args: &Args) -> Result<()> {
    let document = build_request(path, args)?;

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Cannot create {:?}", parent))?;
    }
    fs::write(output_path, document).with_context(|| format!("Cannot write {:?}", output_path))?;
    info!("Written GetRecords request: {:?}", output_path);
    Ok(())
}

/// Mirrors the location of `path` below `input_root` under `output`,
/// so equally named files in different subdirectories stay apart.
fn output_path_for(path: &Path, input_root: &Path, output: &Path) -> PathBuf {
    let relative = path
        .strip_prefix(input_root)
        .ok()
        .or_else(|| path.file_name().map(Path::new))
        .unwrap_or_else(|| Path::new("request"));
    output.join(relative).with_extension("xml")
}

fn process_directory(dir: &Path, output: &Path, args: &Args) -> Result<()> {
    use rayon::prelude::*;

    let mut input_files = Vec::new();
    collect_input_files(dir, &mut input_files)?;
    input_files.sort();
    info!("Found {} criteria files", input_files.len());

    let results: Vec<Result<()>> = input_files
        .par_iter()
        .map(|path| process_file(path, &output_path_for(path, dir, output), args))
        .collect();

    let mut errors = Vec::new();
    for (path, result) in input_files.iter().zip(results) {
        if let Err(e) = result {
            errors.push(format!("{}: {:#}", path.display(), e));
        }
    }

    if !errors.is_empty() {
        error!("Failed to process {} files:", errors.len());
        for err in &errors {
            error!("  {}", err);
        }
        anyhow::bail!("{} files failed to process", errors.len());
    }

    Ok(())
}

/// Collects `*.json` files below `dir`, descending into subdirectories.
fn collect_input_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Cannot list {:?}", dir))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_input_files(&path, files)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(path);
        }
    }
    Ok(())
}
