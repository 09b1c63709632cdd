use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

mod packages;

use packages::datasets;
use packages::error::SiftError;
use packages::evaluate;
use packages::formatter;
use packages::miner;
use packages::output;

/// Mines message templates from a raw log file: every line is assigned one
/// template in which variable positions are replaced by "<*>".
#[derive(Parser, Debug)]
#[command(name = "logsift", version, about)]
struct Args {
    /// Raw log file to mine.
    log_file: PathBuf,

    /// Dataset tag selecting the builtin header format, filter regexes and
    /// punctuation expansion pack (e.g. HDFS, Linux, Spark).
    #[arg(short, long)]
    dataset: String,

    /// Header format override, e.g. "<Date> <Time> <Content>". Required
    /// when the dataset tag has no builtin format.
    #[arg(long)]
    log_format: Option<String>,

    /// Extra filter regexes substituted with "<*>" before tokenization,
    /// appended after the dataset pack. Repeatable.
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Extra delimiter regexes deleted before tokenization. Repeatable.
    #[arg(long = "delimiter")]
    delimiters: Vec<String>,

    /// Distinct-token count at which a position is declared variable.
    #[arg(short, long, default_value_t = 2)]
    threshold: usize,

    /// Also rewrite every token containing a digit to "<*>".
    #[arg(long)]
    mask_digits: bool,

    /// Worker threads; values above 1 run the concurrent pipeline.
    #[arg(short, long)]
    num_threads: Option<u32>,

    /// Directory receiving the structured CSV and the template catalog.
    #[arg(short, long, default_value = "result")]
    output_dir: PathBuf,

    /// Ground-truth CSV to score grouping accuracy against.
    #[arg(long)]
    ground_truth: Option<PathBuf>,

    /// Reference column in the ground-truth CSV.
    #[arg(long, default_value = "EventId")]
    reference_column: String,

    /// Verbosity; repeat for trace output.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env(env_logger::Env::default().filter("LOGSIFT_LOG"))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);
    run(args)
}

fn run(args: Args) -> Result<()> {
    let format = match args
        .log_format
        .clone()
        .or_else(|| datasets::format_string(&args.dataset).map(str::to_string))
    {
        Some(format) => format,
        None => return Err(SiftError::UnknownDataset(args.dataset).into()),
    };
    let (headers, _) = formatter::regex_generator(&format)?;
    if !headers.iter().any(|h| h == "Content") {
        return Err(SiftError::MissingContentField(format).into());
    }

    let mut filter_patterns: Vec<String> = datasets::filter_patterns(&args.dataset)
        .into_iter()
        .map(str::to_string)
        .collect();
    filter_patterns.extend(args.filters.iter().cloned());
    let filters = datasets::compile_filters(&filter_patterns)?;

    let mut delimiter_patterns: Vec<String> = datasets::delimiter_patterns(&args.dataset)
        .into_iter()
        .map(str::to_string)
        .collect();
    delimiter_patterns.extend(args.delimiters.iter().cloned());
    let delimiters = datasets::compile_delimiters(&delimiter_patterns)?;

    let start = Instant::now();
    let log = formatter::structure_file(&args.log_file, &format)?;
    log::info!(
        "header-parsed {} lines from {}",
        log.records.len(),
        args.log_file.display()
    );
    log::debug!("{} lines did not match the header format", log.skipped);

    let contents = log.column("Content").expect("Content field was validated");

    let templates = match args.num_threads {
        Some(n) if n > 1 => miner::mine_templates_conc(
            &contents,
            &filters,
            &delimiters,
            &args.dataset,
            args.threshold,
            args.mask_digits,
            n as usize,
        ),
        _ => miner::mine_templates(
            &contents,
            &filters,
            &delimiters,
            &args.dataset,
            args.threshold,
            args.mask_digits,
        ),
    };
    log::info!(
        "mined {} templates from {} lines in {:?}",
        templates.len(),
        contents.len(),
        start.elapsed()
    );

    std::fs::create_dir_all(&args.output_dir)?;
    let per_line = output::line_templates(contents.len(), &templates);
    let structured_path = args
        .output_dir
        .join(format!("{}_structured.csv", args.dataset));
    output::write_structured_csv(&structured_path, &log, &per_line)?;
    let catalog_path = args
        .output_dir
        .join(format!("{}_templates.csv", args.dataset));
    output::write_template_catalog(&catalog_path, &templates)?;
    log::info!(
        "wrote {} and {}",
        structured_path.display(),
        catalog_path.display()
    );

    if let Some(ground_truth) = &args.ground_truth {
        let reference = evaluate::load_reference_column(ground_truth, &args.reference_column)?;
        let accuracy = evaluate::grouping_accuracy(&reference, &templates);
        println!("grouping accuracy: {:.4}", accuracy);
    }

    Ok(())
}
