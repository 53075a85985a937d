use clap::{Parser, ValueEnum};
use gdal::{Dataset, Driver, DriverManager, Metadata};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use eliminate::{
    EliminateError, EliminateOptions, MergePolicy, RunSummary, VictimSpec, eliminate,
};

#[derive(Parser, Debug)]
#[command(
    name = "eliminate",
    about = "Merge selected polygons into a touching neighbor, discarding their attributes"
)]
struct Args {
    /// Source dataset path or connection string
    src: PathBuf,

    /// Destination dataset path
    dst: PathBuf,

    /// Attribute filter selecting the victims, e.g. "OGR_GEOM_AREA < 0.01"
    #[arg(long = "where", required_unless_present = "min")]
    where_filter: Option<String>,

    /// Select victims smaller than this area (shorthand for an
    /// OGR_GEOM_AREA filter)
    #[arg(long, conflicts_with = "where_filter")]
    min: Option<f64>,

    /// Output driver name; inferred from the destination extension if omitted
    #[arg(short = 'f', long = "format")]
    format: Option<String>,

    /// Which touching neighbor absorbs each victim
    #[arg(long, value_enum, default_value_t = PolicyArg::LargestArea)]
    policy: PolicyArg,

    /// Source layer name (required when the dataset has several layers)
    #[arg(long)]
    src_layer: Option<String>,

    /// Destination layer name (defaults to the source layer name)
    #[arg(long)]
    dst_layer: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Suppress the progress bar
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    LargestArea,
    SmallestArea,
    LongestBoundary,
}

impl From<PolicyArg> for MergePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::LargestArea => MergePolicy::LargestArea,
            PolicyArg::SmallestArea => MergePolicy::SmallestArea,
            PolicyArg::LongestBoundary => MergePolicy::LongestBoundary,
        }
    }
}

/// Pick the output driver from the destination file extension. An ambiguous
/// extension picks the first matching driver and warns.
fn guess_driver(dst: &Path) -> Result<Driver, EliminateError> {
    let ext = dst
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    let mut matches: Vec<Driver> = Vec::new();
    for i in 0..DriverManager::count() {
        let Ok(driver) = DriverManager::get_driver(i) else {
            continue;
        };
        if driver.metadata_item("DCAP_VECTOR", "").as_deref() != Some("YES") {
            continue;
        }
        let Some(extensions) = driver.metadata_item("DMD_EXTENSIONS", "") else {
            continue;
        };
        if !ext.is_empty()
            && extensions
                .split_whitespace()
                .any(|e| e.eq_ignore_ascii_case(ext))
        {
            matches.push(driver);
        }
    }

    match matches.len() {
        0 => Err(EliminateError::UnknownDriver(format!(
            "{} (no vector driver claims this extension)",
            dst.display()
        ))),
        1 => Ok(matches.remove(0)),
        n => {
            let names: Vec<String> = matches.iter().map(|d| d.short_name()).collect();
            warn!(
                "{n} drivers match '{ext}' ({}), using {}",
                names.join(", "),
                names[0]
            );
            Ok(matches.remove(0))
        }
    }
}

/// `--min A` is sugar for an area filter; the layer sees the same predicate
/// a handwritten `--where` would produce.
fn min_area_filter(min: f64) -> String {
    format!("OGR_GEOM_AREA < {min}")
}

fn run(args: &Args) -> Result<RunSummary, EliminateError> {
    let victims = match (&args.where_filter, args.min) {
        (Some(_), Some(_)) => return Err(EliminateError::ConflictingVictimSpec),
        (Some(filter), None) => VictimSpec::Where(filter.clone()),
        (None, Some(min)) => {
            if !(min > 0.0) {
                return Err(EliminateError::InvalidMinArea(min));
            }
            VictimSpec::Where(min_area_filter(min))
        }
        (None, None) => return Err(EliminateError::NoVictimsSpecified),
    };

    let src = Dataset::open(&args.src)?;
    let driver = match &args.format {
        Some(name) => DriverManager::get_driver_by_name(name)
            .map_err(|_| EliminateError::UnknownDriver(name.clone()))?,
        None => guess_driver(&args.dst)?,
    };
    let mut dst = driver.create_vector_only(&args.dst)?;

    eliminate(
        &src,
        args.src_layer.as_deref(),
        &mut dst,
        args.dst_layer.as_deref(),
        &victims,
        &EliminateOptions {
            policy: args.policy.into(),
            progress: !args.quiet,
        },
    )
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    match run(&args) {
        Ok(summary) => {
            info!(
                "done: {} features written, {} victims absorbed, {} dropped",
                summary.emitted, summary.absorbed, summary.dropped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
