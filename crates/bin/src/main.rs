//! Appraisal CLI binary.
//!
//! Provides a command-line interface for property price estimation.

mod input;

use appraisal::features::{
    AreaUnit, Currency, ExchangeRate, FeatureSchema, RawInput, RawValue, catalog_entry,
};
use appraisal::model::SharedModel;
use appraisal::{
    AnalysisOptions, AppraisalConfig, AppraisalError, AppraisalRecord, AppraisalRequest,
    Appraiser, ExportFormat, Exporter,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

/// Importance entries shown by `schema`.
const TOP_FEATURES: usize = 8;

#[derive(Parser)]
#[command(name = "appraisal")]
#[command(about = "Appraisal: property price estimation", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model artifact, overrides the configuration
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Feature metadata artifact, overrides the configuration
    #[arg(long, global = true)]
    metadata: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the price of one property
    Predict(PredictArgs),

    /// Estimate prices for every row of a CSV file
    Batch {
        /// Input CSV, one property per row
        input: PathBuf,

        /// Output file (stdout when absent)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format (csv, json or pretty-json)
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Display currency (usd or eur)
        #[arg(long, default_value = "usd")]
        currency: Currency,
    },

    /// Show the active schema and model statistics
    Schema,
}

#[derive(Args)]
struct PredictArgs {
    /// Above-grade living area
    #[arg(long)]
    living_area: Option<f64>,

    /// Basement area
    #[arg(long)]
    basement_area: Option<f64>,

    /// Garage area
    #[arg(long)]
    garage_area: Option<f64>,

    /// Unit of the area flags (sqft or m2)
    #[arg(long, default_value = "sqft")]
    area_unit: AreaUnit,

    /// Overall quality grade (1-10)
    #[arg(long)]
    quality: Option<f64>,

    /// Garage capacity in cars
    #[arg(long)]
    garage_cars: Option<f64>,

    /// Construction year
    #[arg(long)]
    year_built: Option<f64>,

    /// Full bathrooms
    #[arg(long)]
    full_bath: Option<f64>,

    /// Rooms above grade
    #[arg(long)]
    rooms: Option<f64>,

    /// Fireplaces
    #[arg(long)]
    fireplaces: Option<f64>,

    /// Any other attribute, as name=value (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = input::parse_assignment)]
    set: Vec<(String, f64)>,

    /// Display currency (usd or eur)
    #[arg(long, default_value = "usd")]
    currency: Currency,

    /// Euros per US dollar, overrides the configuration
    #[arg(long)]
    rate: Option<f64>,

    /// Skip the what-if analysis
    #[arg(long)]
    no_sensitivity: bool,

    /// Skip the market comparison
    #[arg(long)]
    no_comparison: bool,

    /// Skip the quality indicators
    #[arg(long)]
    no_indicators: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let shared = SharedModel::from_paths(
        config.artifacts.clone(),
        config.fallback_feature_order.clone(),
    );

    match cli.command {
        Commands::Predict(args) => predict(&shared, config, &args)?,
        Commands::Batch {
            input,
            output,
            format,
            currency,
        } => batch(&shared, config, &input, output, format, currency)?,
        Commands::Schema => schema(&shared)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppraisalConfig, AppraisalError> {
    let mut config = match &cli.config {
        Some(path) => AppraisalConfig::from_file(path)?,
        None => AppraisalConfig::default(),
    };
    if let Some(model) = &cli.model {
        config.artifacts.model = model.clone();
    }
    if let Some(metadata) = &cli.metadata {
        config.artifacts.metadata = metadata.clone();
    }
    Ok(config)
}

fn predict(
    shared: &SharedModel,
    config: AppraisalConfig,
    args: &PredictArgs,
) -> Result<(), Box<dyn Error>> {
    let appraiser = Appraiser::from_shared(shared, config)?;

    let options = AnalysisOptions {
        sensitivity: !args.no_sensitivity,
        comparison: !args.no_comparison,
        indicators: !args.no_indicators,
    };
    let request = AppraisalRequest::new(build_input(args)?)
        .with_currency(args.currency)
        .with_options(options);

    let appraisal = appraiser.appraise(&request)?;
    for degradation in &appraisal.degradations {
        log::warn!("Degraded result: {:?}", degradation);
    }

    let format = if args.pretty {
        ExportFormat::PrettyJson
    } else {
        ExportFormat::Json
    };
    println!("{}", appraisal.export_to_string(format)?);
    Ok(())
}

fn build_input(args: &PredictArgs) -> Result<RawInput, Box<dyn Error>> {
    let surfaces = [
        ("living_area", args.living_area),
        ("basement_area", args.basement_area),
        ("garage_area", args.garage_area),
    ];
    let counts = [
        ("quality", args.quality),
        ("garage_cars", args.garage_cars),
        ("year_built", args.year_built),
        ("full_bath", args.full_bath),
        ("rooms", args.rooms),
        ("fireplaces", args.fireplaces),
    ];

    let mut raw = RawInput::new();
    for (attribute, value) in surfaces {
        if let Some(value) = value {
            raw.insert(attribute, RawValue::area(value, args.area_unit));
        }
    }
    for (attribute, value) in counts {
        if let Some(value) = value {
            raw.insert(attribute, RawValue::scalar(value));
        }
    }
    for (name, value) in &args.set {
        raw.insert(name, input::raw_value(name, *value, args.area_unit));
    }

    if let Some(rate) = args.rate {
        raw = raw.with_exchange_rate(ExchangeRate::new(rate)?);
    }
    Ok(raw)
}

fn batch(
    shared: &SharedModel,
    config: AppraisalConfig,
    path: &Path,
    output: Option<PathBuf>,
    format: ExportFormat,
    currency: Currency,
) -> Result<(), Box<dyn Error>> {
    let appraiser = Appraiser::from_shared(shared, config)?;
    let requests = input::read_requests(File::open(path)?, currency)?;
    let results = appraiser.appraise_batch(&requests);

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        log::warn!("{} of {} rows failed", failed, requests.len());
    }

    let records: Vec<AppraisalRecord> = requests
        .iter()
        .zip(&results)
        .map(|(request, result)| {
            AppraisalRecord::from_result(request.id.clone().unwrap_or_default(), result)
        })
        .collect();

    match output {
        Some(output) => {
            records.export_to_file(&output, format)?;
            log::info!("Wrote {} records to {}", records.len(), output.display());
        }
        None => print!("{}", records.export_to_string(format)?),
    }
    Ok(())
}

fn schema(shared: &SharedModel) -> Result<(), Box<dyn Error>> {
    let context = shared.get().map_err(AppraisalError::Unavailable)?;
    let schema = context.schema();

    let report = json!({
        "features": describe_features(schema),
        "fingerprint": format!("{:016x}", schema.fingerprint()),
        "estimator": context.engine().estimator_name(),
        "error_margin": context.engine().error_margin(),
        "metadata_source": context.source(),
        "statistics": context.statistics(),
        "top_features": context.metadata().top_features(TOP_FEATURES),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Schema features in model order, with catalog descriptions where known.
fn describe_features(schema: &FeatureSchema) -> Vec<Value> {
    schema
        .features()
        .iter()
        .map(|feature| {
            let entry = catalog_entry(&feature.name).filter(|e| e.name == feature.name);
            json!({
                "name": feature.name,
                "attribute": feature.attribute,
                "aliases": feature.aliases,
                "unit": feature.unit,
                "valid_min": feature.valid_min,
                "valid_max": feature.valid_max,
                "default": feature.default,
                "category": entry.as_ref().map(|e| e.category),
                "description": entry.as_ref().map(|e| e.description),
            })
        })
        .collect()
}
