use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chipclass::config::{LinkConfig, ManifestConfig, ManifestFormat, DEFAULT_MAP_FILENAME};
use chipclass::key::check_metadata;
use chipclass::{
    attributes_to_classes, inspect_output, load_manifest, ChipDataset, FailurePolicy,
    KerasDirectory, KeyKind, SetType,
};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Vehicle chip class directory toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hard-link chips into class-indexed directories
    Build(BuildArgs),
    /// Print the class to index map for a manifest
    Classes(ClassesArgs),
    /// Summarise a materialised class directory
    Info(InfoArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KeyPreset {
    /// make_model
    MakeModel,
    /// color
    Color,
    /// make_model_color
    MakeModelColor,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Auto,
    Json,
    Jsonl,
}

impl From<FormatArg> for ManifestFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Auto => ManifestFormat::Auto,
            FormatArg::Json => ManifestFormat::Json,
            FormatArg::Jsonl => ManifestFormat::JsonLines,
        }
    }
}

#[derive(Args, Debug)]
struct KeyArgs {
    /// Attribute combination defining a class
    #[arg(long, value_enum, default_value = "make-model")]
    key: KeyPreset,

    /// Metadata fields forming the class key, in order (repeat flag; overrides --key)
    #[arg(long = "key-field", value_name = "FIELD")]
    key_fields: Vec<String>,
}

impl KeyArgs {
    fn kind(&self) -> KeyKind {
        if !self.key_fields.is_empty() {
            return KeyKind::Fields(self.key_fields.clone());
        }
        match self.key {
            KeyPreset::MakeModel => KeyKind::MakeModel,
            KeyPreset::Color => KeyKind::Color,
            KeyPreset::MakeModelColor => KeyKind::MakeModelColor,
        }
    }
}

#[derive(Args, Debug)]
struct ManifestArgs {
    /// Chip manifest (JSON or JSON Lines)
    manifest: PathBuf,

    /// Manifest format
    #[arg(long, value_enum, default_value = "auto")]
    format: FormatArg,

    /// Override the manifest's set type (all, query, test, train)
    #[arg(long, value_name = "TYPE")]
    set_type: Option<SetType>,

    /// Keep relative chip paths relative to the working directory
    #[arg(long)]
    no_resolve: bool,
}

impl ManifestArgs {
    fn load(&self) -> Result<ChipDataset> {
        let cfg = ManifestConfig::builder()
            .format(self.format.into())
            .set_type(self.set_type)
            .resolve_relative(!self.no_resolve)
            .build();
        load_manifest(&self.manifest, &cfg)
            .with_context(|| format!("failed to load manifest {}", self.manifest.display()))
    }
}

#[derive(Args, Debug)]
struct BuildArgs {
    #[command(flatten)]
    manifest: ManifestArgs,

    #[command(flatten)]
    key: KeyArgs,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Root directory under the output (defaults to the set type)
    #[arg(long, value_name = "NAME", conflicts_with = "no_root")]
    root: Option<String>,

    /// Write class directories directly into the output directory
    #[arg(long)]
    no_root: bool,

    /// Skip writing the class map JSON
    #[arg(long)]
    no_map: bool,

    /// File name for the class map JSON
    #[arg(long, value_name = "FILE", default_value = DEFAULT_MAP_FILENAME)]
    map_filename: String,

    /// Continue past chips that cannot be linked
    #[arg(long)]
    skip_failures: bool,

    /// Reject chips missing any metadata field used by the key
    #[arg(long)]
    strict: bool,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ClassesArgs {
    #[command(flatten)]
    manifest: ManifestArgs,

    #[command(flatten)]
    key: KeyArgs,

    /// Emit pretty JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Directory holding the class map and class directories
    dir: PathBuf,

    /// File name of the class map JSON
    #[arg(long, value_name = "FILE", default_value = DEFAULT_MAP_FILENAME)]
    map_filename: String,

    /// Emit JSON instead of human-readable output
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Classes(args) => run_classes(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn run_build(args: BuildArgs) -> Result<()> {
    let dataset = args.manifest.load()?;
    if dataset.is_empty() {
        warn!("manifest contains no chips; only the class map will be written");
    }
    let kind = args.key.kind();
    if args.strict {
        check_metadata(&dataset, &kind.fields()).context("strict metadata check failed")?;
    }

    let root = if args.no_root {
        Some(String::new())
    } else {
        args.root.clone()
    };
    let mut cfg = LinkConfig::builder()
        .write_map(!args.no_map)
        .map_filename(args.map_filename.clone())
        .failure_policy(if args.skip_failures {
            FailurePolicy::Skip
        } else {
            FailurePolicy::Abort
        });
    if let Some(root) = root {
        cfg = cfg.root(root);
    }
    let cfg = cfg.build()?;

    if !args.output.is_dir() {
        bail!("output directory {} does not exist", args.output.display());
    }

    let directory = KerasDirectory::new(dataset, kind);
    info!(
        "class key {} produced {} classes",
        args.key.kind(),
        directory.class_to_index().len()
    );

    let spinner = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} linking chips... {elapsed}")
            .context("invalid progress template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let result = directory.write_links_with(&args.output, &cfg);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let metrics = result.with_context(|| {
        format!("failed to write links into {}", args.output.display())
    })?;

    let root_dir = args
        .output
        .join(cfg.root.as_deref().unwrap_or(directory.root()));
    println!(
        "✅ linked {} chips into {} classes under {}",
        metrics.linked,
        directory.class_to_index().len(),
        root_dir.display()
    );
    if metrics.skipped > 0 {
        println!("   skipped {} chips (see warnings)", metrics.skipped);
    }
    println!("   duration {:.2?}", metrics.elapsed);

    Ok(())
}

fn run_classes(args: ClassesArgs) -> Result<()> {
    let dataset = args.manifest.load()?;
    let classes = attributes_to_classes(&dataset, &args.key.kind());

    if args.json {
        println!("{}", classes.to_json_pretty()?);
    } else {
        for (class, index) in classes.iter() {
            println!("{index}\t{class}");
        }
    }

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let summary = inspect_output(&args.dir, &args.map_filename)
        .with_context(|| format!("failed to inspect {}", args.dir.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let empty = summary
        .empty_classes()
        .map(|class| class.class.clone())
        .collect::<Vec<_>>();
    println!("Directory    : {}", summary.root.display());
    println!("Classes      : {}", summary.classes.len());
    println!("Linked files : {}", summary.total_files);
    for class in &summary.classes {
        println!("  {:>4}  {:<32} {}", class.index, class.class, class.files);
    }
    if empty.is_empty() {
        println!("Empty classes: (none)");
    } else {
        println!("Empty classes: {}", empty.join(", "));
    }
    if !summary.unexpected_dirs.is_empty() {
        println!("Unexpected   : {}", summary.unexpected_dirs.join(", "));
    }

    Ok(())
}
