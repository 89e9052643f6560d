use clap::{Parser, Subcommand};
use image_converter::archive::{self, Delivery};
use image_converter::batch::{Batch, Converter};
use image_converter::client::{HttpConverter, LocalConverter};
use image_converter::config::{self, AppConfig};
use image_converter::format::{FormatKey, InputType};
use image_converter::imaging::RustBackend;
use image_converter::{logging, output, server, upload};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "image-converter")]
#[command(about = "Convert HEIC, JPEG, PNG and WebP images")]
#[command(long_about = "\
Convert HEIC, JPEG, PNG and WebP images

Run the conversion service with 'serve', then convert a selection of files
with 'convert'. Files are sent one at a time; a corrupt file fails only its
own conversion.

Output formats:
  jpg-high        JPEG, quality 95
  jpg-balanced    JPEG, quality 80
  webp-high       WebP, quality 90
  webp-balanced   WebP, quality 80
  png             PNG, lossless, keeps transparency

JPEG and WebP outputs are flattened onto white.

Run 'image-converter gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP conversion service
    Serve {
        /// Listen address, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Convert files one at a time and bundle the results
    Convert(ConvertArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Type of the selected files; others are skipped
    #[arg(long, value_enum, default_value_t = InputType::Heic)]
    input_type: InputType,

    /// Output rendition
    #[arg(long, value_enum, default_value_t = FormatKey::JpgHigh)]
    format: FormatKey,

    /// Conversion service URL, overrides client.server_url
    #[arg(long, conflicts_with = "local")]
    server: Option<String>,

    /// Convert in-process instead of calling the service
    #[arg(long)]
    local: bool,

    /// Bundle path
    #[arg(long, default_value = "converted.zip")]
    out: PathBuf,

    /// Write finished files individually here when the bundle is unavailable
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Bundle whatever finished even if some files failed
    #[arg(long)]
    partial: bool,

    /// Files or directories to convert
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            logging::init(cli.verbose)?;
            let mut app_config = config::load_config(&cli.config, false)?;
            if let Some(bind) = bind {
                app_config.server.bind = bind;
                app_config.validate()?;
            }
            server::serve(&app_config.server, Arc::new(RustBackend::new())).await?;
        }
        Command::Convert(args) => {
            logging::init(cli.verbose)?;
            let app_config = config::load_config(&cli.config, false)?;
            convert(&app_config, args).await?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

async fn convert(app_config: &AppConfig, args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let collection = upload::collect(&args.paths, args.input_type)?;
    output::print_skipped(&collection.skipped);

    let mut batch = Batch::new();
    batch.load(collection.files);

    if args.local {
        let converter = LocalConverter::new(RustBackend::new());
        run_batch(&mut batch, &converter, app_config, &args).await;
    } else {
        let base_url = args
            .server
            .as_deref()
            .unwrap_or(&app_config.client.server_url);
        let converter = HttpConverter::new(base_url, app_config.client.connect_timeout())?;
        run_batch(&mut batch, &converter, app_config, &args).await;
    }

    let mut written = Vec::new();
    match archive::plan_delivery(&batch, args.partial, args.out_dir.as_deref()) {
        Delivery::Bundle => {
            let bytes = archive::build_archive(batch.jobs())?;
            std::fs::write(&args.out, bytes)?;
            written.push(args.out.clone());
        }
        Delivery::Individual(dir) => {
            written.extend(archive::write_individually(batch.jobs(), &dir)?);
        }
        Delivery::Withheld => {
            println!("Some files failed; bundle not written (use --partial or --out-dir)");
        }
        Delivery::Nothing => println!("Nothing converted, no bundle written"),
    }

    let summary = batch.summary();
    let shown: Vec<&Path> = written.iter().map(PathBuf::as_path).collect();
    output::print_summary(&summary, &shown);

    if summary.error > 0 {
        return Err(format!("{} of {} conversions failed", summary.error, batch.files().len()).into());
    }
    Ok(())
}

/// Run the batch with a printer thread draining its events.
async fn run_batch<C: Converter>(
    batch: &mut Batch,
    converter: &C,
    app_config: &AppConfig,
    args: &ConvertArgs,
) {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_batch_event(&event) {
                println!("{}", line);
            }
        }
    });
    batch
        .run(
            converter,
            args.input_type,
            args.format,
            app_config.client.progress_interval(),
            Some(tx),
        )
        .await;
    if printer.join().is_err() {
        tracing::warn!("output thread panicked");
    }
}
