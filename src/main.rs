//! Smeta - construction estimate calculator

mod report;

use anyhow::Context;
use smeta_core::{DocumentStore, EngineConfig, load_config};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage: smeta [OPTIONS] FILE");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  FILE                      Estimate document to recalculate (.json)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --json                    Print the totals summary as JSON");
    eprintln!("  -o, --output <FILE>       Write the recalculated document to FILE");
    eprintln!("  --config <FILE>           Load settings from a TOML file");
    eprintln!("  --no-config               Ignore the per-user config file");
    eprintln!("  -h, --help                Print help");
}

struct Options {
    file_path: PathBuf,
    output_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    no_config: bool,
    json: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut file_path: Option<PathBuf> = None;
    let mut output_file: Option<PathBuf> = None;
    let mut config_file: Option<PathBuf> = None;
    let mut no_config = false;
    let mut json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "--json" => json = true,
            "--no-config" => no_config = true,
            "-o" | "--output" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --output requires a file path");
                    std::process::exit(1);
                }
                output_file = Some(PathBuf::from(&args[i]));
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
                config_file = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if file_path.is_none() {
                    file_path = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    let Some(file_path) = file_path else {
        eprintln!("Error: missing estimate file");
        print_usage();
        std::process::exit(1);
    };

    init_tracing();

    let options = Options {
        file_path,
        output_file,
        config_file,
        no_config,
        json,
    };
    if let Err(e) = run(options) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(options: Options) -> anyhow::Result<()> {
    let config = if options.no_config && options.config_file.is_none() {
        EngineConfig::default()
    } else {
        let (config, warnings) = load_config(options.config_file.as_deref());
        for warning in warnings {
            eprintln!("Warning: {}", warning);
        }
        config
    };

    let mut store = DocumentStore::new(config);
    store
        .load_file(&options.file_path)
        .with_context(|| format!("cannot load {}", options.file_path.display()))?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&store.totals())?);
    } else {
        let mut stdout = std::io::stdout().lock();
        report::write_report(&mut stdout, &store)?;
    }

    if let Some(output_path) = options.output_file {
        store
            .save_as(&output_path)
            .with_context(|| format!("cannot write {}", output_path.display()))?;
        tracing::info!(path = %output_path.display(), "wrote recalculated estimate");
    }
    Ok(())
}
