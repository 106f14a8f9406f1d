use clap::Parser;
use nuget_config::{
    ConfigError, SearchPaths, find_config,
    json::{EditRequest, EditResponse, resolve_execution_id, run_batch},
    parse, read_config_file, write_config_file,
};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Edit NuGet.Config package sources without disturbing the rest of the file
#[derive(Parser, Debug)]
#[command(name = "nuget-config")]
#[command(version = "0.1.0")]
#[command(about = "Surgical, position-aware edits for NuGet.Config files", long_about = None)]
struct Args {
    /// Config file to edit (searched for from the working directory when omitted)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// JSON file containing the edit batch (omit to read from stdin)
    #[arg(short, long)]
    edits: Option<PathBuf>,

    /// Output structured JSON instead of human-readable
    #[arg(short, long)]
    json: bool,

    /// Write the edited document to this path
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Write the edited document back to the config file
    #[arg(short, long)]
    in_place: bool,

    /// Print the parsed configuration instead of editing
    #[arg(short, long, conflicts_with_all = ["edits", "output", "in_place"])]
    show: bool,
}

/// Read EditRequest from file path or stdin
fn read_edit_request(path: Option<&PathBuf>) -> Result<EditRequest, Box<dyn std::error::Error>> {
    let json_str = if let Some(p) = path {
        fs::read_to_string(p)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let request: EditRequest = serde_json::from_str(&json_str)?;
    Ok(request)
}

fn resolve_config_path(file: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match file {
        Some(path) => Ok(path),
        None => find_config(&SearchPaths::from_environment()),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if args.show {
        return show(&args);
    }

    let request = match read_edit_request(args.edits.as_ref()) {
        Ok(req) => req,
        Err(e) => {
            eprintln!("Error reading edit request: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let execution_id = resolve_execution_id(&request.execution_id);

    let response = match edit(&args, &request) {
        Ok(batch) => EditResponse::success(execution_id, &batch),
        Err(e) => EditResponse::failure(execution_id, &e),
    };

    output_response(&response, args.json);

    if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn edit(args: &Args, request: &EditRequest) -> Result<nuget_config::json::BatchOutput, ConfigError> {
    let path = resolve_config_path(args.file.clone())?;
    let file = read_config_file(&path)?;
    let batch = run_batch(file.bytes(), request)?;

    let destination = if args.in_place {
        Some(&path)
    } else {
        args.output.as_ref()
    };
    if let Some(destination) = destination {
        write_config_file(destination, &batch.output)?;
    }
    Ok(batch)
}

fn show(args: &Args) -> ExitCode {
    let loaded = resolve_config_path(args.file.clone())
        .and_then(|path| read_config_file(&path))
        .and_then(|file| parse(file.bytes()));

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize config: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    for source in &config.package_sources {
        let state = if config.is_source_disabled(&source.key) {
            " (disabled)"
        } else {
            ""
        };
        match &source.protocol_version {
            Some(version) => println!("{} = {} [v{}]{}", source.key, source.value, version, state),
            None => println!("{} = {}{}", source.key, source.value, state),
        }
    }
    ExitCode::SUCCESS
}

/// Format and print the response
fn output_response(response: &EditResponse, json_mode: bool) {
    let output = if json_mode {
        serde_json::to_string_pretty(response)
            .unwrap_or_else(|_| r#"{"error": "Failed to serialize response"}"#.to_string())
    } else if response.success {
        format!(
            "Applied {} edit(s)\nOriginal checksum: {}\nFinal checksum: {}\nTotal byte shift: {}",
            response.applied_count,
            response.original_checksum.as_deref().unwrap_or_default(),
            response.final_checksum.as_deref().unwrap_or_default(),
            response.total_byte_shift
        )
    } else {
        format!(
            "Error ({}): {}",
            response.error_kind.as_deref().unwrap_or("unknown"),
            response.error.as_deref().unwrap_or("Unknown error")
        )
    };

    println!("{}", output);
}
