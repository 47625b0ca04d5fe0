use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use serde::Serialize;

use connection_lab::config::EngineConfig;
use connection_lab::model::StructuralModel;
use connection_lab::pipeline::Pipeline;
use connection_lab::report::ValidationReport;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Structural model as JSON: members, optionally joints and hardware
    model: PathBuf,

    /// Engine config overrides as JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Correction iteration budget
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    model: &'a StructuralModel,
    report: &'a ValidationReport,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, String> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    config.validate().map_err(|e| e.to_string())?;

    let json = std::fs::read_to_string(&args.model)
        .map_err(|e| format!("could not read {}: {e}", args.model.display()))?;
    let model = StructuralModel::from_json(&json).map_err(|e| e.to_string())?;
    let (model, report) = Pipeline::new(config).run(model).map_err(|e| e.to_string())?;
    let output = Output {
        model: &model,
        report: &report,
    };
    let printed = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    };
    printed.map_err(|e| e.to_string())
}
