use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use std::path::PathBuf;

use netsec_cli::config::TrainConfig;
use netsec_cli::logging::init_logging;
use netsec_cli::predict::run_prediction;
use netsec_cli::train::run_training;

fn main() -> Result<()> {
    let matches = Command::new("netsec")
        .version(clap::crate_version!())
        .about("Network security phishing classifier: training pipeline and batch prediction")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log_dir")
                .long("log-dir")
                .help("Directory for timestamped log files")
                .default_value("logs")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("log_stderr")
                .long("log-stderr")
                .help("Log to stderr instead of a file under --log-dir")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("train")
                .about("Run ingestion, validation, transformation and model training")
                .arg(
                    Arg::new("config")
                        .help("Path to a JSON settings file. Defaults are used when omitted.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("source")
                        .long("source")
                        .help("Where the records come from. Defaults to json when --input is given, mongo otherwise.")
                        .value_parser(["mongo", "json"]),
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("JSON array or JSON lines file of records, for the json source")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("artifact_dir")
                        .long("artifact-dir")
                        .help("Root of the timestamped run directories. Overrides the settings file.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed for the train/test split and the model resampling")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("tracker")
                        .long("tracker")
                        .help("Experiment tracker. Overrides the settings file.")
                        .value_parser(["local", "mlflow", "none"]),
                )
                .arg(
                    Arg::new("bucket")
                        .long("bucket")
                        .help("S3 bucket to sync the run and the final model to")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Predict every row of a CSV file with the deployed model")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("Input table (*.csv or *.tsv)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("model_dir")
                        .short('m')
                        .long("model-dir")
                        .help("Directory holding preprocessor.bin and model.bin")
                        .default_value("final_model")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Where the annotated table is written")
                        .default_value("prediction_output/output.csv")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .get_matches();

    dotenvy::dotenv().ok();
    let log_dir: Option<&PathBuf> = if matches.get_flag("log_stderr") {
        None
    } else {
        matches.get_one("log_dir")
    };
    if let Some(path) = init_logging(log_dir.map(PathBuf::as_path))? {
        eprintln!("[netsec] Logging to {:?}", path);
    }

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");
    log::info!("[netsec::train] Settings: {:?}", config_path);

    let outcome = TrainConfig::from_arguments(config_path, matches).and_then(|c| run_training(&c));
    match outcome {
        Ok(artifact) => {
            println!("{}", serde_json::to_string_pretty(&artifact)?);
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let input: &PathBuf = matches
        .get_one("input")
        .ok_or_else(|| anyhow::anyhow!("--input is required"))?;
    let model_dir: &PathBuf = matches
        .get_one("model_dir")
        .ok_or_else(|| anyhow::anyhow!("--model-dir is required"))?;
    let output: &PathBuf = matches
        .get_one("output_file")
        .ok_or_else(|| anyhow::anyhow!("--output is required"))?;
    log::info!("[netsec::predict] Input: {:?}", input);

    match run_prediction(input, model_dir, output) {
        Ok(table) => {
            eprintln!("[netsec::predict] Wrote {} predictions to {:?}", table.n_rows(), output);
            Ok(())
        }
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
