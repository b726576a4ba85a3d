//! CLI пайплайна: обучение и предсказание

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use student_performance::{PipelineConfig, PredictionPipeline, RunLog, Table, TrainingPipeline};

/// Пайплайн оценки успеваемости студентов
#[derive(Parser, Debug)]
#[command(name = "student-performance")]
#[command(about = "Train and apply student performance regression models", long_about = None)]
struct Cli {
    /// JSON config file; built-in defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Run ingestion, transformation and training
    Train,

    /// Predict math scores for rows of a CSV file
    Predict {
        /// Input CSV with the feature columns
        input: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => {
            let config = PipelineConfig::default();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    let _log = RunLog::init(&config.log_dir)?;

    match cli.command.unwrap_or(Commands::Train) {
        Commands::Train => {
            let report = TrainingPipeline::new(config).run()?;
            println!("{}", report);
        }
        Commands::Predict { input } => {
            let pipeline = PredictionPipeline::load(
                &config.transformation.preprocessor_file,
                &config.trainer.model_file,
            )?;
            let table = Table::read_csv(&input)
                .with_context(|| format!("cannot read {}", input.display()))?;
            for value in pipeline.predict(&table)? {
                println!("{:.4}", value);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("student-performance").chain(args.iter().copied()))
    }

    #[test]
    fn no_arguments_mean_train() {
        let cli = parse(&[]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn predict_takes_input_and_config() {
        let cli = parse(&["predict", "new.csv", "--config", "run.json"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Predict {
                input: PathBuf::from("new.csv")
            })
        );
        assert_eq!(cli.config, Some(PathBuf::from("run.json")));
    }

    #[test]
    fn config_accepts_equals_form_before_the_command() {
        let cli = parse(&["--config=run.json", "train"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Train));
        assert_eq!(cli.config, Some(PathBuf::from("run.json")));

        let cli = parse(&["-c", "other.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("other.json")));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse(&["predict"]).is_err());
        assert!(parse(&["evaluate"]).is_err());
        assert!(parse(&["train", "--config"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
        assert!(parse(&["train", "extra"]).is_err());
    }
}
