use std::path::Path;
use std::process::ExitCode;

use octopus_laying::config::{DEFAULT_CONFIG_PATH, PipelineConfig};
use octopus_laying::logging::{self, Stage};
use octopus_laying::pipeline;

fn main() -> ExitCode {
    let config_path = Path::new(DEFAULT_CONFIG_PATH);
    let config = match PipelineConfig::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );
    if config_path.exists() {
        logging::info(Stage::Config, Some(DEFAULT_CONFIG_PATH), "configuration loaded");
    } else {
        logging::info(Stage::Config, None, "no config file, using defaults");
    }

    match pipeline::run(&config) {
        Ok(_) => {
            println!("\n--- Analysis Complete ---");
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(Stage::Pipeline, None, &e.to_string());
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
