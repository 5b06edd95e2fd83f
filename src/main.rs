mod config;
mod fix;
mod logger;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use log::{error, warn};

use crate::config::Config;
use crate::fix::NmeaAccumulator;
use crate::logger::Logger;

#[derive(Parser)]
#[command(name = "tracklog")]
#[command(about = "GNSS track logging for standalone positioning devices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Run the logging loop over an NMEA sentence stream
    Run {
        config: String,
        /// NMEA input file, "-" for stdin
        #[arg(default_value = "-")]
        input: String,
        /// Delay between sentences when replaying a recorded stream
        #[arg(long)]
        pace: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run {
            config,
            input,
            pace,
        } => run(&config, &input, pace.as_deref()),
    }
}

fn validate(path: &str) -> ExitCode {
    match Config::from_file(path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("  mode: {}", config.logger.mode);
            println!("  time offset: {:+}h", config.logger.time_offset_hours);
            println!(
                "  sample interval: {}",
                humantime::format_duration(config.logger.sample_interval)
            );
            println!("  track volume: {}", config.logger.base_folder.display());
            if let Some(plain) = &config.plain {
                println!("  plain volume: {}", plain.base_folder.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str, input: &str, pace: Option<&str>) -> ExitCode {
    let config = match Config::from_file(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pace = match pace.map(humantime::parse_duration).transpose() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid pace: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        match File::open(input) {
            Ok(f) => Box::new(BufReader::new(f)),
            Err(e) => {
                eprintln!("Error reading {}: {}", input, e);
                return ExitCode::FAILURE;
            }
        }
    };

    let mut logger = match Logger::from_config(&config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Starting logger at {}", chrono::Utc::now());
    logger.setup(None);
    drive(&mut logger, reader, pace);
    logger.shutdown();
    println!("Logging stopped");
    ExitCode::SUCCESS
}

/// The poll loop: one iteration per input sentence. The sampler applies its
/// own throttle on top of whatever cadence the stream arrives at.
fn drive(logger: &mut Logger, reader: Box<dyn BufRead>, pace: Option<Duration>) {
    let started = Instant::now();
    let mut receiver = NmeaAccumulator::new();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("input stream: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        logger.record_raw(&line);
        match receiver.apply(&line) {
            Ok(Some(fix)) => logger.tick(&fix, started.elapsed()),
            Ok(None) => {}
            Err(e) => warn!("discarding sentence: {e}"),
        }

        if let Some(pause) = pace {
            std::thread::sleep(pause);
        }
    }
}
