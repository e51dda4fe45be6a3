//! U-Net CLI
//!
//! Builds the network with freshly initialized weights and exercises it on
//! synthetic input: a single forward pass, the spatial plan, or a latency
//! benchmark.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::config::Config;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{debug, info};

use unet_burn::backend::{backend_name, default_device, DefaultBackend};
use unet_burn::inference::{run_benchmark, run_self_test, BenchmarkConfig, SelfTestOptions};
use unet_burn::model::UNetConfig;
use unet_burn::utils::format_dims;
use unet_burn::utils::logging::{init_logging, LogConfig, LogLevel};

/// U-Net image-to-image network on the Burn framework
#[derive(Parser, Debug)]
#[command(name = "unet")]
#[command(version)]
#[command(about = "U-Net forward pass, shape planning and benchmarking with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Log level: trace, debug, info, warn or error (ignored with --verbose)
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Model configuration JSON (defaults to the reference 1 -> 2 channel U-Net)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one forward pass on a synthetic image and print the result
    Forward {
        /// Image size (square)
        #[arg(short, long, default_value = "572")]
        size: usize,

        /// Batch size
        #[arg(short, long, default_value = "1")]
        batch_size: usize,

        /// Use an all-zero image instead of uniform noise
        #[arg(long, default_value = "false")]
        zeros: bool,

        /// Random seed for weights and input
        #[arg(long)]
        seed: Option<u64>,

        /// Print the full output tensor
        #[arg(long, default_value = "false")]
        print_values: bool,

        /// Write the report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the spatial extents at every stage without running the network
    Plan {
        /// Image size (square)
        #[arg(short, long, default_value = "572")]
        size: usize,
    },

    /// Benchmark forward pass latency
    Benchmark {
        /// Number of timed iterations
        #[arg(short, long, default_value = "10")]
        iterations: usize,

        /// Number of warmup iterations
        #[arg(long, default_value = "2")]
        warmup: usize,

        /// Batch size
        #[arg(short, long, default_value = "1")]
        batch_size: usize,

        /// Image size (square)
        #[arg(short, long, default_value = "572")]
        size: usize,

        /// Output JSON file for benchmark results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the model configuration as JSON
    InitConfig {
        /// Output file path
        #[arg(short, long, default_value = "unet_config.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::with_level(cli.log_level)
    };
    init_logging(&log_config).map_err(|e| anyhow::anyhow!(e))?;
    debug!("Logging at {}", log_config.level);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Forward {
            size,
            batch_size,
            zeros,
            seed,
            print_values,
            output,
        } => cmd_forward(&config, size, batch_size, zeros, seed, print_values, output),
        Commands::Plan { size } => cmd_plan(&config, size),
        Commands::Benchmark {
            iterations,
            warmup,
            batch_size,
            size,
            output,
        } => {
            let bench = BenchmarkConfig {
                warmup_iterations: warmup,
                iterations,
                batch_size,
                image_size: size,
                output_path: output,
            };
            let device = default_device();
            run_benchmark::<DefaultBackend>(&config, &bench, &device)?;
            Ok(())
        }
        Commands::InitConfig { output } => {
            config
                .save(&output)
                .with_context(|| format!("Failed to write config to {:?}", output))?;
            println!("{} {:?}", "Wrote configuration to".green(), output);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<UNetConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            UNetConfig::load(path)
                .map_err(|e| anyhow::anyhow!("Failed to load config {:?}: {:?}", path, e))?
        }
        None => UNetConfig::new(),
    };

    config.validate()?;
    Ok(config)
}

fn cmd_forward(
    config: &UNetConfig,
    size: usize,
    batch_size: usize,
    zeros: bool,
    seed: Option<u64>,
    print_values: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    println!("{}", "U-Net forward pass".green().bold());
    println!("  Backend: {}", backend_name());

    let options = SelfTestOptions {
        batch_size,
        image_size: size,
        zeros,
        seed,
    };
    let device = default_device();
    let (report, tensor) = run_self_test::<DefaultBackend>(config, &options, &device)?;

    println!("  Parameters: {}", unet_burn::utils::format_number(report.num_params));
    println!("  Input:  {}", format_dims(&report.input_dims));
    for join in &report.joins {
        println!(
            "  Decoder {}: {} + {} -> {} channels",
            join.stage,
            format_dims(&join.upsampled),
            format_dims(&join.cropped_skip),
            join.fused_channels
        );
    }
    println!("  Output: {}", format_dims(&report.output_dims).bold());
    println!(
        "  Scores: min {:.5}, max {:.5}, mean {:.5}",
        report.stats.min, report.stats.max, report.stats.mean
    );
    println!(
        "  Time:   {}",
        unet_burn::utils::format_duration(report.elapsed_ms / 1000.0)
    );

    if print_values {
        println!("{}", tensor);
    }

    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        println!("  Saved report to: {:?}", path);
    }

    if report.passed() {
        println!("{}", "✓ Output shape and values OK".green().bold());
        Ok(())
    } else {
        anyhow::bail!(
            "self-test failed: output {} (expected {}), {} non-finite values",
            format_dims(&report.output_dims),
            format_dims(&report.expected_dims),
            report.stats.non_finite
        )
    }
}

fn cmd_plan(config: &UNetConfig, size: usize) -> Result<()> {
    let plan = config.shape_plan(size)?;
    println!("{}", "U-Net spatial plan".green().bold());
    println!("{}", plan);
    println!(
        "Minimum input size: {}",
        config.min_input_size()?.to_string().bold()
    );
    Ok(())
}
