//! Self-test and Benchmark Runner
//!
//! Builds a model with freshly initialized weights, pushes a synthetic input
//! through it and reports what came out. Used by the `forward` and
//! `benchmark` CLI commands.

use std::time::Instant;

use anyhow::{Context, Result};
use burn::{
    module::Module,
    tensor::{backend::Backend, Distribution, Tensor},
};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::benchmark::{BenchmarkConfig, DeviceInfo, LatencyStats, Timer};
use crate::model::{SkipJoin, UNet, UNetConfig};
use crate::utils::logging::ProgressLogger;
use crate::utils::{format_dims, format_number};

/// Summary statistics of an output score map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    /// Number of NaN or infinite values
    pub non_finite: usize,
    pub count: usize,
}

impl OutputStats {
    /// Pull the tensor back to the host and summarize it
    pub fn from_tensor<B: Backend>(tensor: Tensor<B, 4>) -> Result<Self> {
        let values: Vec<f32> = tensor
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Failed to read output tensor: {:?}", e))?;

        Ok(Self::from_values(&values))
    }

    pub fn from_values(values: &[f32]) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut non_finite = 0;

        for &v in values {
            if !v.is_finite() {
                non_finite += 1;
                continue;
            }
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
        }

        let finite = values.len() - non_finite;
        Self {
            min: if finite > 0 { min } else { 0.0 },
            max: if finite > 0 { max } else { 0.0 },
            mean: if finite > 0 { sum / finite as f64 } else { 0.0 },
            non_finite,
            count: values.len(),
        }
    }

    pub fn all_finite(&self) -> bool {
        self.non_finite == 0
    }
}

/// Synthetic input used by the self-test
#[derive(Debug, Clone)]
pub struct SelfTestOptions {
    pub batch_size: usize,
    pub image_size: usize,
    /// All-zero input instead of uniform noise in [0, 1)
    pub zeros: bool,
    /// Seed for weights and input
    pub seed: Option<u64>,
}

impl Default for SelfTestOptions {
    fn default() -> Self {
        Self {
            batch_size: 1,
            image_size: crate::model::REFERENCE_INPUT_SIZE,
            zeros: false,
            seed: None,
        }
    }
}

/// What a single self-test forward pass produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub input_dims: [usize; 4],
    pub output_dims: [usize; 4],
    /// Output shape predicted from the configuration alone
    pub expected_dims: [usize; 4],
    pub num_params: usize,
    pub joins: Vec<SkipJoin>,
    pub stats: OutputStats,
    pub elapsed_ms: f64,
}

impl SelfTestReport {
    /// Output shape matches the prediction and every value is finite
    pub fn passed(&self) -> bool {
        self.output_dims == self.expected_dims && self.stats.all_finite()
    }
}

/// Run one forward pass on a synthetic input
///
/// Returns the report together with the raw output so callers can print it.
pub fn run_self_test<B: Backend>(
    config: &UNetConfig,
    options: &SelfTestOptions,
    device: &B::Device,
) -> Result<(SelfTestReport, Tensor<B, 4>)> {
    if let Some(seed) = options.seed {
        B::seed(seed);
    }

    let model: UNet<B> = config.init(device).context("Failed to build model")?;

    let input_dims = [
        options.batch_size,
        config.in_channels,
        options.image_size,
        options.image_size,
    ];
    let expected_dims = model.output_dims(input_dims)?;

    let input = if options.zeros {
        Tensor::<B, 4>::zeros(input_dims, device)
    } else {
        Tensor::<B, 4>::random(input_dims, Distribution::Uniform(0.0, 1.0), device)
    };

    info!(
        "Running forward pass: input {} -> expected {}",
        format_dims(&input_dims),
        format_dims(&expected_dims)
    );

    let start = Instant::now();
    let (output, joins) = model.forward_traced(input)?;
    let output_dims = output.dims();
    let stats = OutputStats::from_tensor(output.clone())?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let report = SelfTestReport {
        input_dims,
        output_dims,
        expected_dims,
        num_params: model.num_params(),
        joins,
        stats,
        elapsed_ms,
    };

    Ok((report, output))
}

/// Benchmark results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkOutput {
    pub framework: String,
    pub device: DeviceInfo,
    pub batch_size: usize,
    pub image_size: usize,
    pub num_iterations: usize,
    pub warmup_iterations: usize,
    pub num_params: usize,
    pub latency: LatencyStats,
    /// Forward passes (images) per second
    pub throughput: f64,
    pub timestamp: String,
}

/// Run a latency benchmark with random input and freshly initialized weights
pub fn run_benchmark<B: Backend>(
    model_config: &UNetConfig,
    config: &BenchmarkConfig,
    device: &B::Device,
) -> Result<BenchmarkOutput> {
    println!("{}", "Initializing Benchmark...".green().bold());
    println!("  Device: {:?}", device);
    println!("  Batch size: {}", config.batch_size);
    println!("  Image size: {}x{}", config.image_size, config.image_size);
    println!("  Warmup iterations: {}", config.warmup_iterations);
    println!("  Benchmark iterations: {}", config.iterations);
    println!();

    let model: UNet<B> = model_config.init(device).context("Failed to build model")?;
    let num_params = model.num_params();
    println!("  Parameters: {}", format_number(num_params));

    let input = Tensor::<B, 4>::random(
        [
            config.batch_size,
            model_config.in_channels,
            config.image_size,
            config.image_size,
        ],
        Distribution::Uniform(0.0, 1.0),
        device,
    );

    println!("{}", "Running warmup...".yellow());
    for _ in 0..config.warmup_iterations {
        let _ = model.forward(input.clone())?;
    }

    println!("{}", "Running benchmark...".green().bold());
    let mut timer = Timer::new();
    let mut progress = ProgressLogger::new("Benchmark", config.iterations);

    for _ in 0..config.iterations {
        timer.start();
        // Reading the output back forces lazy backends to finish the pass
        let output = model.forward(input.clone())?;
        let _ = output.into_data();
        timer.stop();
        progress.increment();
    }
    progress.finish();

    let latency = timer.stats();
    let output = BenchmarkOutput {
        framework: "Burn (Rust)".to_string(),
        device: DeviceInfo::detect(),
        batch_size: config.batch_size,
        image_size: config.image_size,
        num_iterations: config.iterations,
        warmup_iterations: config.warmup_iterations,
        num_params,
        throughput: latency.throughput(config.batch_size),
        latency,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    println!();
    println!("{}", "Benchmark Results:".cyan().bold());
    println!("  Device: {} ({})", output.device.name, output.device.backend);
    println!(
        "  {} {} ± {} ms",
        "Mean latency:".green(),
        format!("{:.2}", output.latency.mean_ms).bold(),
        format!("{:.2}", output.latency.std_ms)
    );
    println!(
        "  P50/P95: {:.2}/{:.2} ms",
        output.latency.p50_ms, output.latency.p95_ms
    );
    println!(
        "  Min/Max: {:.2}/{:.2} ms",
        output.latency.min_ms, output.latency.max_ms
    );
    println!(
        "  {} {} images/s",
        "Throughput:".green(),
        format!("{:.2}", output.throughput).bold()
    );

    if let Some(output_path) = &config.output_path {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&output)?;
        std::fs::write(output_path, &json)?;
        println!();
        println!("  Saved results to: {:?}", output_path);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn narrow_config() -> UNetConfig {
        UNetConfig::new().with_base_channels(2)
    }

    #[test]
    fn test_output_stats() {
        let stats = OutputStats::from_values(&[1.0, -2.0, 4.0, f32::NAN]);
        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.mean - 1.0).abs() < 1e-9);
        assert_eq!(stats.non_finite, 1);
        assert_eq!(stats.count, 4);
        assert!(!stats.all_finite());
    }

    #[test]
    fn test_self_test_reference_zeros() {
        let device = Default::default();
        let options = SelfTestOptions {
            zeros: true,
            seed: Some(42),
            ..Default::default()
        };

        let (report, output) =
            run_self_test::<TestBackend>(&narrow_config(), &options, &device).unwrap();

        assert_eq!(report.input_dims, [1, 1, 572, 572]);
        assert_eq!(report.output_dims, [1, 2, 388, 388]);
        assert_eq!(output.dims(), report.output_dims);
        assert_eq!(report.joins.len(), 4);
        assert_eq!(report.stats.count, 2 * 388 * 388);
        assert!(report.passed());
    }

    #[test]
    fn test_self_test_rejects_small_input() {
        let device = Default::default();
        let options = SelfTestOptions {
            image_size: 32,
            ..Default::default()
        };

        assert!(run_self_test::<TestBackend>(&narrow_config(), &options, &device).is_err());
    }

    #[test]
    fn test_quick_benchmark() {
        let device = Default::default();
        let config = BenchmarkConfig {
            image_size: 188,
            ..BenchmarkConfig::quick()
        };

        let output = run_benchmark::<TestBackend>(&narrow_config(), &config, &device).unwrap();

        assert_eq!(output.num_iterations, 3);
        assert_eq!(output.image_size, 188);
        assert!(output.latency.mean_ms > 0.0);
        assert!(output.throughput > 0.0);
    }
}
