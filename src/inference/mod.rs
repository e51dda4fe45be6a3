//! Inference module: self-test and benchmarking on synthetic input

pub mod benchmark;
pub mod runner;

// Re-export main types for convenience
pub use benchmark::{BenchmarkConfig, DeviceInfo, LatencyStats, Timer};
pub use runner::{
    run_benchmark, run_self_test, BenchmarkOutput, OutputStats, SelfTestOptions, SelfTestReport,
};
