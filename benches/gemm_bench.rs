//! GEMM Benchmark Suite
//!
//! Benchmarks for the primitives dispatch layer covering:
//! - Reference vs CPU backend GEMM
//! - Batched GEMM
//! - Profiling overhead (instrumented vs bare launches)
//!
//! Run with: `cargo bench --bench gemm_bench`

use std::hint::black_box;
use std::time::{Duration, Instant};

use kernelforge::accelerator::AcceleratorKind;
use kernelforge::primitives::{CancellationToken, PerformancePrimitives, PrimitivesFactory};
use kernelforge::profiler::{Dim3, PerformanceProfiler};
use kernelforge::tensor::Tensor;

// ============================================================================
// Benchmark Harness
// ============================================================================

struct Benchmark {
    name: String,
    iterations: usize,
    warmup_iterations: usize,
}

impl Benchmark {
    fn new(name: &str, iterations: usize) -> Self {
        Benchmark {
            name: name.to_string(),
            iterations,
            warmup_iterations: iterations.min(10),
        }
    }

    fn run_time<F, R>(&self, mut f: F) -> BenchmarkResult
    where
        F: FnMut() -> R,
    {
        // Warmup
        for _ in 0..self.warmup_iterations {
            black_box(f());
        }

        // Actual measurements
        let mut durations = Vec::with_capacity(self.iterations);
        for _ in 0..self.iterations {
            let start = Instant::now();
            black_box(f());
            durations.push(start.elapsed());
        }

        BenchmarkResult {
            name: self.name.clone(),
            iterations: self.iterations,
            durations,
        }
    }
}

struct BenchmarkResult {
    name: String,
    iterations: usize,
    durations: Vec<Duration>,
}

impl BenchmarkResult {
    fn report(&self) {
        let total: Duration = self.durations.iter().sum();
        let avg = total / self.iterations as u32;
        let min = *self.durations.iter().min().unwrap();
        let max = *self.durations.iter().max().unwrap();

        println!("\n=== {} ===", self.name);
        println!("Iterations: {}", self.iterations);
        println!("Average: {:?} ({:.3} ms)", avg, avg.as_secs_f64() * 1000.0);
        println!("Min:     {:?} ({:.3} ms)", min, min.as_secs_f64() * 1000.0);
        println!("Max:     {:?} ({:.3} ms)", max, max.as_secs_f64() * 1000.0);
    }

    fn report_with_gflops(&self, m: usize, n: usize, k: usize) {
        self.report();

        // matmul requires 2*m*n*k floating point operations (multiply-add)
        let flops = 2.0 * m as f64 * n as f64 * k as f64;
        let total: Duration = self.durations.iter().sum();
        let avg_s = (total / self.iterations as u32).as_secs_f64();
        println!("GFLOPS: {:.2}", flops / avg_s / 1e9);
    }
}

// ============================================================================
// Test Data Generation
// ============================================================================

fn sequential_tensor(shape: &[usize]) -> Tensor<f32> {
    let len: usize = shape.iter().product();
    let data: Vec<f32> = (0..len).map(|i| (i % 97) as f32 * 0.01).collect();
    Tensor::from_vec(data, shape).unwrap()
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_gemm_backends(runtime: &tokio::runtime::Runtime) {
    for (kind, label) in [
        (AcceleratorKind::Npu, "reference"),
        (AcceleratorKind::Cpu, "cpu"),
    ] {
        let primitives = PrimitivesFactory::create::<f32>(kind);
        let token = CancellationToken::new();

        for size in [64usize, 128, 256] {
            let a = sequential_tensor(&[size, size]);
            let b = sequential_tensor(&[size, size]);
            let mut c = Tensor::zeros(&[size, size]);

            let bench = Benchmark::new(&format!("gemm_{}_{}x{}", label, size, size), 20);
            let result = bench.run_time(|| {
                runtime
                    .block_on(primitives.gemm(&a, &b, &mut c, 1.0, 0.0, &token))
                    .unwrap();
            });
            result.report_with_gflops(size, size, size);
        }
    }
}

fn bench_batched_gemm(runtime: &tokio::runtime::Runtime) {
    let primitives = PrimitivesFactory::create::<f32>(AcceleratorKind::Cpu);
    let token = CancellationToken::new();

    let a = sequential_tensor(&[8, 64, 64]);
    let b = sequential_tensor(&[8, 64, 64]);
    let mut c = Tensor::zeros(&[8, 64, 64]);

    let bench = Benchmark::new("batched_gemm_8x64x64", 20);
    let result = bench.run_time(|| {
        runtime
            .block_on(primitives.batched_gemm(&a, &b, &mut c, &token))
            .unwrap();
    });
    result.report();
}

fn bench_profiling_overhead(runtime: &tokio::runtime::Runtime) {
    let primitives = PrimitivesFactory::create::<f32>(AcceleratorKind::Cpu);
    let token = CancellationToken::new();
    let a = sequential_tensor(&[64, 64]);
    let b = sequential_tensor(&[64, 64]);
    let mut c = Tensor::zeros(&[64, 64]);

    // Bare launches
    let bench = Benchmark::new("gemm_64_bare", 50);
    let bare = bench.run_time(|| {
        runtime
            .block_on(primitives.gemm(&a, &b, &mut c, 1.0, 0.0, &token))
            .unwrap();
    });
    bare.report();

    // Instrumented launches
    let profiler = PerformanceProfiler::new();
    profiler.start_session("overhead");
    let bench = Benchmark::new("gemm_64_profiled", 50);
    let instrumented = bench.run_time(|| {
        let _ctx =
            profiler.start_kernel_profiling("gemm_64", Dim3::new(64, 64, 1), Dim3::new(1, 1, 1));
        runtime
            .block_on(primitives.gemm(&a, &b, &mut c, 1.0, 0.0, &token))
            .unwrap();
    });
    instrumented.report();
    let report = profiler.end_session().unwrap();
    println!(
        "\nprofiled launches recorded: {}",
        report.metrics.kernels.total_kernels
    );
}

fn main() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    println!("KernelForge GEMM benchmarks");
    bench_gemm_backends(&runtime);
    bench_batched_gemm(&runtime);
    bench_profiling_overhead(&runtime);
}
