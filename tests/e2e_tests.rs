//! End-to-end scenario: profiled GEMM through the public surface.

use anyhow::Result;
use kernelforge::accelerator::AcceleratorKind;
use kernelforge::primitives::{CancellationToken, PerformancePrimitives, PrimitivesFactory};
use kernelforge::profiler::{
    AcceleratorSnapshot, Dim3, ExportFormat, PerformanceProfiler,
};
use kernelforge::tensor::Tensor;
use kernelforge::MemoryInfo;
use std::time::Duration;

#[tokio::test]
async fn profiled_gemm_session() -> Result<()> {
    let profiler = PerformanceProfiler::new();
    profiler.set_accelerator_snapshot(AcceleratorSnapshot {
        kind: AcceleratorKind::Cpu,
        name: "host".to_string(),
        memory: Some(MemoryInfo::new(16 << 30, 4 << 30)),
    });

    let session_id = profiler.start_session_with_id("bench1", "bench1");
    assert_eq!(session_id, "bench1");

    // 64x64 GEMM (alpha = 1, beta = 0) wrapped in a kernel-profiling context
    let primitives = PrimitivesFactory::create::<f32>(AcceleratorKind::Cpu);
    let a = Tensor::<f32>::filled(&[64, 64], 0.5);
    let b = Tensor::<f32>::filled(&[64, 64], 2.0);
    let mut c = Tensor::zeros(&[64, 64]);

    {
        let mut ctx =
            profiler.start_kernel_profiling("gemm_64x64", Dim3::new(64, 64, 1), Dim3::new(1, 1, 1));
        primitives
            .gemm(&a, &b, &mut c, 1.0, 0.0, &CancellationToken::new())
            .await?;
        ctx.record_execution(Duration::from_millis(2), None);
    }

    // every element is sum over 64 of 0.5 * 2.0 = 64
    assert!(c.as_slice().iter().all(|&x| (x - 64.0).abs() < 1e-4));

    let report = profiler.end_session()?;
    assert_eq!(report.session_id, "bench1");
    assert_eq!(report.kernel_executions.len(), 1);
    assert_eq!(report.metrics.kernels.total_kernels, 1);
    assert_eq!(
        report.metrics.kernels.average_execution_time,
        Duration::from_millis(2)
    );
    assert_eq!(report.metrics.kernels.fastest_execution, Duration::from_millis(2));
    assert_eq!(report.metrics.kernels.slowest_execution, Duration::from_millis(2));

    let record = &report.kernel_executions[0];
    assert_eq!(record.kernel_name, "gemm_64x64");
    assert_eq!(record.grid_size, Dim3::new(64, 64, 1));
    assert_eq!(record.total_threads(), 64 * 64);

    // accelerator snapshot rides along on the report
    let accelerator = report.accelerator.as_ref().expect("snapshot attached");
    assert_eq!(accelerator.kind, AcceleratorKind::Cpu);

    // export both canonical formats
    let dir = std::env::temp_dir().join("kernelforge_e2e_tests");
    tokio::fs::create_dir_all(&dir).await?;
    let token = CancellationToken::new();
    profiler
        .export(dir.join("bench1.json"), ExportFormat::Json, &token)
        .await?;
    profiler
        .export(dir.join("bench1.csv"), ExportFormat::Csv, &token)
        .await?;

    let json = tokio::fs::read_to_string(dir.join("bench1.json")).await?;
    assert!(json.contains("\"sessionId\": \"bench1\""));
    let csv = tokio::fs::read_to_string(dir.join("bench1.csv")).await?;
    assert!(csv.lines().count() == 2);

    tokio::fs::remove_file(dir.join("bench1.json")).await.ok();
    tokio::fs::remove_file(dir.join("bench1.csv")).await.ok();
    Ok(())
}

#[tokio::test]
async fn capability_driven_placement() -> Result<()> {
    // a scheduler consults capabilities before placing a workload
    let cuda = PrimitivesFactory::create::<f32>(AcceleratorKind::Cuda);
    let fallback = PrimitivesFactory::create::<f32>(AcceleratorKind::Ane);

    assert!(cuda.capabilities().supports_accelerated_gemm);
    assert!(!fallback.capabilities().supports_accelerated_gemm);

    // both produce identical results for the same inputs
    let a = Tensor::from_vec((0..6).map(|i| i as f32).collect(), &[2, 3])?;
    let b = Tensor::from_vec((0..6).map(|i| (5 - i) as f32).collect(), &[3, 2])?;
    let token = CancellationToken::new();

    let mut c_cuda = Tensor::zeros(&[2, 2]);
    cuda.gemm(&a, &b, &mut c_cuda, 1.0, 0.0, &token).await?;
    let mut c_ref = Tensor::zeros(&[2, 2]);
    fallback.gemm(&a, &b, &mut c_ref, 1.0, 0.0, &token).await?;

    assert_eq!(c_cuda.as_slice(), c_ref.as_slice());
    Ok(())
}
