//! Session report export.
//!
//! JSON is the canonical machine-readable format: indented, camelCase
//! keys, `None` fields omitted, and built from the reduced
//! [`SessionSummary`] projection rather than the full record graph. CSV is
//! a flat per-kernel-execution table across all sessions. Chrome-tracing
//! and binary formats are currently aliases of the JSON path.

use crate::error::{ForgeResult, KernelForgeError};
use crate::primitives::CancellationToken;
use crate::profiler::report::ProfileSessionReport;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

/// Serialization format for [`write_reports`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    /// Currently JSON-equivalent.
    ChromeTrace,
    /// Currently JSON-equivalent.
    Binary,
}

/// Header of the CSV export.
pub const CSV_HEADER: &str =
    "SessionId,KernelName,StartTime,ExecutionTime,CompilationTime,GridSize,GroupSize,TotalThreads";

/// Serialize completed session reports to `path`.
///
/// The cancellation token is checked between sessions while encoding and
/// before the file write; partial files are not cleaned up on failure.
pub async fn write_reports(
    reports: &[ProfileSessionReport],
    path: &Path,
    format: ExportFormat,
    token: &CancellationToken,
) -> ForgeResult<()> {
    let payload = match format {
        ExportFormat::Csv => encode_csv(reports, token)?,
        ExportFormat::Json | ExportFormat::ChromeTrace | ExportFormat::Binary => {
            if format != ExportFormat::Json {
                tracing::debug!(?format, "format currently exports the JSON projection");
            }
            encode_json(reports, token)?
        }
    };

    token.checkpoint("export")?;
    tokio::fs::write(path, payload).await?;
    tracing::debug!(path = %path.display(), sessions = reports.len(), "exported session reports");
    Ok(())
}

fn encode_json(
    reports: &[ProfileSessionReport],
    token: &CancellationToken,
) -> ForgeResult<String> {
    let mut summaries = Vec::with_capacity(reports.len());
    for report in reports {
        token.checkpoint("export")?;
        summaries.push(report.summary());
    }
    serde_json::to_string_pretty(&summaries)
        .map_err(|e| KernelForgeError::ExportFailed(e.to_string()))
}

fn encode_csv(
    reports: &[ProfileSessionReport],
    token: &CancellationToken,
) -> ForgeResult<String> {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for report in reports {
        token.checkpoint("export")?;
        for record in &report.kernel_executions {
            let start_ms = record
                .start_time
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_millis();
            out.push_str(&format!(
                "{},{},{},{:.3},{:.3},{},{},{}\n",
                report.session_id,
                record.kernel_name,
                start_ms,
                record.execution_time.as_secs_f64() * 1000.0,
                record.compilation_time.as_secs_f64() * 1000.0,
                record.grid_size,
                record.group_size,
                record.total_threads(),
            ));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::metrics::ProfileMetrics;
    use crate::profiler::records::{Dim3, KernelExecutionRecord};
    use crate::profiler::report::SystemSnapshot;
    use std::time::SystemTime;

    fn report_with_kernel() -> ProfileSessionReport {
        let record = KernelExecutionRecord {
            operation_id: 1,
            kernel_name: "gemm".to_string(),
            grid_size: Dim3::new(64, 64, 1),
            group_size: Dim3::new(1, 1, 1),
            start_time: SystemTime::UNIX_EPOCH + Duration::from_secs(10),
            execution_time: Duration::from_millis(2),
            compilation_time: Duration::ZERO,
            throughput_gflops: None,
        };
        ProfileSessionReport {
            session_id: "bench1".to_string(),
            session_name: "bench".to_string(),
            start_time: SystemTime::UNIX_EPOCH,
            end_time: SystemTime::UNIX_EPOCH + Duration::from_secs(60),
            duration: Duration::from_secs(60),
            kernel_executions: vec![record],
            memory_operations: Vec::new(),
            custom_events: Vec::new(),
            metrics: ProfileMetrics::default(),
            system: SystemSnapshot::capture(),
            accelerator: None,
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_csv_header_and_row() {
        let reports = [report_with_kernel()];
        let csv = encode_csv(&reports, &CancellationToken::new()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().unwrap();
        assert_eq!(
            row,
            "bench1,gemm,10000,2.000,0.000,64x64x1,1x1x1,4096"
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_json_is_valid_and_camel_case() {
        let reports = [report_with_kernel()];
        let json = encode_json(&reports, &CancellationToken::new()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let sessions = value.as_array().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["sessionId"], "bench1");
        assert_eq!(sessions[0]["totalKernels"], 1);
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_cancelled_export_encoding() {
        let token = CancellationToken::new();
        token.cancel();
        let reports = [report_with_kernel()];
        assert!(encode_json(&reports, &token).unwrap_err().is_cancelled());
        assert!(encode_csv(&reports, &token).unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_write_reports_roundtrip() {
        let dir = std::env::temp_dir().join("kernelforge_export_test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("sessions.json");

        let reports = [report_with_kernel()];
        write_reports(&reports, &path, ExportFormat::Json, &CancellationToken::new())
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value[0]["sessionName"], "bench");

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_chrome_trace_aliases_json() {
        let dir = std::env::temp_dir().join("kernelforge_export_test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("sessions.trace");

        let reports = [report_with_kernel()];
        write_reports(
            &reports,
            &path,
            ExportFormat::ChromeTrace,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&contents).is_ok());

        tokio::fs::remove_file(&path).await.ok();
    }
}
