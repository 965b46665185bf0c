//! Session-based performance profiler.
//!
//! The profiler is a long-lived service object: `Idle -> (start_session)
//! -> Active -> (end_session) -> Idle`, at most one active session at a
//! time. Starting a new session while one is active implicitly seals the
//! previous one. Kernel/memory/custom-event operations are tracked through
//! scoped contexts ([`context`]); ending a session waits a bounded time for
//! in-flight operations to drain, then seals whatever committed into an
//! immutable [`ProfileSessionReport`].
//!
//! Session start/end and record commits are synchronous and fast; only
//! export touches the filesystem.

pub mod context;
pub mod export;
pub mod metrics;
pub mod recommendations;
pub mod records;
pub mod report;

pub use context::{CustomEventContext, KernelProfilingContext, MemoryProfilingContext};
pub use export::ExportFormat;
pub use metrics::{
    calculate_accelerator_metrics, calculate_custom_event_metrics, calculate_kernel_metrics,
    calculate_memory_metrics, AcceleratorMetrics, CustomEventMetrics, KernelMetrics,
    MemoryMetrics, ProfileMetrics,
};
pub use recommendations::{generate_recommendations, Recommendation, RecommendationKind, Severity};
pub use records::{
    CustomEventRecord, Dim3, KernelExecutionRecord, MemoryOperationRecord, MemoryOperationType,
};
pub use report::{AcceleratorSnapshot, ProfileSessionReport, SessionSummary, SystemSnapshot};

use crate::error::{ForgeResult, KernelForgeError};
use crate::primitives::CancellationToken;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};
use uuid::Uuid;

/// Profiler tuning knobs.
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// How long `end_session` waits for active operations to complete.
    pub drain_timeout: Duration,
    /// Poll interval inside the drain wait.
    pub drain_poll_interval: Duration,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        ProfilerConfig {
            drain_timeout: Duration::from_secs(5),
            drain_poll_interval: Duration::from_millis(10),
        }
    }
}

impl ProfilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn with_drain_poll_interval(mut self, drain_poll_interval: Duration) -> Self {
        self.drain_poll_interval = drain_poll_interval;
        self
    }
}

/// Lock a mutex, recovering the data from a poisoned lock.
///
/// Commit paths run inside `Drop` and must never panic or fail; a record
/// list left by a panicked thread is still structurally valid.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// State shared between the profiler and its outstanding contexts.
#[derive(Debug)]
pub(crate) struct ProfilerShared {
    enabled: AtomicBool,
    /// Monotonic across the profiler's lifetime, never reset: an id can
    /// never collide across sessions, so a stale completion cannot alias a
    /// registration made by a newer session.
    next_operation_id: AtomicU64,
    active_kernels: Mutex<HashMap<u64, String>>,
    active_memory: Mutex<HashMap<u64, String>>,
    active_custom: Mutex<HashMap<u64, String>>,
    completed_kernels: Mutex<Vec<KernelExecutionRecord>>,
    completed_memory: Mutex<Vec<MemoryOperationRecord>>,
    completed_custom: Mutex<Vec<CustomEventRecord>>,
}

impl ProfilerShared {
    fn new() -> Self {
        ProfilerShared {
            enabled: AtomicBool::new(false),
            next_operation_id: AtomicU64::new(1),
            active_kernels: Mutex::new(HashMap::new()),
            active_memory: Mutex::new(HashMap::new()),
            active_custom: Mutex::new(HashMap::new()),
            completed_kernels: Mutex::new(Vec::new()),
            completed_memory: Mutex::new(Vec::new()),
            completed_custom: Mutex::new(Vec::new()),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn next_id(&self) -> u64 {
        self.next_operation_id.fetch_add(1, Ordering::Relaxed)
    }

    fn active_count(&self) -> usize {
        lock_unpoisoned(&self.active_kernels).len()
            + lock_unpoisoned(&self.active_memory).len()
            + lock_unpoisoned(&self.active_custom).len()
    }

    /// Drop every registration and buffered record (session start).
    fn clear(&self) {
        lock_unpoisoned(&self.active_kernels).clear();
        lock_unpoisoned(&self.active_memory).clear();
        lock_unpoisoned(&self.active_custom).clear();
        lock_unpoisoned(&self.completed_kernels).clear();
        lock_unpoisoned(&self.completed_memory).clear();
        lock_unpoisoned(&self.completed_custom).clear();
    }

    // The commit paths hold the active-map guard across the completed-list
    // append. Sealing clears the active maps before taking the completed
    // lists (same lock order), so a registered operation either lands fully
    // in its own session or, once the map is cleared, is dropped whole.

    pub(crate) fn commit_kernel(&self, record: KernelExecutionRecord) {
        let mut active = lock_unpoisoned(&self.active_kernels);
        if active.remove(&record.operation_id).is_none() {
            tracing::trace!(
                operation_id = record.operation_id,
                "kernel record committed after its session sealed; dropping"
            );
            return;
        }
        lock_unpoisoned(&self.completed_kernels).push(record);
    }

    pub(crate) fn commit_memory(&self, record: MemoryOperationRecord) {
        let mut active = lock_unpoisoned(&self.active_memory);
        if active.remove(&record.operation_id).is_none() {
            tracing::trace!(
                operation_id = record.operation_id,
                "memory record committed after its session sealed; dropping"
            );
            return;
        }
        lock_unpoisoned(&self.completed_memory).push(record);
    }

    pub(crate) fn commit_custom(&self, operation_id: u64, record: CustomEventRecord) {
        let mut active = lock_unpoisoned(&self.active_custom);
        if active.remove(&operation_id).is_none() {
            tracing::trace!(
                operation_id,
                "custom event committed after its session sealed; dropping"
            );
            return;
        }
        lock_unpoisoned(&self.completed_custom).push(record);
    }
}

/// Per-session bookkeeping held under the lifecycle lock.
#[derive(Debug)]
struct ActiveSession {
    id: String,
    name: String,
    start_time: SystemTime,
    started: Instant,
    system: SystemSnapshot,
}

/// Session lifecycle manager and record sink.
///
/// Designed as an owned service object passed by reference to call sites,
/// not a process-wide singleton. All methods take `&self`; internal state
/// is behind a coarse lifecycle lock plus per-collection locks.
#[derive(Debug)]
pub struct PerformanceProfiler {
    config: ProfilerConfig,
    shared: Arc<ProfilerShared>,
    session: Mutex<Option<ActiveSession>>,
    completed_sessions: Mutex<Vec<ProfileSessionReport>>,
    accelerator: Mutex<Option<AcceleratorSnapshot>>,
}

impl Default for PerformanceProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceProfiler {
    pub fn new() -> Self {
        Self::with_config(ProfilerConfig::default())
    }

    pub fn with_config(config: ProfilerConfig) -> Self {
        PerformanceProfiler {
            config,
            shared: Arc::new(ProfilerShared::new()),
            session: Mutex::new(None),
            completed_sessions: Mutex::new(Vec::new()),
            accelerator: Mutex::new(None),
        }
    }

    /// Attach accelerator identity to subsequent session reports.
    pub fn set_accelerator_snapshot(&self, snapshot: AcceleratorSnapshot) {
        *lock_unpoisoned(&self.accelerator) = Some(snapshot);
    }

    /// Whether a session is currently collecting records.
    pub fn is_enabled(&self) -> bool {
        self.shared.is_enabled()
    }

    /// Id of the active session, if any.
    pub fn session_id(&self) -> Option<String> {
        lock_unpoisoned(&self.session).as_ref().map(|s| s.id.clone())
    }

    /// Operations started but not yet committed.
    pub fn active_operation_count(&self) -> usize {
        self.shared.active_count()
    }

    /// Begin a session with a generated id, implicitly sealing any session
    /// already active. Returns the session id.
    pub fn start_session(&self, name: &str) -> String {
        self.start_session_inner(name, Uuid::new_v4().to_string())
    }

    /// Begin a session under a caller-supplied id.
    pub fn start_session_with_id(&self, name: &str, id: impl Into<String>) -> String {
        self.start_session_inner(name, id.into())
    }

    fn start_session_inner(&self, name: &str, id: String) -> String {
        let mut session = lock_unpoisoned(&self.session);

        if let Some(previous) = session.take() {
            tracing::debug!(
                previous = %previous.id,
                "implicitly ending active session before starting a new one"
            );
            let report = self.seal(previous);
            lock_unpoisoned(&self.completed_sessions).push(report);
        }

        self.shared.clear();
        self.shared.enabled.store(true, Ordering::Release);
        *session = Some(ActiveSession {
            id: id.clone(),
            name: name.to_string(),
            start_time: SystemTime::now(),
            started: Instant::now(),
            system: SystemSnapshot::capture(),
        });

        tracing::debug!(session = %id, name, "profiling session started");
        id
    }

    /// Seal the active session into an immutable report.
    ///
    /// Waits up to the configured drain timeout for in-flight operations,
    /// then proceeds with whatever committed; records arriving after the
    /// seal are silently dropped. Erroring when no session is active.
    pub fn end_session(&self) -> ForgeResult<ProfileSessionReport> {
        let mut session = lock_unpoisoned(&self.session);
        let state = session.take().ok_or(KernelForgeError::NoActiveSession)?;
        let report = self.seal(state);
        lock_unpoisoned(&self.completed_sessions).push(report.clone());
        Ok(report)
    }

    fn seal(&self, state: ActiveSession) -> ProfileSessionReport {
        // snapshot the session clock first; drain time is not billed to it
        let duration = state.started.elapsed();
        self.shared.enabled.store(false, Ordering::Release);

        let drain_started = Instant::now();
        loop {
            let remaining = self.shared.active_count();
            if remaining == 0 {
                break;
            }
            if drain_started.elapsed() >= self.config.drain_timeout {
                tracing::warn!(
                    session = %state.id,
                    remaining,
                    "drain timeout reached; sealing session with available records"
                );
                break;
            }
            std::thread::sleep(self.config.drain_poll_interval);
        }

        // stragglers lose their registration and are dropped on commit
        lock_unpoisoned(&self.shared.active_kernels).clear();
        lock_unpoisoned(&self.shared.active_memory).clear();
        lock_unpoisoned(&self.shared.active_custom).clear();

        let kernel_executions =
            std::mem::take(&mut *lock_unpoisoned(&self.shared.completed_kernels));
        let memory_operations =
            std::mem::take(&mut *lock_unpoisoned(&self.shared.completed_memory));
        let custom_events = std::mem::take(&mut *lock_unpoisoned(&self.shared.completed_custom));

        let profile_metrics = ProfileMetrics {
            kernels: calculate_kernel_metrics(&kernel_executions),
            memory: calculate_memory_metrics(&memory_operations),
            accelerator: calculate_accelerator_metrics(&kernel_executions, duration),
            custom_events: calculate_custom_event_metrics(&custom_events),
        };
        let recommendations = generate_recommendations(&profile_metrics);

        tracing::debug!(
            session = %state.id,
            kernels = kernel_executions.len(),
            memory_ops = memory_operations.len(),
            events = custom_events.len(),
            recommendations = recommendations.len(),
            "profiling session sealed"
        );

        ProfileSessionReport {
            session_id: state.id,
            session_name: state.name,
            start_time: state.start_time,
            end_time: state.start_time + duration,
            duration,
            kernel_executions,
            memory_operations,
            custom_events,
            metrics: profile_metrics,
            system: state.system,
            accelerator: lock_unpoisoned(&self.accelerator).clone(),
            recommendations,
        }
    }

    /// Begin measuring one kernel execution.
    ///
    /// Returns a no-op context when no session is active.
    pub fn start_kernel_profiling(
        &self,
        kernel_name: &str,
        grid_size: Dim3,
        group_size: Dim3,
    ) -> KernelProfilingContext {
        if !self.shared.is_enabled() {
            return KernelProfilingContext::noop();
        }
        let operation_id = self.shared.next_id();
        lock_unpoisoned(&self.shared.active_kernels)
            .insert(operation_id, kernel_name.to_string());
        KernelProfilingContext::live(
            Arc::clone(&self.shared),
            operation_id,
            kernel_name.to_string(),
            grid_size,
            group_size,
        )
    }

    /// Begin measuring one memory operation.
    ///
    /// Returns a no-op context when no session is active.
    pub fn start_memory_profiling(
        &self,
        operation_type: MemoryOperationType,
        bytes: u64,
        source: &str,
        destination: &str,
    ) -> MemoryProfilingContext {
        if !self.shared.is_enabled() {
            return MemoryProfilingContext::noop();
        }
        let operation_id = self.shared.next_id();
        lock_unpoisoned(&self.shared.active_memory)
            .insert(operation_id, operation_type.to_string());
        MemoryProfilingContext::live(
            Arc::clone(&self.shared),
            operation_id,
            operation_type,
            bytes,
            source.to_string(),
            destination.to_string(),
        )
    }

    /// Begin measuring one custom event (value = elapsed milliseconds
    /// unless recorded explicitly).
    pub fn start_custom_event(&self, name: &str, category: &str) -> CustomEventContext {
        if !self.shared.is_enabled() {
            return CustomEventContext::noop();
        }
        let operation_id = self.shared.next_id();
        lock_unpoisoned(&self.shared.active_custom).insert(operation_id, name.to_string());
        CustomEventContext::live(
            Arc::clone(&self.shared),
            operation_id,
            name.to_string(),
            category.to_string(),
        )
    }

    /// Record a custom event immediately with an explicit value.
    pub fn record_custom_event(&self, name: &str, category: &str, value: f64) {
        if !self.shared.is_enabled() {
            return;
        }
        lock_unpoisoned(&self.shared.completed_custom).push(CustomEventRecord {
            name: name.to_string(),
            category: category.to_string(),
            value,
            timestamp: SystemTime::now(),
        });
    }

    /// Reports of every session sealed so far.
    pub fn completed_sessions(&self) -> Vec<ProfileSessionReport> {
        lock_unpoisoned(&self.completed_sessions).clone()
    }

    /// Serialize all completed session reports to `path`.
    ///
    /// The cancellation token applies to the I/O loop only.
    pub async fn export(
        &self,
        path: impl AsRef<Path>,
        format: ExportFormat,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        let reports = self.completed_sessions();
        export::write_reports(&reports, path.as_ref(), format, token).await
    }
}
