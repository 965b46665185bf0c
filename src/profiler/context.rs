//! Scoped profiling contexts.
//!
//! A context is a per-operation handle: the caller either records the
//! completion explicitly (supplying the measured duration and optional
//! derived metrics) or simply drops the context, in which case the
//! context's own stopwatch supplies the duration. Either way the record is
//! committed exactly once; a `completed` flag makes the drop path a no-op
//! after an explicit record, and double-drop cannot occur in safe Rust.
//!
//! When profiling is disabled the profiler hands out no-op contexts
//! (`shared == None`) so call sites need no conditional branching.

use crate::profiler::records::{
    CustomEventRecord, Dim3, KernelExecutionRecord, MemoryOperationRecord, MemoryOperationType,
};
use crate::profiler::ProfilerShared;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Handle for one in-flight kernel execution.
#[derive(Debug)]
pub struct KernelProfilingContext {
    shared: Option<Arc<ProfilerShared>>,
    operation_id: u64,
    kernel_name: String,
    grid_size: Dim3,
    group_size: Dim3,
    start_time: SystemTime,
    stopwatch: Instant,
    compilation_time: Duration,
    completed: bool,
}

impl KernelProfilingContext {
    pub(crate) fn live(
        shared: Arc<ProfilerShared>,
        operation_id: u64,
        kernel_name: String,
        grid_size: Dim3,
        group_size: Dim3,
    ) -> Self {
        KernelProfilingContext {
            shared: Some(shared),
            operation_id,
            kernel_name,
            grid_size,
            group_size,
            start_time: SystemTime::now(),
            stopwatch: Instant::now(),
            compilation_time: Duration::ZERO,
            completed: false,
        }
    }

    pub(crate) fn noop() -> Self {
        KernelProfilingContext {
            shared: None,
            operation_id: 0,
            kernel_name: String::new(),
            grid_size: Dim3::default(),
            group_size: Dim3::default(),
            start_time: SystemTime::now(),
            stopwatch: Instant::now(),
            compilation_time: Duration::ZERO,
            completed: false,
        }
    }

    /// Unique id of this operation (0 for no-op contexts).
    pub fn operation_id(&self) -> u64 {
        self.operation_id
    }

    /// Whether this context records anything at all.
    pub fn is_noop(&self) -> bool {
        self.shared.is_none()
    }

    /// Attribute compilation time to this launch (zero means cache hit).
    ///
    /// Must be called before the execution is recorded; later calls are
    /// ignored.
    pub fn record_compilation(&mut self, compilation_time: Duration) {
        if !self.completed {
            self.compilation_time = compilation_time;
        }
    }

    /// Record the execution with an externally measured duration and an
    /// optional caller-computed throughput figure.
    pub fn record_execution(&mut self, execution_time: Duration, throughput_gflops: Option<f64>) {
        self.commit(execution_time, throughput_gflops);
    }

    fn commit(&mut self, execution_time: Duration, throughput_gflops: Option<f64>) {
        if self.completed {
            return;
        }
        self.completed = true;
        if let Some(shared) = self.shared.take() {
            shared.commit_kernel(KernelExecutionRecord {
                operation_id: self.operation_id,
                kernel_name: std::mem::take(&mut self.kernel_name),
                grid_size: self.grid_size,
                group_size: self.group_size,
                start_time: self.start_time,
                execution_time,
                compilation_time: self.compilation_time,
                throughput_gflops,
            });
        }
    }
}

impl Drop for KernelProfilingContext {
    fn drop(&mut self) {
        // stopwatch supplies the duration when the caller never recorded one
        let elapsed = self.stopwatch.elapsed();
        self.commit(elapsed, None);
    }
}

/// Handle for one in-flight memory operation.
#[derive(Debug)]
pub struct MemoryProfilingContext {
    shared: Option<Arc<ProfilerShared>>,
    operation_id: u64,
    operation_type: MemoryOperationType,
    bytes: u64,
    source: String,
    destination: String,
    start_time: SystemTime,
    stopwatch: Instant,
    completed: bool,
}

impl MemoryProfilingContext {
    pub(crate) fn live(
        shared: Arc<ProfilerShared>,
        operation_id: u64,
        operation_type: MemoryOperationType,
        bytes: u64,
        source: String,
        destination: String,
    ) -> Self {
        MemoryProfilingContext {
            shared: Some(shared),
            operation_id,
            operation_type,
            bytes,
            source,
            destination,
            start_time: SystemTime::now(),
            stopwatch: Instant::now(),
            completed: false,
        }
    }

    pub(crate) fn noop() -> Self {
        MemoryProfilingContext {
            shared: None,
            operation_id: 0,
            operation_type: MemoryOperationType::Allocation,
            bytes: 0,
            source: String::new(),
            destination: String::new(),
            start_time: SystemTime::now(),
            stopwatch: Instant::now(),
            completed: false,
        }
    }

    pub fn operation_id(&self) -> u64 {
        self.operation_id
    }

    pub fn is_noop(&self) -> bool {
        self.shared.is_none()
    }

    /// Record the completion with an externally measured duration and an
    /// optional caller-computed bandwidth figure.
    pub fn record_completion(&mut self, duration: Duration, bandwidth_gbps: Option<f64>) {
        self.commit(duration, bandwidth_gbps);
    }

    fn commit(&mut self, duration: Duration, bandwidth_gbps: Option<f64>) {
        if self.completed {
            return;
        }
        self.completed = true;
        if let Some(shared) = self.shared.take() {
            shared.commit_memory(MemoryOperationRecord {
                operation_id: self.operation_id,
                operation_type: self.operation_type,
                bytes: self.bytes,
                source: std::mem::take(&mut self.source),
                destination: std::mem::take(&mut self.destination),
                start_time: self.start_time,
                duration,
                bandwidth_gbps,
            });
        }
    }
}

impl Drop for MemoryProfilingContext {
    fn drop(&mut self) {
        let elapsed = self.stopwatch.elapsed();
        self.commit(elapsed, None);
    }
}

/// Handle for one in-flight custom event.
///
/// On explicit completion the caller supplies the value; on drop the
/// elapsed time in milliseconds is recorded instead.
#[derive(Debug)]
pub struct CustomEventContext {
    shared: Option<Arc<ProfilerShared>>,
    operation_id: u64,
    name: String,
    category: String,
    stopwatch: Instant,
    completed: bool,
}

impl CustomEventContext {
    pub(crate) fn live(
        shared: Arc<ProfilerShared>,
        operation_id: u64,
        name: String,
        category: String,
    ) -> Self {
        CustomEventContext {
            shared: Some(shared),
            operation_id,
            name,
            category,
            stopwatch: Instant::now(),
            completed: false,
        }
    }

    pub(crate) fn noop() -> Self {
        CustomEventContext {
            shared: None,
            operation_id: 0,
            name: String::new(),
            category: String::new(),
            stopwatch: Instant::now(),
            completed: false,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.shared.is_none()
    }

    /// Record the event with an explicit value.
    pub fn record_value(&mut self, value: f64) {
        self.commit(value);
    }

    fn commit(&mut self, value: f64) {
        if self.completed {
            return;
        }
        self.completed = true;
        if let Some(shared) = self.shared.take() {
            shared.commit_custom(
                self.operation_id,
                CustomEventRecord {
                    name: std::mem::take(&mut self.name),
                    category: std::mem::take(&mut self.category),
                    value,
                    timestamp: SystemTime::now(),
                },
            );
        }
    }
}

impl Drop for CustomEventContext {
    fn drop(&mut self) {
        let elapsed_ms = self.stopwatch.elapsed().as_secs_f64() * 1000.0;
        self.commit(elapsed_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_contexts_are_inert() {
        let mut kernel = KernelProfilingContext::noop();
        assert!(kernel.is_noop());
        assert_eq!(kernel.operation_id(), 0);
        kernel.record_execution(Duration::from_millis(5), Some(1.0));
        // dropping after an explicit record must also be safe
        drop(kernel);

        let mut memory = MemoryProfilingContext::noop();
        assert!(memory.is_noop());
        memory.record_completion(Duration::from_millis(1), None);

        let mut event = CustomEventContext::noop();
        assert!(event.is_noop());
        event.record_value(42.0);
    }
}
