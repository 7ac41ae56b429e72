//! 进度统计
//!
//! `PipelineState` 由编排层在单线程中逐条更新；`ProgressSnapshot` 是它在某一时刻的只读视图。

use std::fmt;
use std::time::{Duration, Instant};

use crate::utils::format_elapsed;

/// 流水线状态（仅在本次运行内有效）
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub total: usize,
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    started: Instant,
}

impl PipelineState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            success: 0,
            failed: 0,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 开始处理下一项
    pub fn begin_item(&mut self) {
        self.processed += 1;
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// 当前进度快照
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::compute(self.total, self.processed, self.success, self.elapsed())
    }
}

/// 预估剩余时间：`(total - processed) * (elapsed / processed)`；尚未处理任何项时为 0
pub fn estimate_remaining(total: usize, processed: usize, elapsed: Duration) -> Duration {
    if processed == 0 {
        return Duration::ZERO;
    }
    let remaining = total.saturating_sub(processed) as f64;
    Duration::from_secs_f64(remaining * elapsed.as_secs_f64() / processed as f64)
}

/// 进度快照
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub success: usize,
    pub elapsed: Duration,
    pub remaining: Duration,
}

impl ProgressSnapshot {
    pub fn compute(total: usize, processed: usize, success: usize, elapsed: Duration) -> Self {
        Self {
            total,
            processed,
            success,
            elapsed,
            remaining: estimate_remaining(total, processed, elapsed),
        }
    }

    /// 成功率（百分比）
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.success as f64 / self.processed as f64 * 100.0
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "【处理进度】{}/{} | 成功率: {}/{} ({:.1}%) | 耗时: {} | 预估剩余: {}",
            self.processed,
            self.total,
            self.success,
            self.processed,
            self.success_rate(),
            format_elapsed(self.elapsed.as_secs_f64()),
            format_elapsed(self.remaining.as_secs_f64())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_remaining() {
        assert_eq!(
            estimate_remaining(10, 2, Duration::from_secs(10)),
            Duration::from_secs(40)
        );
        assert_eq!(estimate_remaining(10, 0, Duration::from_secs(10)), Duration::ZERO);
        assert_eq!(estimate_remaining(3, 3, Duration::from_secs(9)), Duration::ZERO);
    }

    #[test]
    fn test_snapshot_display() {
        let snapshot = ProgressSnapshot::compute(10, 2, 1, Duration::from_secs(10));
        assert_eq!(
            snapshot.to_string(),
            "【处理进度】2/10 | 成功率: 1/2 (50.0%) | 耗时: 10.0秒 | 预估剩余: 40.0秒"
        );
    }

    #[test]
    fn test_zero_processed_rate() {
        let snapshot = ProgressSnapshot::compute(5, 0, 0, Duration::ZERO);
        assert_eq!(snapshot.success_rate(), 0.0);
        assert_eq!(snapshot.remaining, Duration::ZERO);
    }

    #[test]
    fn test_state_counters() {
        let mut state = PipelineState::new(2);
        state.begin_item();
        state.record_success();
        state.begin_item();
        state.record_failure();

        assert_eq!((state.processed, state.success, state.failed), (2, 1, 1));
        assert_eq!(state.snapshot().remaining, Duration::ZERO);
    }
}
