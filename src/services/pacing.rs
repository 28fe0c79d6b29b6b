//! 请求节流
//!
//! 上游数据源没有公开的限流规则，过快请求会被封禁并表现为空结果。
//! `PacingGate` 保证同一数据源两次请求之间至少间隔固定时长，
//! 多个并发任务共享同一个 gate 时同样成立。

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// 固定间隔请求闸门
#[derive(Debug)]
pub struct PacingGate {
    /// 名称，用于日志
    name: String,
    /// 最小请求间隔
    interval: Duration,
    /// 下一次允许请求的时间
    next_slot: Mutex<Option<Instant>>,
}

impl PacingGate {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// 等待直到允许发起下一次请求
    pub async fn wait(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();

        if let Some(slot) = *next_slot {
            if slot > now {
                let wait = slot - now;
                log::debug!("[{}] 节流等待 {} 毫秒", self.name, wait.as_millis());
                tokio::time::sleep_until(slot).await;
            }
        }

        *next_slot = Some(Instant::now() + self.interval);
    }
}

/// 可共享的请求闸门
pub type SharedGate = Arc<PacingGate>;

/// 创建共享闸门
pub fn shared_gate(name: impl Into<String>, interval: Duration) -> SharedGate {
    Arc::new(PacingGate::new(name, interval))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_wait_is_immediate() {
        let gate = PacingGate::new("test", Duration::from_millis(200));
        let start = Instant::now();
        gate.wait().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_consecutive_waits_are_spaced() {
        let gate = PacingGate::new("test", Duration::from_millis(50));
        let start = Instant::now();
        gate.wait().await;
        gate.wait().await;
        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_shared_gate_spaces_parallel_tasks() {
        let gate = shared_gate("shared", Duration::from_millis(40));
        let start = Instant::now();
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.wait().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
