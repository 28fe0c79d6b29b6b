//! 全市场快照缓存
//!
//! 只按时间失效：条目写入后 ttl 内直接复用，过期后下一次读取重新拉取。
//! 快照内容没有版本号，不做内容比对。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct CacheEntry<T> {
    data: Arc<T>,
    expires_at: Instant,
}

/// 单值定时缓存
#[derive(Debug)]
pub struct TimedCache<T> {
    ttl: Duration,
    entry: Mutex<Option<CacheEntry<T>>>,
}

impl<T> TimedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// 读取缓存，过期或为空时调用 `load` 重新获取
    ///
    /// 持锁期间加载，并发调用方只会触发一次上游请求。
    pub async fn get_or_try_load<E, F, Fut>(&self, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut entry = self.entry.lock().await;
        let now = Instant::now();

        if let Some(cached) = entry.as_ref() {
            if cached.expires_at > now {
                log::debug!("快照缓存命中");
                return Ok(cached.data.clone());
            }
            log::debug!("快照缓存已过期");
        }

        let data = Arc::new(load().await?);
        *entry = Some(CacheEntry {
            data: data.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cache = TimedCache::new(Duration::from_secs(60));
        let loads = AtomicU32::new(0);
        let counter = &loads;

        for _ in 0..3 {
            let value = cache
                .get_or_try_load(move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reload_after_expiry() {
        let cache = TimedCache::new(Duration::from_millis(20));
        let loads = AtomicU32::new(0);
        let counter = &loads;
        let load = move || async move { Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst)) };

        assert_eq!(*cache.get_or_try_load(load).await.unwrap(), 0);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(*cache.get_or_try_load(load).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache: TimedCache<u32> = TimedCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_try_load(|| async { Err::<u32, _>("boom".to_string()) })
            .await;
        assert!(err.is_err());
        let ok = cache.get_or_try_load(|| async { Ok::<_, String>(1) }).await;
        assert_eq!(*ok.unwrap(), 1);
    }
}
