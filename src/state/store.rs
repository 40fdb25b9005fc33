use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::runtime::ExecutionRecord;

/// 默认最多保留的执行记录数
pub const DEFAULT_STORE_CAPACITY: usize = 10_000;

/// 执行记录存储 trait
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn get(&self, execution_id: &str) -> Result<Option<ExecutionRecord>>;
    /// 插入或更新记录，更新不改变插入顺序
    async fn put(&self, record: ExecutionRecord) -> Result<()>;
    /// 按插入顺序返回全部记录的快照
    async fn list(&self) -> Result<Vec<ExecutionRecord>>;
    async fn remove(&self, execution_id: &str) -> Result<()>;
}

#[derive(Default)]
struct MemoryInner {
    records: HashMap<String, ExecutionRecord>,
    order: VecDeque<String>,
}

/// 内存存储实现
///
/// 记录数超过容量时按插入顺序淘汰已结束的记录，运行中的记录和刚写入的记录不会被淘汰，
/// 此时允许暂时超出容量。
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    capacity: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_STORE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(MemoryInner::default()),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            inner: RwLock::new(MemoryInner::default()),
            capacity: None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 淘汰多余的已结束记录，`keep` 为本次写入的记录，不参与淘汰
    fn evict(inner: &mut MemoryInner, capacity: usize, keep: &str) {
        while inner.records.len() > capacity {
            let position = inner.order.iter().position(|id| {
                id != keep
                    && inner
                        .records
                        .get(id)
                        .map(|record| record.status.is_finished())
                        .unwrap_or(true)
            });
            let Some(position) = position else {
                break;
            };
            if let Some(id) = inner.order.remove(position) {
                inner.records.remove(&id);
                debug!(execution_id = %id, "evicted finished execution record");
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn get(&self, execution_id: &str) -> Result<Option<ExecutionRecord>> {
        Ok(self.inner.read().records.get(execution_id).cloned())
    }

    async fn put(&self, record: ExecutionRecord) -> Result<()> {
        let mut inner = self.inner.write();
        let id = record.execution_id.clone();
        if inner.records.insert(id.clone(), record).is_none() {
            inner.order.push_back(id.clone());
        }
        if let Some(capacity) = self.capacity {
            Self::evict(&mut inner, capacity, &id);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ExecutionRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    async fn remove(&self, execution_id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.records.remove(execution_id).is_some() {
            inner.order.retain(|id| id != execution_id);
        }
        Ok(())
    }
}

#[cfg(feature = "redis-store")]
pub mod redis {
    use super::*;
    use crate::error::StepflowError;
    use redis::AsyncCommands;

    const DEFAULT_PREFIX: &str = "stepflow:execution";

    /// Redis 存储：记录以 JSON 保存，插入顺序保存在列表中
    pub struct RedisStore {
        client: redis::Client,
        prefix: String,
    }

    impl RedisStore {
        pub fn new(client: redis::Client) -> Self {
            Self {
                client,
                prefix: DEFAULT_PREFIX.to_string(),
            }
        }

        pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
            self.prefix = prefix.into();
            self
        }

        fn record_key(&self, execution_id: &str) -> String {
            format!("{}:{}", self.prefix, execution_id)
        }

        fn index_key(&self) -> String {
            format!("{}:index", self.prefix)
        }

        async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
            self.client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| StepflowError::Store(e.to_string()))
        }
    }

    #[async_trait]
    impl ExecutionStore for RedisStore {
        async fn get(&self, execution_id: &str) -> Result<Option<ExecutionRecord>> {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn
                .get(self.record_key(execution_id))
                .await
                .map_err(|e| StepflowError::Store(e.to_string()))?;
            value
                .map(|raw| serde_json::from_str(&raw).map_err(StepflowError::from))
                .transpose()
        }

        async fn put(&self, record: ExecutionRecord) -> Result<()> {
            let mut conn = self.connection().await?;
            let payload = serde_json::to_string(&record)?;
            let created: bool = conn
                .set_nx(self.record_key(&record.execution_id), &payload)
                .await
                .map_err(|e| StepflowError::Store(e.to_string()))?;
            if created {
                let _: () = conn
                    .rpush(self.index_key(), &record.execution_id)
                    .await
                    .map_err(|e| StepflowError::Store(e.to_string()))?;
            } else {
                let _: () = conn
                    .set(self.record_key(&record.execution_id), payload)
                    .await
                    .map_err(|e| StepflowError::Store(e.to_string()))?;
            }
            Ok(())
        }

        async fn list(&self) -> Result<Vec<ExecutionRecord>> {
            let mut conn = self.connection().await?;
            let ids: Vec<String> = conn
                .lrange(self.index_key(), 0, -1)
                .await
                .map_err(|e| StepflowError::Store(e.to_string()))?;
            let mut records = Vec::with_capacity(ids.len());
            for id in ids {
                let value: Option<String> = conn
                    .get(self.record_key(&id))
                    .await
                    .map_err(|e| StepflowError::Store(e.to_string()))?;
                if let Some(raw) = value {
                    records.push(serde_json::from_str(&raw)?);
                }
            }
            Ok(records)
        }

        async fn remove(&self, execution_id: &str) -> Result<()> {
            let mut conn = self.connection().await?;
            let _: () = conn
                .del(self.record_key(execution_id))
                .await
                .map_err(|e| StepflowError::Store(e.to_string()))?;
            let _: () = conn
                .lrem(self.index_key(), 0, execution_id)
                .await
                .map_err(|e| StepflowError::Store(e.to_string()))?;
            Ok(())
        }
    }
}
