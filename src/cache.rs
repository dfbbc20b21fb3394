//! 带容量上限与过期时间的 LRU 缓存
//!
//! - 容量限制：插入后若超出容量，先清理已过期条目，仍超出则淘汰最久未使用的条目
//! - 过期清理按插入时间顺序进行，均摊 O(1)，不扫描整张表
//! - TTL 过期：条目在插入 `ttl` 之后视为不存在，访问时惰性清理，没有后台扫描
//! - 访问顺序：`get` 会刷新条目的最近使用位置，`has` 不会
//!
//! 缓存本身不加锁，由持有者决定如何共享 (处理器内部用 `Mutex` 包裹，
//! 且从不跨 `.await` 持有锁)。
//!
//! 时间取自 `tokio::time::Instant`，在暂停时钟的测试中可以精确推进。

use linked_hash_map::LinkedHashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// 缓存条目，包含值和插入时间
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= ttl
    }
}

/// 有界 TTL 缓存
///
/// 链表头部为最久未使用的条目，尾部为最近使用的条目。
#[derive(Debug)]
pub struct TtlCache<K: Eq + Hash, V> {
    entries: LinkedHashMap<K, CacheEntry<V>>,
    /// 按插入时间排列的 (键, 插入时间)。条目被覆盖、删除或淘汰后记录失效，清理时跳过
    insertions: VecDeque<(K, Instant)>,
    capacity: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V> TtlCache<K, V> {
    /// 创建缓存，容量至少为 1
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: LinkedHashMap::new(),
            insertions: VecDeque::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// 键存在且未过期时返回 true，不刷新最近使用位置
    pub fn has(&mut self, key: &K) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(self.ttl, Instant::now()),
            None => return false,
        };

        if expired {
            self.entries.remove(key);
            return false;
        }
        true
    }

    /// 获取未过期的值，并将其移至最近使用位置
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = self.entries.get(key)?.is_expired(self.ttl, Instant::now());

        if expired {
            self.entries.remove(key);
            return None;
        }

        self.entries.get_refresh(key).map(|entry| &entry.value)
    }

    /// 同 `get`，返回值的克隆，便于在释放锁之后使用
    pub fn get_cloned(&mut self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get(key).cloned()
    }

    /// 插入或覆盖，计时从零开始
    pub fn set(&mut self, key: K, value: V) {
        let entry = CacheEntry::new(value);
        let inserted_at = entry.inserted_at;

        // 先删除旧值，保证重新插入到尾部
        self.entries.remove(&key);
        self.entries.insert(key.clone(), entry);
        self.insertions.push_back((key, inserted_at));

        if self.entries.len() > self.capacity {
            // 容量只计算存活条目
            self.purge_expired();

            // 新条目位于尾部且 capacity >= 1，不会被淘汰
            while self.entries.len() > self.capacity {
                self.entries.pop_front();
            }
        }

        // 失效记录过多时整理一次
        if self.insertions.len() > self.capacity * 2 {
            let entries = &self.entries;
            self.insertions.retain(|(key, at)| {
                entries
                    .get(key)
                    .is_some_and(|entry| entry.inserted_at == *at)
            });
        }
    }

    /// 删除指定键，不存在时什么也不做
    pub fn del(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// 清理所有已过期条目，返回清理数量
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let mut purged = 0;

        while let Some((_, inserted_at)) = self.insertions.front() {
            if now.duration_since(*inserted_at) < self.ttl {
                break;
            }
            let Some((key, inserted_at)) = self.insertions.pop_front() else {
                break;
            };

            // 只有记录仍对应当前条目时才删除
            let current = self
                .entries
                .get(&key)
                .is_some_and(|entry| entry.inserted_at == inserted_at);
            if current {
                self.entries.remove(&key);
                purged += 1;
            }
        }
        purged
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertions.clear();
    }

    /// 当前条目数量 (可能包含尚未清理的过期条目)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn basic_set_and_get() {
        let mut cache = TtlCache::new(10, Duration::from_secs(60));
        cache.set("key1", "value1");
        assert_eq!(cache.get(&"key1"), Some(&"value1"));
        assert!(cache.has(&"key1"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn missing_key_is_absent() {
        let mut cache = TtlCache::<String, i32>::new(10, Duration::from_secs(60));
        assert_eq!(cache.get(&"missing".to_string()), None);
        assert!(!cache.has(&"missing".to_string()));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut cache = TtlCache::new(0, Duration::from_secs(60));
        assert_eq!(cache.capacity(), 1);
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(!cache.has(&"a"));
        assert_eq!(cache.get(&"b"), Some(&2));
    }

    #[test]
    fn overwrite_replaces_value() {
        let mut cache = TtlCache::new(10, Duration::from_secs(60));
        cache.set("key", "value1");
        cache.set("key", "value2");
        assert_eq!(cache.get(&"key"), Some(&"value2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn del_removes_and_ignores_missing() {
        let mut cache = TtlCache::new(10, Duration::from_secs(60));
        cache.set("key", "value");
        assert_eq!(cache.del(&"key"), Some("value"));
        assert!(!cache.has(&"key"));
        assert_eq!(cache.del(&"key"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_evicts_oldest_without_reads() {
        let mut cache = TtlCache::new(2, ms(1000));
        cache.set("a", 1);
        advance(ms(10)).await;
        cache.set("b", 2);
        advance(ms(10)).await;
        cache.set("c", 3);

        assert!(!cache.has(&"a"));
        assert!(cache.has(&"b"));
        assert!(cache.has(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn get_refreshes_recency() {
        let mut cache = TtlCache::new(2, ms(1000));
        cache.set("a", 1);
        advance(ms(10)).await;
        cache.set("b", 2);
        advance(ms(10)).await;

        assert_eq!(cache.get(&"a"), Some(&1));
        cache.set("c", 3);

        assert!(cache.has(&"a"));
        assert!(!cache.has(&"b"));
        assert!(cache.has(&"c"));
    }

    #[tokio::test(start_paused = true)]
    async fn has_does_not_refresh_recency() {
        let mut cache = TtlCache::new(2, ms(1000));
        cache.set("a", 1);
        advance(ms(10)).await;
        cache.set("b", 2);
        advance(ms(10)).await;

        assert!(cache.has(&"a"));
        cache.set("c", 3);

        assert!(!cache.has(&"a"));
        assert!(cache.has(&"b"));
        assert!(cache.has(&"c"));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let mut cache = TtlCache::new(10, ms(100));
        cache.set("key", "value");

        advance(ms(99)).await;
        assert!(cache.has(&"key"));

        advance(ms(1)).await;
        assert!(!cache.has(&"key"));
        assert_eq!(cache.get(&"key"), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_resets_age() {
        let mut cache = TtlCache::new(10, ms(100));
        cache.set("key", 1);
        advance(ms(80)).await;
        cache.set("key", 2);
        advance(ms(80)).await;

        assert_eq!(cache.get(&"key"), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_does_not_count_toward_capacity() {
        let mut cache = TtlCache::new(2, ms(100));
        cache.set("a", 1);

        advance(ms(150)).await;
        assert!(!cache.has(&"a"));

        cache.set("b", 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.has(&"b"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_purged_before_lru_eviction() {
        let mut cache = TtlCache::new(2, ms(100));
        cache.set("a", 1);
        advance(ms(60)).await;
        cache.set("x", 2);
        advance(ms(10)).await;

        // "a" 移到尾部，但仍按插入时间过期
        assert_eq!(cache.get(&"a"), Some(&1));

        advance(ms(80)).await;
        cache.set("b", 3);

        // 过期的 "a" 被清理，存活的 "x" 不会被淘汰
        assert!(cache.has(&"x"));
        assert!(cache.has(&"b"));
        assert!(!cache.has(&"a"));
    }

    #[tokio::test(start_paused = true)]
    async fn del_then_has_is_false_within_ttl() {
        let mut cache = TtlCache::new(10, ms(1000));
        cache.set("k", ());
        advance(ms(10)).await;
        cache.del(&"k");
        assert!(!cache.has(&"k"));
    }

    #[tokio::test(start_paused = true)]
    async fn dedup_key_suppresses_within_ttl() {
        let mut cache: TtlCache<String, ()> = TtlCache::new(500, Duration::from_secs(300));
        let key = "group1: 红包口令".to_string();

        let mut emitted = 0;
        for _ in 0..3 {
            if !cache.has(&key) {
                cache.set(key.clone(), ());
                emitted += 1;
            }
            advance(Duration::from_secs(60)).await;
        }
        assert_eq!(emitted, 1);

        // 超过 TTL 之后再次放行
        advance(Duration::from_secs(300)).await;
        assert!(!cache.has(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn refreshed_but_expired_entry_is_purged_before_eviction() {
        let mut cache = TtlCache::new(2, ms(100));
        cache.set("a", 1);
        advance(ms(50)).await;
        cache.set("b", 2);
        advance(ms(10)).await;
        // a 移到最近使用位置，但插入时间仍是最早的
        assert_eq!(cache.get(&"a"), Some(&1));

        advance(ms(60)).await;
        cache.set("c", 3);

        assert!(!cache.has(&"a"));
        assert!(cache.has(&"b"));
        assert!(cache.has(&"c"));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_stops_at_first_live_entry() {
        let mut cache = TtlCache::new(10, ms(100));
        cache.set("a", 1);
        cache.set("b", 2);
        advance(ms(60)).await;
        cache.set("c", 3);
        advance(ms(50)).await;

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.has(&"c"));
    }

    #[test]
    fn overwrites_do_not_grow_bookkeeping() {
        let mut cache = TtlCache::new(4, Duration::from_secs(60));
        for i in 0..1000 {
            cache.set(i % 3, i);
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.insertions.len() <= cache.capacity() * 2);
        assert_eq!(cache.get(&0), Some(&999));
    }

    #[test]
    fn purge_and_clear() {
        let mut cache = TtlCache::new(10, Duration::ZERO);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());

        let mut cache = TtlCache::new(10, Duration::from_secs(60));
        cache.set("a", 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }
}
