use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::answers::SessionId;
use super::record::CalculationRecord;
use super::rule::RuleId;

/// Identity of a cached calculation.
///
/// `answers_digest` covers the answer content, so a client that resends an old or
/// missing `version` with new answers still misses. `taxonomy_generation` changes on
/// every taxonomy swap, so a record computed against a replaced taxonomy is unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub session_id: SessionId,
    pub rule_id: RuleId,
    pub rule_version: u32,
    pub answer_set_version: u64,
    pub answers_digest: [u8; 32],
    pub taxonomy_generation: u64,
}

/// Injected store for computed records.
///
/// Invalidation contract: callers invoke `invalidate_session` after writing answers,
/// `invalidate_rule` after revising a rule and `clear` after taxonomy edits.
pub trait ScoreCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CalculationRecord>;
    fn put(&self, key: CacheKey, record: CalculationRecord);
    fn invalidate_session(&self, session_id: &SessionId);
    fn invalidate_rule(&self, rule_id: &RuleId);
    fn clear(&self);
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CalculationRecord>,
    order: VecDeque<CacheKey>,
}

impl CacheState {
    fn retain(&mut self, keep: impl Fn(&CacheKey) -> bool) {
        self.entries.retain(|key, _| keep(key));
        self.order.retain(|key| keep(key));
    }
}

/// Bounded in-process cache; evicts the oldest insertion once `capacity` is reached.
#[derive(Debug)]
pub struct InMemoryScoreCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl InMemoryScoreCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScoreCache for InMemoryScoreCache {
    fn get(&self, key: &CacheKey) -> Option<CalculationRecord> {
        let state = self.state.lock().ok()?;
        state.entries.get(key).cloned()
    }

    fn put(&self, key: CacheKey, record: CalculationRecord) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.entries.insert(key.clone(), record).is_none() {
            state.order.push_back(key);
        }
        while state.entries.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
    }

    fn invalidate_session(&self, session_id: &SessionId) {
        if let Ok(mut state) = self.state.lock() {
            state.retain(|key| &key.session_id != session_id);
        }
    }

    fn invalidate_rule(&self, rule_id: &RuleId) {
        if let Ok(mut state) = self.state.lock() {
            state.retain(|key| &key.rule_id != rule_id);
        }
    }

    fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.clear();
            state.order.clear();
        }
    }
}

/// Cache that stores nothing, for callers that opt out of caching.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScoreCache;

impl ScoreCache for NoopScoreCache {
    fn get(&self, _key: &CacheKey) -> Option<CalculationRecord> {
        None
    }

    fn put(&self, _key: CacheKey, _record: CalculationRecord) {}

    fn invalidate_session(&self, _session_id: &SessionId) {}

    fn invalidate_rule(&self, _rule_id: &RuleId) {}

    fn clear(&self) {}
}
