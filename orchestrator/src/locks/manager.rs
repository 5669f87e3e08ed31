//! Resource Lock Manager (§4.2): named mutual exclusion with TTL and owner-scoped release.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bus::{event_types, Event, EventBus};

use super::error::LockError;
use super::lock::Lock;

/// Bounded exponential backoff for `acquire`'s poll loop: 50ms, 100ms, 200ms, ... capped at
/// 2s, mirroring the shape of the LLM retry backoff (§6 `llm_retry_backoff`) without reusing
/// its concrete values -- lock contention is expected to resolve far faster than an LLM call.
fn backoff_step(attempt: u32) -> Duration {
    let millis = 50u64.saturating_mul(1u64 << attempt.min(5));
    Duration::from_millis(millis.min(2000))
}

/// The resource lock table (§4.2). Held resources are never reentrant: a second `acquire`
/// by the same `agent_id` before release fails exactly as if another agent held it.
pub struct LockManager {
    locks: DashMap<String, Lock>,
    event_bus: Option<Arc<EventBus>>,
}

impl LockManager {
    pub fn new(event_bus: Option<Arc<EventBus>>) -> Arc<Self> {
        Arc::new(Self {
            locks: DashMap::new(),
            event_bus,
        })
    }

    fn live_lock(&self, resource_id: &str) -> Option<Lock> {
        let now = Utc::now();
        match self.locks.get(resource_id) {
            Some(entry) if !entry.is_expired(now) => Some(entry.clone()),
            _ => None,
        }
    }

    /// Attempts a single acquisition. Returns `Busy` immediately if the resource is
    /// currently held by a live lock.
    fn try_acquire_once(
        self: &Arc<Self>,
        resource_id: &str,
        agent_id: &str,
        ttl: Duration,
    ) -> Result<Lock, LockError> {
        let now = Utc::now();
        // DashMap entry API keeps the read-check-write atomic under the shard lock.
        match self.locks.entry(resource_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    let lock = Lock {
                        resource_id: resource_id.to_string(),
                        owner: agent_id.to_string(),
                        token: Uuid::new_v4().to_string(),
                        acquired_at: now,
                        expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
                    };
                    occupied.insert(lock.clone());
                    Ok(lock)
                } else {
                    Err(LockError::Busy(resource_id.to_string()))
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let lock = Lock {
                    resource_id: resource_id.to_string(),
                    owner: agent_id.to_string(),
                    token: Uuid::new_v4().to_string(),
                    acquired_at: now,
                    expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
                };
                vacant.insert(lock.clone());
                Ok(lock)
            }
        }
    }

    /// `acquire(resource_id, agent_id, ttl, wait_timeout=0, reason?)` (§4.2). If busy and
    /// `wait_timeout > 0`, polls with bounded exponential backoff until `wait_timeout`
    /// elapses. On success, emits `resource.locked` and returns a scoped handle whose
    /// release removes the lock only if the stored token still matches.
    pub async fn acquire(
        self: &Arc<Self>,
        resource_id: impl Into<String>,
        agent_id: impl Into<String>,
        ttl: Duration,
        wait_timeout: Duration,
        reason: Option<String>,
    ) -> Result<LockHandle, LockError> {
        let resource_id = resource_id.into();
        let agent_id = agent_id.into();
        let deadline = tokio::time::Instant::now() + wait_timeout;
        let mut attempt = 0u32;

        loop {
            match self.try_acquire_once(&resource_id, &agent_id, ttl) {
                Ok(lock) => {
                    info!(resource = %resource_id, owner = %agent_id, "lock acquired");
                    self.emit(
                        event_types::RESOURCE_LOCKED,
                        json!({
                            "resource_id": resource_id,
                            "owner": agent_id,
                            "reason": reason,
                        }),
                    )
                    .await;
                    return Ok(LockHandle {
                        manager: Arc::clone(self),
                        resource_id: lock.resource_id,
                        token: lock.token,
                        released: AtomicBool::new(false),
                    });
                }
                Err(LockError::Busy(_)) if wait_timeout.is_zero() => {
                    return Err(LockError::Busy(resource_id));
                }
                Err(LockError::Busy(_)) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(LockError::WaitTimeout(wait_timeout));
                    }
                    tokio::time::sleep(backoff_step(attempt)).await;
                    attempt += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Never blocks.
    pub fn is_locked(&self, resource_id: &str) -> bool {
        self.live_lock(resource_id).is_some()
    }

    /// Never blocks.
    pub fn get_lock_info(&self, resource_id: &str) -> Option<Lock> {
        self.live_lock(resource_id)
    }

    /// Owner-scoped release: a no-op (logged) if `token` doesn't match the stored token.
    pub async fn release(&self, resource_id: &str, token: &str) -> Result<(), LockError> {
        let removed = match self.locks.get(resource_id) {
            Some(entry) if entry.token == token => true,
            _ => false,
        };
        if removed {
            self.locks.remove(resource_id);
            self.emit(
                event_types::RESOURCE_UNLOCKED,
                json!({"resource_id": resource_id, "reason": "released"}),
            )
            .await;
            Ok(())
        } else {
            warn!(resource = %resource_id, "release with mismatched token, ignored");
            Err(LockError::NotHeld(resource_id.to_string()))
        }
    }

    /// Admin override (§4.2): removes the lock regardless of owner, emits
    /// `resource.unlocked` with `reason=admin`.
    pub async fn force_unlock(&self, resource_id: &str, admin_id: &str) {
        self.locks.remove(resource_id);
        warn!(resource = %resource_id, admin = %admin_id, "lock force-unlocked");
        self.emit(
            event_types::RESOURCE_UNLOCKED,
            json!({"resource_id": resource_id, "reason": "admin", "admin_id": admin_id}),
        )
        .await;
    }

    async fn emit(&self, event_type: &str, payload: serde_json::Value) {
        if let Some(bus) = &self.event_bus {
            bus.emit(Event::new(event_type, payload, "lock_manager"), true).await;
        }
    }
}

/// Scoped handle returned by `acquire`. Releases on drop if not already released
/// explicitly; the drop path spawns the async release so it still runs if the handle is
/// simply dropped rather than awaited via `release()`.
pub struct LockHandle {
    manager: Arc<LockManager>,
    resource_id: String,
    token: String,
    released: AtomicBool,
}

impl LockHandle {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub async fn release(self) {
        self.released.store(true, Ordering::SeqCst);
        let _ = self.manager.release(&self.resource_id, &self.token).await;
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let manager = Arc::clone(&self.manager);
        let resource_id = self.resource_id.clone();
        let token = self.token.clone();
        tokio::spawn(async move {
            let _ = manager.release(&resource_id, &token).await;
        });
    }
}
