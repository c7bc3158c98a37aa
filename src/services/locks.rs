use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per order id.
///
/// Every mutation of an order holds its guard from validation through
/// commit; distinct orders never contend.
#[derive(Debug, Default, Clone)]
pub struct OrderLocks {
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, order_id: i32) -> OrderLockGuard {
        // clone the Arc so the shard lock is released before awaiting
        let lock = self
            .locks
            .entry(order_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        OrderLockGuard {
            order_id,
            locks: self.locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held while an order is being mutated; releasing it evicts the order's
/// entry when nobody else is waiting.
#[derive(Debug)]
pub struct OrderLockGuard {
    order_id: i32,
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrderLockGuard {
    fn drop(&mut self) {
        // the owned guard keeps its own Arc to the mutex
        drop(self.guard.take());
        self.locks
            .remove_if(&self.order_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_order_is_serialized() {
        let locks = OrderLocks::new();
        let guard = locks.acquire(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn distinct_orders_do_not_contend() {
        let locks = OrderLocks::new();
        let _a = locks.acquire(1).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_locks_leave_no_entry() {
        let locks = OrderLocks::new();
        let guard = locks.acquire(9).await;
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());

        for order_id in 0..50 {
            drop(locks.acquire(order_id).await);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn entry_survives_while_someone_waits() {
        let locks = OrderLocks::new();
        let guard = locks.acquire(5).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(5).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(locks.len(), 1);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(locks.is_empty());
    }
}
