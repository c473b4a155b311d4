//! InMemoryQueue - 開発用の Message キュー
//!
//! # 学習ポイント
//! - 購読ごとの tokio mpsc チャネル（bounded, 背圧あり）
//! - close 関数に `Arc` を捕まえさせて購読解除する
//! - Mutex をロックしたまま await しない
//!
//! # 配送保証
//! - at-most-once。購読者がいない間の publish は `QueueError::NoSubscriber` で失敗し、
//!   後から来た購読者に溜めて渡すことはしない
//! - 複数購読者がいればラウンドロビンで 1 件ずつ配る

use crate::domain::Message;
use crate::ports::{MessageQueue, QueueError, Subscription};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    cursor: usize,
    senders: Vec<(u64, mpsc::Sender<Message>)>,
}

/// InMemoryQueue は開発用の配送キュー
///
/// # 使用例
/// ```ignore
/// let queue = InMemoryQueue::new(64);
/// let mut sub = queue.subscribe().await?;
/// queue.publish(Message::new("regenerate-apprc", ["nemesis"])).await?;
/// let msg = sub.recv().await;
/// ```
pub struct InMemoryQueue {
    subscribers: Arc<Mutex<Subscribers>>,
    capacity: usize,
    available: AtomicBool,
}

impl InMemoryQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            capacity: capacity.max(1),
            available: AtomicBool::new(true),
        }
    }

    /// false にすると subscribe が接続エラーを返す（障害の再現用）
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// キュー側から全購読を切る（接続断の再現用）。
    ///
    /// 送信側を捨てるだけなので、購読者はバッファを読み切った後に `None` を受け取る。
    pub fn close_subscriptions(&self) {
        lock(&self.subscribers).senders.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subs = lock(&self.subscribers);
        subs.senders.retain(|(_, tx)| !tx.is_closed());
        subs.senders.len()
    }

    /// 次の配送先を選ぶ。閉じた購読はここで掃除する。
    fn next_sender(&self) -> Option<mpsc::Sender<Message>> {
        let mut subs = lock(&self.subscribers);
        subs.senders.retain(|(_, tx)| !tx.is_closed());
        if subs.senders.is_empty() {
            return None;
        }
        let index = subs.cursor % subs.senders.len();
        subs.cursor = subs.cursor.wrapping_add(1);
        Some(subs.senders[index].1.clone())
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(64)
    }
}

fn lock(subscribers: &Mutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
    subscribers.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn subscribe(&self) -> Result<Subscription, QueueError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(QueueError::Connection("queue is unavailable".into()));
        }
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = {
            let mut subs = lock(&self.subscribers);
            let id = subs.next_id;
            subs.next_id += 1;
            subs.senders.push((id, tx));
            id
        };

        let subscribers = Arc::clone(&self.subscribers);
        Ok(Subscription::new(rx, move || {
            lock(&subscribers).senders.retain(|(sid, _)| *sid != id);
        }))
    }

    async fn publish(&self, message: Message) -> Result<(), QueueError> {
        let mut message = message;
        loop {
            let Some(sender) = self.next_sender() else {
                return Err(QueueError::NoSubscriber);
            };
            // 選んだ直後に購読が閉じた場合は別の購読者に回す
            match sender.send(message).await {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(returned)) => message = returned,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn msg(app: &str) -> Message {
        Message::new("regenerate-apprc", [app])
    }

    #[tokio::test]
    async fn test_publish_subscribe_roundtrip() {
        let queue = InMemoryQueue::new(8);
        let mut sub = queue.subscribe().await.unwrap();
        queue.publish(msg("nemesis")).await.unwrap();
        assert_eq!(sub.recv().await, Some(msg("nemesis")));
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_fails() {
        let queue = InMemoryQueue::new(8);
        let err = queue.publish(msg("nemesis")).await.unwrap_err();
        assert!(matches!(err, QueueError::NoSubscriber));
    }

    #[tokio::test]
    async fn test_close_unsubscribes() {
        let queue = InMemoryQueue::new(8);
        let sub = queue.subscribe().await.unwrap();
        assert_eq!(queue.subscriber_count(), 1);
        sub.close();
        assert_eq!(queue.subscriber_count(), 0);
        assert!(matches!(
            queue.publish(msg("nemesis")).await,
            Err(QueueError::NoSubscriber)
        ));
    }

    #[tokio::test]
    async fn test_close_subscriptions_ends_receivers_after_buffer() {
        let queue = InMemoryQueue::new(8);
        let mut sub = queue.subscribe().await.unwrap();
        queue.publish(msg("nemesis")).await.unwrap();

        queue.close_subscriptions();

        assert_eq!(sub.recv().await, Some(msg("nemesis")));
        assert_eq!(sub.recv().await, None);
        assert_eq!(queue.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_drain_returns_buffered_and_refuses_new() {
        let queue = InMemoryQueue::new(8);
        let mut sub = queue.subscribe().await.unwrap();
        queue.publish(msg("one")).await.unwrap();
        queue.publish(msg("two")).await.unwrap();

        assert_eq!(sub.drain(), vec![msg("one"), msg("two")]);
        assert!(matches!(
            queue.publish(msg("three")).await,
            Err(QueueError::NoSubscriber)
        ));
    }

    #[tokio::test]
    async fn test_round_robin_between_subscribers() {
        let queue = InMemoryQueue::new(8);
        let mut a = queue.subscribe().await.unwrap();
        let mut b = queue.subscribe().await.unwrap();

        queue.publish(msg("one")).await.unwrap();
        queue.publish(msg("two")).await.unwrap();

        assert_eq!(a.recv().await, Some(msg("one")));
        assert_eq!(b.recv().await, Some(msg("two")));
    }

    #[tokio::test]
    async fn test_unavailable_queue_rejects_subscribe() {
        let queue = InMemoryQueue::new(8);
        queue.set_available(false);
        assert!(matches!(
            queue.subscribe().await,
            Err(QueueError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_wakes_waiting_subscriber() {
        let queue = Arc::new(InMemoryQueue::new(8));
        let mut sub = queue.subscribe().await.unwrap();

        let waiter = tokio::spawn(async move { sub.recv().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.publish(msg("nemesis")).await.unwrap();

        assert_eq!(waiter.await.unwrap(), Some(msg("nemesis")));
    }
}
