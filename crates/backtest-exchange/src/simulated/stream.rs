//! 시뮬레이션 거래소의 이벤트 팬아웃.

use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// 여러 구독자에게 이벤트를 전송하는 브로드캐스터.
///
/// 시장 이벤트와 계좌 이벤트 스트림에 공용으로 사용됩니다. 전송은
/// 비차단입니다: 버퍼가 가득 찬 구독자와 닫힌 구독자에게는 이벤트가
/// 유실됩니다. 느린 구독자가 체결 엔진의 정산 경로를 막을 수 없습니다.
pub struct EventBroadcaster<T: Clone + Send> {
    senders: Arc<RwLock<Vec<mpsc::Sender<T>>>>,
}

impl<T: Clone + Send> EventBroadcaster<T> {
    /// 새 브로드캐스터를 생성합니다.
    pub fn new() -> Self {
        Self {
            senders: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// 이벤트를 구독하고 수신기를 반환합니다.
    pub async fn subscribe(&self, buffer_size: usize) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(buffer_size);
        self.senders.write().await.push(tx);
        rx
    }

    /// 모든 구독자에게 이벤트를 전송합니다.
    pub async fn broadcast(&self, event: T) {
        let senders = self.senders.read().await;
        for sender in senders.iter() {
            // 버퍼가 가득 찼거나 구독자가 사라졌으면 유실
            let _ = sender.try_send(event.clone());
        }
    }

    /// 연결이 끊긴 구독자를 제거합니다.
    pub async fn cleanup(&self) {
        let mut senders = self.senders.write().await;
        senders.retain(|sender| !sender.is_closed());
    }
}

impl<T: Clone + Send> Default for EventBroadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> Clone for EventBroadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            senders: Arc::clone(&self.senders),
        }
    }
}
