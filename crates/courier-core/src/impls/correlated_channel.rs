//! CorrelatedChannel - request / ack を突き合わせる DispatchChannel
//!
//! # 実装詳細
//! - ワーカーごとに mpsc のセッションを持つ（WebSocket 接続に相当）
//! - 送信中の request は RequestId をキーに pending テーブルへ登録
//! - ack は pending から取り出した oneshot に流す
//!   （request を受け取ったセッション以外からの ack は無視）
//! - timeout・呼び出し側の drop・送信失敗のどれでも pending から必ず消える
//!   （リスナーが残り続けることはない）

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::errors::DispatchError;
use crate::domain::ids::{RequestId, WorkerAddress};
use crate::domain::wire::{DispatchRequest, DispatchResponse};
use crate::ports::{DispatchChannel, SendResult};

const DEFAULT_SESSION_CAPACITY: usize = 16;

struct Pending {
    worker: WorkerAddress,
    /// Session the request was queued on.
    session: u64,
    reply: oneshot::Sender<Vec<DispatchResponse>>,
}

struct Session {
    id: u64,
    requests: mpsc::Sender<DispatchRequest>,
}

#[derive(Default)]
struct Shared {
    sessions: Mutex<HashMap<WorkerAddress, Session>>,
    pending: Mutex<HashMap<RequestId, Pending>>,
    next_session: AtomicU64,
}

impl Shared {
    fn acknowledge(
        &self,
        worker: &WorkerAddress,
        session_id: u64,
        request_id: RequestId,
        responses: Vec<DispatchResponse>,
    ) -> bool {
        let pending = {
            let mut table = self.pending.lock();
            let owner = table
                .get(&request_id)
                .map(|p| (p.worker.clone(), p.session));
            match owner {
                None => {
                    debug!(request_id = %request_id, "ignoring late or unknown acknowledgment");
                    return false;
                }
                Some((expected, session)) if &expected != worker || session != session_id => {
                    debug!(
                        request_id = %request_id,
                        from = %worker,
                        expected = %expected,
                        "ignoring acknowledgment from another session"
                    );
                    return false;
                }
                Some(_) => table.remove(&request_id),
            }
        };
        // 受信側が既にいない = 直前に timeout した
        pending.is_some_and(|p| p.reply.send(responses).is_ok())
    }

    fn disconnect(&self, worker: &WorkerAddress, session_id: u64) {
        {
            let mut sessions = self.sessions.lock();
            // 新しいセッションに置き換わっていれば map はそのまま
            if sessions.get(worker).is_some_and(|s| s.id == session_id) {
                sessions.remove(worker);
            }
        }
        // reply sender を drop すると待機中の send が WorkerDisconnected で戻る
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|_, p| p.session != session_id);
        let failed = before - pending.len();
        if failed > 0 {
            warn!(worker = %worker, failed, "worker disconnected with requests in flight");
        } else {
            debug!(worker = %worker, "worker session closed");
        }
    }
}

/// Removes a pending entry on every exit path of `send`.
struct PendingGuard<'a> {
    shared: &'a Shared,
    request_id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.shared.pending.lock().remove(&self.request_id);
    }
}

/// In-process dispatch transport with a correlation table.
#[derive(Clone)]
pub struct CorrelatedChannel {
    shared: Arc<Shared>,
    session_capacity: usize,
}

impl CorrelatedChannel {
    pub fn new() -> Self {
        Self::with_session_capacity(DEFAULT_SESSION_CAPACITY)
    }

    pub fn with_session_capacity(session_capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            session_capacity: session_capacity.max(1),
        }
    }

    /// Attach a worker. A second `connect` for the same address replaces the
    /// first session.
    pub fn connect(&self, worker: WorkerAddress) -> WorkerSession {
        let (tx, rx) = mpsc::channel(self.session_capacity);
        let id = self.shared.next_session.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .shared
            .sessions
            .lock()
            .insert(worker.clone(), Session { id, requests: tx })
            .is_some();
        debug!(worker = %worker, replaced, "worker session opened");
        WorkerSession {
            worker,
            id,
            requests: rx,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_connected(&self, worker: &WorkerAddress) -> bool {
        self.shared.sessions.lock().contains_key(worker)
    }

    /// Number of requests still waiting for an acknowledgment.
    pub fn in_flight(&self) -> usize {
        self.shared.pending.lock().len()
    }
}

impl Default for CorrelatedChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DispatchChannel for CorrelatedChannel {
    async fn send(
        &self,
        worker: &WorkerAddress,
        request: DispatchRequest,
        timeout: Duration,
    ) -> Result<SendResult, DispatchError> {
        let (session, requests) = self
            .shared
            .sessions
            .lock()
            .get(worker)
            .map(|session| (session.id, session.requests.clone()))
            .ok_or_else(|| DispatchError::WorkerDisconnected(worker.clone()))?;

        // 送信前に登録する（即座に返る ack を取りこぼさない）
        let request_id = request.request_id;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.shared.pending.lock().insert(
            request_id,
            Pending {
                worker: worker.clone(),
                session,
                reply: reply_tx,
            },
        );
        let _entry = PendingGuard {
            shared: &self.shared,
            request_id,
        };

        let round_trip = async {
            requests
                .send(request)
                .await
                .map_err(|_| DispatchError::WorkerDisconnected(worker.clone()))?;
            reply_rx
                .await
                .map_err(|_| DispatchError::WorkerDisconnected(worker.clone()))
        };

        match tokio::time::timeout(timeout, round_trip).await {
            Ok(Ok(responses)) => Ok(SendResult::Acknowledged(responses)),
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => {
                debug!(request_id = %request_id, worker = %worker, ?timeout, "acknowledgment timed out");
                Ok(SendResult::TimedOut)
            }
        }
    }
}

/// Worker side of a connection: a stream of requests plus a way to ack them.
///
/// Dropping the session disconnects the worker and fails its in-flight requests.
pub struct WorkerSession {
    worker: WorkerAddress,
    id: u64,
    requests: mpsc::Receiver<DispatchRequest>,
    shared: Arc<Shared>,
}

impl WorkerSession {
    pub fn worker(&self) -> &WorkerAddress {
        &self.worker
    }

    pub async fn next_request(&mut self) -> Option<DispatchRequest> {
        self.requests.recv().await
    }

    /// Answer a request this session received.
    ///
    /// Returns `false` when nobody is waiting any more, or when the request
    /// was not delivered to this session.
    pub fn acknowledge(&self, request_id: RequestId, responses: Vec<DispatchResponse>) -> bool {
        self.shared
            .acknowledge(&self.worker, self.id, request_id, responses)
    }

    /// Cloneable ack handle for tasks spawned off the session loop.
    ///
    /// Acks through the handle carry this session's identity.
    pub fn ack_handle(&self) -> AckHandle {
        AckHandle {
            worker: self.worker.clone(),
            session: self.id,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for WorkerSession {
    fn drop(&mut self) {
        self.shared.disconnect(&self.worker, self.id);
    }
}

#[derive(Clone)]
pub struct AckHandle {
    worker: WorkerAddress,
    session: u64,
    shared: Arc<Shared>,
}

impl AckHandle {
    pub fn acknowledge(&self, request_id: RequestId, responses: Vec<DispatchResponse>) -> bool {
        self.shared
            .acknowledge(&self.worker, self.session, request_id, responses)
    }
}
