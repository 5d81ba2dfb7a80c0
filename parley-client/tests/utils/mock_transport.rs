use async_trait::async_trait;
use parley_client::{SignalingTransport, TransportError};
use parley_core::{IceServerConfig, SessionId, Signal, SignalingMessage};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    FetchIceServers,
    JoinRoom,
    JoinCall,
    LeaveCall,
    LeaveRoom,
    Pull,
    Send(Vec<SignalingMessage>),
    Ping,
}

#[derive(Default)]
struct Script {
    ice_servers: VecDeque<Result<Vec<IceServerConfig>, TransportError>>,
    pulls: VecDeque<Result<Vec<Signal>, TransportError>>,
    sends: VecDeque<Result<Vec<Signal>, TransportError>>,
    failing_pings: bool,
    join_call_delay: Option<Duration>,
}

/// Scripted relay that records every request.
///
/// Unscripted requests succeed with empty results.
#[derive(Clone)]
pub struct MockSignalingTransport {
    session_id: SessionId,
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<TransportCall>>>,
}

impl MockSignalingTransport {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: SessionId::from(session_id),
            script: Arc::new(Mutex::new(Script::default())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_pull(&self, result: Result<Vec<Signal>, TransportError>) {
        self.script.lock().await.pulls.push_back(result);
    }

    pub async fn push_send(&self, result: Result<Vec<Signal>, TransportError>) {
        self.script.lock().await.sends.push_back(result);
    }

    pub async fn push_ice_servers(&self, result: Result<Vec<IceServerConfig>, TransportError>) {
        self.script.lock().await.ice_servers.push_back(result);
    }

    /// Every ping from now on fails with a network error.
    pub async fn fail_pings(&self) {
        self.script.lock().await.failing_pings = true;
    }

    /// `join_call` takes `delay` and is only recorded once it completes.
    pub async fn delay_join_call(&self, delay: Duration) {
        self.script.lock().await.join_call_delay = Some(delay);
    }

    pub async fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, call: &TransportCall) -> usize {
        self.calls.lock().await.iter().filter(|c| *c == call).count()
    }

    /// Every message pushed through `send_signaling`, flattened in order.
    pub async fn sent_messages(&self) -> Vec<SignalingMessage> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                TransportCall::Send(messages) => Some(messages.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    async fn record(&self, call: TransportCall) {
        tracing::debug!("[MockTransport] {:?}", call);
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl SignalingTransport for MockSignalingTransport {
    async fn fetch_ice_servers(&self) -> Result<Vec<IceServerConfig>, TransportError> {
        self.record(TransportCall::FetchIceServers).await;
        self.script
            .lock()
            .await
            .ice_servers
            .pop_front()
            .unwrap_or_else(|| Ok(vec![IceServerConfig::new("stun:stun.example.org:3478")]))
    }

    async fn join_room(&self, _token: &str) -> Result<SessionId, TransportError> {
        self.record(TransportCall::JoinRoom).await;
        Ok(self.session_id.clone())
    }

    async fn join_call(&self, _token: &str) -> Result<(), TransportError> {
        let delay = self.script.lock().await.join_call_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(TransportCall::JoinCall).await;
        Ok(())
    }

    async fn leave_call(&self, _token: &str) -> Result<(), TransportError> {
        self.record(TransportCall::LeaveCall).await;
        Ok(())
    }

    async fn leave_room(&self, _token: &str) -> Result<(), TransportError> {
        self.record(TransportCall::LeaveRoom).await;
        Ok(())
    }

    async fn pull_signaling(&self, _token: &str) -> Result<Vec<Signal>, TransportError> {
        self.record(TransportCall::Pull).await;
        self.script
            .lock()
            .await
            .pulls
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn send_signaling(
        &self,
        _token: &str,
        messages: Vec<SignalingMessage>,
    ) -> Result<Vec<Signal>, TransportError> {
        self.record(TransportCall::Send(messages)).await;
        self.script
            .lock()
            .await
            .sends
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn ping_call(&self, _token: &str) -> Result<(), TransportError> {
        self.record(TransportCall::Ping).await;
        if self.script.lock().await.failing_pings {
            return Err(TransportError::Network("connection reset".to_owned()));
        }
        Ok(())
    }
}
