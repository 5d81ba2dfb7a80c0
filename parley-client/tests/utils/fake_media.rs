use anyhow::{Result, bail};
use async_trait::async_trait;
use parley_client::{ConnectionParams, MediaConnection, MediaConnectionFactory, PeerEvent, SdpKind};
use parley_core::{IceCandidate, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    RemoteDescription(SdpKind, String),
    CreateOffer,
    CreateAnswer,
    Candidate(String),
    Text(String),
    Close,
}

type CallLog = Arc<Mutex<Vec<MediaCall>>>;

#[derive(Default)]
struct FactoryState {
    /// One log per connection ever created for the id, oldest first.
    logs: HashMap<SessionId, Vec<CallLog>>,
    params: HashMap<SessionId, ConnectionParams>,
    events: HashMap<SessionId, mpsc::Sender<PeerEvent>>,
}

/// Connection factory whose connections only record what they are asked.
///
/// SDP containing `reject` is refused by `set_remote_description`.
#[derive(Clone, Default)]
pub struct FakeMediaFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl FakeMediaFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn created(&self, session_id: &str) -> usize {
        let state = self.state.lock().await;
        state.logs.get(&SessionId::from(session_id)).map_or(0, Vec::len)
    }

    /// Calls made on the latest connection for the id.
    pub async fn calls_for(&self, session_id: &str) -> Vec<MediaCall> {
        let log = {
            let state = self.state.lock().await;
            state
                .logs
                .get(&SessionId::from(session_id))
                .and_then(|logs| logs.last().cloned())
        };
        match log {
            Some(log) => log.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Close calls across every connection ever created for the id.
    pub async fn close_count(&self, session_id: &str) -> usize {
        let logs = {
            let state = self.state.lock().await;
            state
                .logs
                .get(&SessionId::from(session_id))
                .cloned()
                .unwrap_or_default()
        };
        let mut closes = 0;
        for log in logs {
            closes += log.lock().await.iter().filter(|c| **c == MediaCall::Close).count();
        }
        closes
    }

    pub async fn params_for(&self, session_id: &str) -> Option<ConnectionParams> {
        self.state
            .lock()
            .await
            .params
            .get(&SessionId::from(session_id))
            .cloned()
    }

    /// Raises an event as if the connection to `session_id` produced it.
    pub async fn emit(&self, session_id: &str, event: PeerEvent) {
        let tx = self
            .state
            .lock()
            .await
            .events
            .get(&SessionId::from(session_id))
            .cloned();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl MediaConnectionFactory for FakeMediaFactory {
    async fn connect(
        &self,
        params: ConnectionParams,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Box<dyn MediaConnection>> {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut state = self.state.lock().await;
        state
            .logs
            .entry(params.session_id.clone())
            .or_default()
            .push(log.clone());
        state.events.insert(params.session_id.clone(), events);
        state.params.insert(params.session_id.clone(), params);

        Ok(Box::new(FakeConnection { log }))
    }
}

struct FakeConnection {
    log: CallLog,
}

impl FakeConnection {
    async fn record(&self, call: MediaCall) {
        self.log.lock().await.push(call);
    }
}

#[async_trait]
impl MediaConnection for FakeConnection {
    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        if sdp.contains("reject") {
            bail!("failed to parse session description");
        }
        self.record(MediaCall::RemoteDescription(kind, sdp)).await;
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        self.record(MediaCall::CreateOffer).await;
        Ok("v=0 fake-offer".to_owned())
    }

    async fn create_answer(&self) -> Result<String> {
        self.record(MediaCall::CreateAnswer).await;
        Ok("v=0 fake-answer".to_owned())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.record(MediaCall::Candidate(candidate.candidate)).await;
        Ok(())
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.record(MediaCall::Text(text)).await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(MediaCall::Close).await;
        Ok(())
    }
}
