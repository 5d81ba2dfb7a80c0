use crate::error::CallError;
use crate::transport::{MediaConnection, SdpKind};
use parley_core::sdp::prefer_video_codec;
use parley_core::{
    DataChannelMessage, IceCandidate, MediaToggle, SessionId, SignalKind, SignalingMessage,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveRemoteAnswer,
    Connected,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDisposition {
    Applied,
    /// Held until the remote description is in place.
    Buffered,
    /// The connection refused it; the session stays up.
    Rejected,
}

/// What applying a remote offer or answer produced.
#[derive(Debug, Default)]
pub struct DescriptionOutcome {
    /// The answer to send back when the remote description was an offer.
    pub reply: Option<SignalingMessage>,
    /// Set when the payload carried a nick different from the known one.
    pub nick_changed: Option<String>,
    /// Buffered candidates applied right after the description.
    pub flushed_candidates: usize,
}

/// One remote participant: its media connection plus signaling sub-state.
pub struct PeerSession {
    session_id: SessionId,
    local_id: SessionId,
    connection: Box<dyn MediaConnection>,
    state: PeerState,
    initiator: bool,
    started: bool,
    nick: Option<String>,
    audio_enabled: bool,
    video_enabled: bool,
    pending_candidates: Vec<IceCandidate>,
    has_remote_description: bool,
    remote_candidates_complete: bool,
}

impl PeerSession {
    pub(crate) fn new(
        session_id: SessionId,
        local_id: SessionId,
        connection: Box<dyn MediaConnection>,
        initiator: bool,
    ) -> Self {
        Self {
            session_id,
            local_id,
            connection,
            state: PeerState::New,
            initiator,
            started: false,
            nick: None,
            audio_enabled: true,
            video_enabled: true,
            pending_candidates: Vec::new(),
            has_remote_description: false,
            remote_candidates_complete: false,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    pub fn nick(&self) -> Option<&str> {
        self.nick.as_deref()
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn pending_candidates(&self) -> &[IceCandidate] {
        &self.pending_candidates
    }

    pub fn remote_candidates_complete(&self) -> bool {
        self.remote_candidates_complete
    }

    /// Kicks off negotiation once. Only the initiating side produces an offer.
    pub async fn start(&mut self, nick: Option<&str>) -> Result<Option<SignalingMessage>, CallError> {
        if self.started || self.state == PeerState::Closed {
            return Ok(None);
        }
        self.started = true;

        if !self.initiator || self.state != PeerState::New {
            return Ok(None);
        }

        let sdp = self
            .connection
            .create_offer()
            .await
            .map_err(|e| CallError::protocol(&self.session_id, e))?;
        self.state = PeerState::HaveLocalOffer;
        debug!("Created offer for {}", self.session_id);

        Ok(Some(SignalingMessage::description(
            SignalKind::Offer,
            &self.local_id,
            &self.session_id,
            sdp,
            nick.map(str::to_owned),
        )))
    }

    /// Applies a remote offer or answer after moving `preferred_codec` to the
    /// front of the video formats.
    pub async fn handle_description(
        &mut self,
        kind: SdpKind,
        sdp: &str,
        remote_nick: Option<&str>,
        preferred_codec: &str,
        local_nick: Option<&str>,
    ) -> Result<DescriptionOutcome, CallError> {
        if self.state == PeerState::Closed {
            return Err(CallError::protocol(&self.session_id, "session already closed"));
        }
        self.started = true;

        let mut outcome = DescriptionOutcome::default();
        if let Some(nick) = remote_nick {
            if self.nick.as_deref() != Some(nick) {
                self.nick = Some(nick.to_owned());
                outcome.nick_changed = Some(nick.to_owned());
            }
        }

        let rewritten = prefer_video_codec(sdp, preferred_codec);
        self.connection
            .set_remote_description(kind, rewritten)
            .await
            .map_err(|e| CallError::protocol(&self.session_id, e))?;

        self.has_remote_description = true;
        self.state = match kind {
            SdpKind::Offer => PeerState::HaveRemoteOffer,
            SdpKind::Answer => PeerState::HaveRemoteAnswer,
        };
        outcome.flushed_candidates = self.flush_candidates().await;

        if kind == SdpKind::Offer {
            let answer = self
                .connection
                .create_answer()
                .await
                .map_err(|e| CallError::protocol(&self.session_id, e))?;
            outcome.reply = Some(SignalingMessage::description(
                SignalKind::Answer,
                &self.local_id,
                &self.session_id,
                answer,
                local_nick.map(str::to_owned),
            ));
        }

        Ok(outcome)
    }

    pub async fn handle_candidate(&mut self, candidate: IceCandidate) -> CandidateDisposition {
        if !self.has_remote_description {
            self.pending_candidates.push(candidate);
            return CandidateDisposition::Buffered;
        }
        self.apply_candidate(candidate).await
    }

    /// Returns the number of buffered candidates applied now. Without a remote
    /// description the buffer is kept and drained when the description lands.
    pub async fn handle_end_of_candidates(&mut self) -> usize {
        self.remote_candidates_complete = true;
        if !self.has_remote_description {
            debug!(
                "End of candidates from {} before its description, holding {}",
                self.session_id,
                self.pending_candidates.len()
            );
            return 0;
        }
        self.flush_candidates().await
    }

    async fn flush_candidates(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_candidates);
        let mut applied = 0;
        for candidate in pending {
            if self.apply_candidate(candidate).await == CandidateDisposition::Applied {
                applied += 1;
            }
        }
        applied
    }

    async fn apply_candidate(&self, candidate: IceCandidate) -> CandidateDisposition {
        match self.connection.add_ice_candidate(candidate).await {
            Ok(()) => CandidateDisposition::Applied,
            Err(e) => {
                warn!("Candidate from {} rejected: {:#}", self.session_id, e);
                CandidateDisposition::Rejected
            }
        }
    }

    pub fn local_candidate_message(&self, candidate: IceCandidate) -> SignalingMessage {
        SignalingMessage::candidate(&self.local_id, &self.session_id, candidate)
    }

    pub fn end_of_candidates_message(&self) -> SignalingMessage {
        SignalingMessage::end_of_candidates(&self.local_id, &self.session_id)
    }

    pub async fn send_media_toggle(&self, toggle: MediaToggle) -> Result<(), CallError> {
        let text = DataChannelMessage::new(toggle)
            .to_text()
            .map_err(|e| CallError::protocol(&self.session_id, e))?;
        self.connection
            .send_text(text)
            .await
            .map_err(|e| CallError::protocol(&self.session_id, e))
    }

    /// Applies a data-channel text frame. Returns the toggle when it changed
    /// the remote audio or video flag.
    pub fn apply_remote_toggle(&mut self, text: &str) -> Option<MediaToggle> {
        let toggle = match DataChannelMessage::from_text(text) {
            Ok(msg) => msg.toggle,
            Err(e) => {
                debug!("Ignoring data channel frame from {}: {}", self.session_id, e);
                return None;
            }
        };

        let flag = if toggle.is_video() {
            &mut self.video_enabled
        } else {
            &mut self.audio_enabled
        };
        if *flag == toggle.enabled() {
            return None;
        }
        *flag = toggle.enabled();
        Some(toggle)
    }

    pub fn mark_connected(&mut self) {
        if matches!(self.state, PeerState::Connected | PeerState::Closed) {
            return;
        }
        info!("Peer {} connected", self.session_id);
        self.state = PeerState::Connected;
    }

    /// Closes the media connection once; later calls are no-ops.
    pub async fn close(&mut self) {
        if self.state == PeerState::Closed {
            return;
        }
        self.state = PeerState::Closed;
        self.pending_candidates.clear();

        if let Err(e) = self.connection.close().await {
            warn!("Closing connection to {} failed: {:#}", self.session_id, e);
        }
    }
}
