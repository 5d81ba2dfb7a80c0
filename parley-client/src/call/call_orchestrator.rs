use crate::call::call_command::{CallCommand, CallHandle};
use crate::call::call_config::CallConfig;
use crate::call::call_event::CallEvent;
use crate::call::call_session::{CallSession, RelayPresence};
use crate::call::call_state::CallState;
use crate::call::pumps::{PumpOutput, PumpSettings, Pumps};
use crate::error::{CallError, TransportError};
use crate::peer::{PeerDirectory, PeerSessionRegistry};
use crate::presence::RoomPresenceReconciler;
use crate::signaling::SignalingTransport;
use crate::transport::{
    ConnectionState, LocalMedia, MediaConnectionFactory, MediaHost, PeerEvent, PermissionStatus,
    SdpKind,
};
use parley_core::{
    IceServerConfig, MediaToggle, RosterSnapshot, SessionId, Signal, SignalKind, SignalingMessage,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HangupReason {
    User,
    /// Connectivity dropped; only local resources are released.
    NetworkLoss,
    Teardown,
}

/// Progress of the join pipeline running off the call loop.
#[derive(Debug)]
enum JoinOutput {
    Progress {
        attempt: u64,
        state: CallState,
    },
    Joined {
        attempt: u64,
        session_id: SessionId,
        ice_servers: Vec<IceServerConfig>,
    },
    Failed {
        attempt: u64,
        error: CallError,
    },
}

/// Drives one call from permission prompt to hangup.
///
/// Owns every piece of mutable call state. Network requests run on spawned
/// tasks and report back over channels, so all mutation happens inside
/// [`CallOrchestrator::run`].
pub struct CallOrchestrator {
    config: CallConfig,
    transport: Arc<dyn SignalingTransport>,
    host: Arc<dyn MediaHost>,
    registry: PeerSessionRegistry,
    directory: PeerDirectory,
    session: CallSession,
    state: CallState,
    /// Bumped on every join and hangup; late task results are dropped.
    attempt: u64,
    local_media: Option<LocalMedia>,
    audio_enabled: bool,
    video_enabled: bool,
    pumps: Option<Pumps>,
    join_task: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<CallEvent>,
    command_rx: mpsc::Receiver<CallCommand>,
    peer_rx: mpsc::Receiver<PeerEvent>,
    pump_tx: mpsc::UnboundedSender<PumpOutput>,
    pump_rx: mpsc::UnboundedReceiver<PumpOutput>,
    join_tx: mpsc::UnboundedSender<JoinOutput>,
    join_rx: mpsc::UnboundedReceiver<JoinOutput>,
}

impl CallOrchestrator {
    pub fn new(
        config: CallConfig,
        transport: Arc<dyn SignalingTransport>,
        host: Arc<dyn MediaHost>,
        factory: Arc<dyn MediaConnectionFactory>,
    ) -> (Self, CallHandle, mpsc::UnboundedReceiver<CallEvent>) {
        let (command_tx, command_rx) = mpsc::channel(100);
        let (peer_tx, peer_rx) = mpsc::channel(256);
        let (pump_tx, pump_rx) = mpsc::unbounded_channel();
        let (join_tx, join_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();

        let directory = PeerDirectory::new();
        let handle = CallHandle::new(command_tx, directory.clone());

        let orchestrator = Self {
            session: CallSession::new(config.room_token.clone()),
            config,
            transport,
            host,
            registry: PeerSessionRegistry::new(factory, peer_tx),
            directory,
            state: CallState::Idle,
            attempt: 0,
            local_media: None,
            audio_enabled: true,
            video_enabled: true,
            pumps: None,
            join_task: None,
            events,
            command_rx,
            peer_rx,
            pump_tx,
            pump_rx,
            join_tx,
            join_rx,
        };

        (orchestrator, handle, event_rx)
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub async fn run(mut self) {
        info!("Call loop started for room '{}'", self.session.token);

        self.start().await;

        while self.state != CallState::Closed {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle(c).await,
                        None => {
                            info!("All call handles dropped. Tearing down.");
                            self.hang_up(HangupReason::Teardown).await;
                        }
                    }
                }

                Some(evt) = self.peer_rx.recv() => self.handle_peer_event(evt).await,

                Some(out) = self.pump_rx.recv() => self.handle_pump_output(out).await,

                Some(out) = self.join_rx.recv() => self.handle_join_output(out).await,
            }
        }

        self.emit(CallEvent::Closed);
        info!("Call loop finished");
    }

    pub async fn handle(&mut self, command: CallCommand) {
        debug!("Command {:?} in state {}", command, self.state);

        match command {
            CallCommand::ToggleAudio => {
                self.audio_enabled = !self.audio_enabled;
                self.host.set_audio_enabled(self.audio_enabled);
                self.broadcast_toggle(MediaToggle::audio(self.audio_enabled)).await;
            }

            CallCommand::ToggleVideo => {
                self.video_enabled = !self.video_enabled;
                self.host.set_video_enabled(self.video_enabled);
                self.broadcast_toggle(MediaToggle::video(self.video_enabled)).await;
            }

            CallCommand::SwitchCamera => self.host.switch_camera(),

            CallCommand::HangUp => self.hang_up(HangupReason::User).await,

            CallCommand::Dispose => self.hang_up(HangupReason::Teardown).await,

            CallCommand::ConnectivityChanged(usable) => self.connectivity_changed(usable).await,
        }
    }

    async fn start(&mut self) {
        self.set_state(CallState::PermissionsPending);
        if let Err(e) = self.acquire_permissions().await {
            if let CallError::PermissionDenied { permanent } = e {
                self.emit(CallEvent::PermissionDenied { permanent });
            }
            self.fail(e);
            self.set_state(CallState::Closed);
            return;
        }

        if let Err(e) = self.capture_media().await {
            self.fail(e);
            self.set_state(CallState::Closed);
            return;
        }
        self.set_state(CallState::MediaReady);

        self.begin_join(false);
    }

    async fn acquire_permissions(&mut self) -> Result<(), CallError> {
        let prompts = self.config.permission_requests.max(1);

        for prompt in 1..=prompts {
            match self.host.request_permissions().await {
                PermissionStatus::Granted => return Ok(()),
                PermissionStatus::PermanentlyDenied => {
                    warn!("Camera/microphone permanently denied");
                    self.host.open_settings();
                    return Err(CallError::PermissionDenied { permanent: true });
                }
                PermissionStatus::Denied => {
                    debug!("Permission denied ({}/{})", prompt, prompts);
                }
            }
        }

        Err(CallError::PermissionDenied { permanent: false })
    }

    async fn capture_media(&mut self) -> Result<(), CallError> {
        let media = self
            .host
            .start_capture()
            .await
            .map_err(|e| CallError::Media(format!("{e:#}")))?;

        self.host.set_audio_enabled(self.audio_enabled);
        self.host.set_video_enabled(self.video_enabled);
        self.local_media = Some(media);
        Ok(())
    }

    /// Spawns fetch-settings, join-room, join-call. With `leave_first` a
    /// best-effort leave runs before, clearing a stale server-side session.
    fn begin_join(&mut self, leave_first: bool) {
        if let Some(task) = self.join_task.take() {
            task.abort();
        }
        self.attempt += 1;
        self.session.set_leaving(false);
        self.set_state(CallState::FetchingIceConfig);

        let attempt = self.attempt;
        let transport = self.transport.clone();
        let token = self.session.token.clone();
        let tx = self.join_tx.clone();

        // A restart may still hold the previous call until the leave lands.
        self.session.relay = if leave_first {
            RelayPresence::Call
        } else {
            RelayPresence::None
        };

        self.join_task = Some(tokio::spawn(async move {
            if leave_first {
                leave_relay(transport.as_ref(), &token, RelayPresence::Call).await;
                let _ = tx.send(JoinOutput::Progress {
                    attempt,
                    state: CallState::FetchingIceConfig,
                });
            }

            let result = join_sequence(transport.as_ref(), &token, attempt, &tx).await;
            let out = match result {
                Ok((session_id, ice_servers)) => JoinOutput::Joined {
                    attempt,
                    session_id,
                    ice_servers,
                },
                Err(error) => JoinOutput::Failed { attempt, error },
            };
            let _ = tx.send(out);
        }));
    }

    fn track_join_progress(&mut self, out: &JoinOutput) {
        match out {
            JoinOutput::Progress { attempt, state } if *attempt == self.attempt => match state {
                CallState::FetchingIceConfig => self.session.relay = RelayPresence::None,
                CallState::JoiningRoom => self.session.reached(RelayPresence::Room),
                CallState::JoiningCall => self.session.reached(RelayPresence::Call),
                _ => {}
            },
            JoinOutput::Joined { attempt, .. } if *attempt == self.attempt => {
                self.session.reached(RelayPresence::Call);
            }
            _ => {}
        }
    }

    async fn handle_join_output(&mut self, out: JoinOutput) {
        self.track_join_progress(&out);
        match out {
            JoinOutput::Progress { attempt, state } if attempt == self.attempt => {
                self.set_state(state);
            }

            JoinOutput::Joined {
                attempt,
                session_id,
                ice_servers,
            } if attempt == self.attempt => {
                self.join_task = None;
                info!("Joined call as {} with {} ICE servers", session_id, ice_servers.len());
                self.session.session_id = session_id.clone();
                self.registry
                    .bind(session_id, ice_servers, self.local_media.clone());

                let settings = PumpSettings {
                    token: self.session.token.clone(),
                    attempt,
                    ping_interval: self.config.ping_interval(),
                    pull_interval: self.config.pull_interval(),
                    pump_retries: self.config.pump_retries,
                    send_retries: self.config.send_retries,
                    send_retry_delay: self.config.send_retry_delay(),
                };
                self.pumps = Some(Pumps::spawn(
                    self.transport.clone(),
                    settings,
                    self.session.leaving_flag(),
                    self.pump_tx.clone(),
                ));
                self.set_state(CallState::InCall);
            }

            JoinOutput::Failed { attempt, error } if attempt == self.attempt => {
                self.join_task = None;
                error!("Joining the call failed: {}", error);
                if error == CallError::Transport(TransportError::Unauthorized) {
                    self.emit(CallEvent::AuthorizationRequired);
                }
                self.fail(error);
                // Leaving stays raised so regained connectivity retries the join.
                self.session.set_leaving(true);
                self.set_state(CallState::Idle);
            }

            stale => debug!("Dropping stale join output {:?}", stale),
        }
    }

    async fn handle_pump_output(&mut self, out: PumpOutput) {
        match out {
            PumpOutput::Signals { attempt, signals } if attempt == self.attempt => {
                self.process_signals(signals).await;
            }
            PumpOutput::Unauthorized { attempt } if attempt == self.attempt => {
                self.emit(CallEvent::AuthorizationRequired);
            }
            stale => debug!("Dropping stale pump output {:?}", stale),
        }
    }

    /// Handles one delivered batch strictly in order.
    async fn process_signals(&mut self, signals: Vec<Signal>) {
        for signal in signals {
            if self.session.is_leaving() {
                debug!("Leaving, ignoring the rest of the batch");
                return;
            }

            match signal {
                Signal::Roster(snapshot) => self.apply_roster(&snapshot).await,
                Signal::Message(message) => self.handle_message(message).await,
                Signal::Malformed(reason) => warn!("Malformed signaling entry: {}", reason),
                Signal::Unknown(kind) => debug!("Ignoring signaling entry of type '{}'", kind),
            }
        }
    }

    async fn apply_roster(&mut self, snapshot: &RosterSnapshot) {
        let current = self.registry.session_ids();
        let delta =
            RoomPresenceReconciler::reconcile(snapshot, &self.session.session_id, &current);
        if delta.is_empty() {
            return;
        }
        debug!("Roster delta: +{:?} -{:?}", delta.joined, delta.left);

        for session_id in delta.left {
            self.remove_peer(&session_id).await;
        }

        for session_id in delta.joined {
            if let Err(e) = self.add_peer(&session_id).await {
                warn!("Could not open a session with {}: {}", session_id, e);
                continue;
            }
            self.start_peer(&session_id).await;
        }
    }

    async fn add_peer(&mut self, session_id: &SessionId) -> Result<(), CallError> {
        if self.registry.contains(session_id) {
            return Ok(());
        }
        self.registry.get_or_create(session_id).await?;
        self.directory.insert(session_id.clone());
        self.emit(CallEvent::PeerJoined(session_id.clone()));
        Ok(())
    }

    async fn start_peer(&mut self, session_id: &SessionId) {
        let nick = self.config.nick();
        let Some(peer) = self.registry.lookup_mut(session_id) else {
            return;
        };

        match peer.start(nick).await {
            Ok(Some(offer)) => self.send(vec![offer]),
            Ok(None) => {}
            Err(e) => {
                warn!("{}", e);
                self.remove_peer(session_id).await;
            }
        }
    }

    async fn remove_peer(&mut self, session_id: &SessionId) {
        if !self.registry.remove(session_id).await {
            return;
        }
        self.directory.remove(session_id);
        self.emit(CallEvent::RemoteStreamDetached(session_id.clone()));
        self.emit(CallEvent::PeerLeft(session_id.clone()));
    }

    async fn handle_message(&mut self, message: SignalingMessage) {
        if !message.is_video_room() {
            warn!("Ignoring message for room type '{}'", message.room_type);
            return;
        }
        let Some(from) = message.from.clone() else {
            warn!("Ignoring signaling message without a sender");
            return;
        };
        if from == self.session.session_id {
            return;
        }
        let kind = match message.kind() {
            Ok(kind) => kind,
            Err(reason) => {
                warn!("Message from {}: {}", from, reason);
                return;
            }
        };

        if let Err(e) = self.add_peer(&from).await {
            warn!("Could not open a session with {}: {}", from, e);
            return;
        }

        let result = match kind {
            SignalKind::Offer => self.apply_description(&from, SdpKind::Offer, &message).await,
            SignalKind::Answer => self.apply_description(&from, SdpKind::Answer, &message).await,
            SignalKind::Candidate => self.apply_candidate(&from, &message).await,
            SignalKind::EndOfCandidates => {
                if let Some(peer) = self.registry.lookup_mut(&from) {
                    let applied = peer.handle_end_of_candidates().await;
                    debug!("End of candidates from {}, applied {}", from, applied);
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("Tearing down session: {}", e);
            self.remove_peer(&from).await;
        }
    }

    async fn apply_description(
        &mut self,
        from: &SessionId,
        kind: SdpKind,
        message: &SignalingMessage,
    ) -> Result<(), CallError> {
        let sdp = message
            .sdp()
            .ok_or_else(|| CallError::protocol(from, "description without sdp"))?;
        let codec = self.config.preferred_video_codec.as_str();
        let local_nick = self.config.nick();
        let Some(peer) = self.registry.lookup_mut(from) else {
            return Ok(());
        };

        let outcome = peer
            .handle_description(kind, sdp, message.nick(), codec, local_nick)
            .await?;

        if let Some(nick) = outcome.nick_changed {
            self.directory
                .update(from, |summary| summary.nick = Some(nick.clone()));
            self.emit(CallEvent::NickChanged(from.clone(), nick));
        }
        if let Some(reply) = outcome.reply {
            self.send(vec![reply]);
        }
        Ok(())
    }

    async fn apply_candidate(
        &mut self,
        from: &SessionId,
        message: &SignalingMessage,
    ) -> Result<(), CallError> {
        let candidate = message
            .ice_candidate()
            .cloned()
            .ok_or_else(|| CallError::protocol(from, "candidate message without a candidate"))?;
        if let Some(peer) = self.registry.lookup_mut(from) {
            let disposition = peer.handle_candidate(candidate).await;
            debug!("Candidate from {}: {:?}", from, disposition);
        }
        Ok(())
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        if self.session.is_leaving() {
            return;
        }

        match event {
            PeerEvent::CandidateGenerated(session_id, candidate) => {
                let Some(peer) = self.registry.lookup(&session_id) else {
                    return;
                };
                let message = peer.local_candidate_message(candidate);
                self.send(vec![message]);
            }

            PeerEvent::GatheringComplete(session_id) => {
                let Some(peer) = self.registry.lookup(&session_id) else {
                    return;
                };
                let message = peer.end_of_candidates_message();
                self.send(vec![message]);
            }

            PeerEvent::TrackAdded(session_id, kind, track_id) => {
                if !self.registry.contains(&session_id) {
                    return;
                }
                self.emit(CallEvent::RemoteStreamAttached {
                    session_id,
                    kind,
                    track_id,
                });
            }

            PeerEvent::Message(session_id, data) => {
                let Ok(text) = std::str::from_utf8(&data) else {
                    warn!("Non UTF-8 data channel frame from {}", session_id);
                    return;
                };
                let Some(peer) = self.registry.lookup_mut(&session_id) else {
                    return;
                };
                let Some(toggle) = peer.apply_remote_toggle(text) else {
                    return;
                };

                let enabled = toggle.enabled();
                if toggle.is_video() {
                    self.directory
                        .update(&session_id, |summary| summary.video_enabled = enabled);
                    self.emit(CallEvent::RemoteVideoChanged(session_id, enabled));
                } else {
                    self.directory
                        .update(&session_id, |summary| summary.audio_enabled = enabled);
                    self.emit(CallEvent::RemoteAudioChanged(session_id, enabled));
                }
            }

            PeerEvent::StateChanged(session_id, ConnectionState::Connected) => {
                if let Some(peer) = self.registry.lookup_mut(&session_id) {
                    peer.mark_connected();
                    self.directory
                        .update(&session_id, |summary| summary.connected = true);
                }
            }

            PeerEvent::StateChanged(session_id, ConnectionState::Failed | ConnectionState::Closed) => {
                if !self.registry.contains(&session_id) {
                    return;
                }
                info!("Connection to {} ended", session_id);
                self.emit(CallEvent::ConnectionClosed(session_id.clone()));
                self.remove_peer(&session_id).await;
            }

            PeerEvent::StateChanged(session_id, state) => {
                debug!("Connection to {} is {:?}", session_id, state);
            }
        }
    }

    async fn broadcast_toggle(&self, toggle: MediaToggle) {
        for peer in self.registry.sessions() {
            if let Err(e) = peer.send_media_toggle(toggle).await {
                warn!("{}", e);
            }
        }
    }

    async fn connectivity_changed(&mut self, usable: bool) {
        info!("Connectivity changed (usable: {}) in state {}", usable, self.state);

        if usable {
            if self.session.is_leaving() && self.state == CallState::Idle {
                self.restart().await;
            }
            return;
        }

        if self.state == CallState::InCall || self.state.is_joining() {
            self.hang_up(HangupReason::NetworkLoss).await;
        }
    }

    async fn restart(&mut self) {
        info!("Connectivity is back, rejoining");
        if self.local_media.is_none() {
            if let Err(e) = self.capture_media().await {
                self.fail(e);
                return;
            }
            self.set_state(CallState::MediaReady);
        }
        self.begin_join(true);
    }

    async fn hang_up(&mut self, reason: HangupReason) {
        if matches!(self.state, CallState::Closed | CallState::Leaving) {
            return;
        }
        info!("Hanging up ({:?})", reason);

        self.session.set_leaving(true);
        self.set_state(CallState::Leaving);

        // Stop an unfinished join, then account for every step it announced.
        if let Some(task) = self.join_task.take() {
            task.abort();
            let _ = task.await;
        }
        while let Ok(out) = self.join_rx.try_recv() {
            self.track_join_progress(&out);
        }
        self.attempt += 1;

        if let Some(pumps) = self.pumps.take() {
            pumps.stop();
        }

        for session_id in self.registry.remove_all().await {
            self.emit(CallEvent::RemoteStreamDetached(session_id.clone()));
            self.emit(CallEvent::PeerLeft(session_id));
        }
        self.directory.clear();

        self.host.release();
        self.local_media = None;
        self.session.session_id = SessionId::unassigned();

        match reason {
            HangupReason::NetworkLoss => self.set_state(CallState::Idle),
            HangupReason::User | HangupReason::Teardown => {
                let presence = std::mem::take(&mut self.session.relay);
                leave_relay(self.transport.as_ref(), &self.session.token, presence).await;
                self.set_state(CallState::Closed);
            }
        }
    }

    fn send(&self, messages: Vec<SignalingMessage>) {
        match &self.pumps {
            Some(pumps) => pumps.send(messages),
            None => debug!("Not in a call, dropping {} outbound messages", messages.len()),
        }
    }

    fn set_state(&mut self, state: CallState) {
        if self.state == state {
            return;
        }
        debug!("Call state {} -> {}", self.state, state);
        self.state = state;
        self.emit(CallEvent::StateChanged(state));
    }

    fn fail(&self, error: CallError) {
        self.emit(CallEvent::Failed(error));
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }
}

async fn join_sequence(
    transport: &dyn SignalingTransport,
    token: &str,
    attempt: u64,
    progress: &mpsc::UnboundedSender<JoinOutput>,
) -> Result<(SessionId, Vec<IceServerConfig>), CallError> {
    let ice_servers = transport.fetch_ice_servers().await?;

    let _ = progress.send(JoinOutput::Progress {
        attempt,
        state: CallState::JoiningRoom,
    });
    let session_id = transport.join_room(token).await?;

    let _ = progress.send(JoinOutput::Progress {
        attempt,
        state: CallState::JoiningCall,
    });
    transport.join_call(token).await?;

    Ok((session_id, ice_servers))
}

/// Leaves the call, then the room. The room is left only once the call was.
async fn leave_relay(transport: &dyn SignalingTransport, token: &str, presence: RelayPresence) {
    if presence == RelayPresence::None {
        return;
    }
    if presence == RelayPresence::Call {
        if let Err(e) = transport.leave_call(token).await {
            warn!("Leaving the call failed: {}", e);
            return;
        }
    }
    if let Err(e) = transport.leave_room(token).await {
        warn!("Leaving the room failed: {}", e);
    }
}
