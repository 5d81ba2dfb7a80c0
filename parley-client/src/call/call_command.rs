use crate::error::CallError;
use crate::peer::PeerDirectory;
use tokio::sync::mpsc;

/// User intent and environment notifications fed into the call loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallCommand {
    ToggleAudio,
    ToggleVideo,
    SwitchCamera,
    HangUp,
    /// Whether the network is usable now.
    ConnectivityChanged(bool),
    /// The owning screen is going away.
    Dispose,
}

/// Cloneable handle to a running call.
#[derive(Clone)]
pub struct CallHandle {
    commands: mpsc::Sender<CallCommand>,
    directory: PeerDirectory,
}

impl CallHandle {
    pub(crate) fn new(commands: mpsc::Sender<CallCommand>, directory: PeerDirectory) -> Self {
        Self {
            commands,
            directory,
        }
    }

    pub async fn send(&self, command: CallCommand) -> Result<(), CallError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CallError::Closed)
    }

    pub async fn toggle_audio(&self) -> Result<(), CallError> {
        self.send(CallCommand::ToggleAudio).await
    }

    pub async fn toggle_video(&self) -> Result<(), CallError> {
        self.send(CallCommand::ToggleVideo).await
    }

    pub async fn switch_camera(&self) -> Result<(), CallError> {
        self.send(CallCommand::SwitchCamera).await
    }

    pub async fn hang_up(&self) -> Result<(), CallError> {
        self.send(CallCommand::HangUp).await
    }

    pub async fn connectivity_changed(&self, usable: bool) -> Result<(), CallError> {
        self.send(CallCommand::ConnectivityChanged(usable)).await
    }

    pub async fn dispose(&self) -> Result<(), CallError> {
        self.send(CallCommand::Dispose).await
    }

    /// Live view of the remote participants.
    pub fn peers(&self) -> &PeerDirectory {
        &self.directory
    }
}
