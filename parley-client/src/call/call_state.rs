use std::fmt;

/// Top-level phase of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Not in a call. Also the resting state after a network-loss hangup.
    Idle,
    PermissionsPending,
    MediaReady,
    FetchingIceConfig,
    JoiningRoom,
    JoiningCall,
    InCall,
    Leaving,
    /// Terminal: the call loop has finished.
    Closed,
}

impl CallState {
    pub fn is_joining(self) -> bool {
        matches!(
            self,
            Self::FetchingIceConfig | Self::JoiningRoom | Self::JoiningCall
        )
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
