mod call_command;
mod call_config;
mod call_event;
mod call_orchestrator;
mod call_session;
mod call_state;
mod pumps;

pub use call_command::*;
pub use call_config::*;
pub use call_event::*;
pub use call_orchestrator::*;
pub use call_session::*;
pub use call_state::*;
