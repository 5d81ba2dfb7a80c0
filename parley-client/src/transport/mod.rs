mod media_connection;
mod media_host;
mod rtc_config;
mod rtc_connection;

pub use media_connection::*;
pub use media_host::*;
pub use rtc_config::*;
pub use rtc_connection::*;
