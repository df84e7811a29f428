//! # Ripple Transport
//!
//! HTTP transport for the Ripple bot framework.
//!
//! [`HttpBot`] implements [`ripple_core::Bot`] on top of `reqwest`:
//!
//! - method calls go to `{api_url}/{method}` with the access token and API
//!   version injected
//! - the long-poll request goes straight to the session's server URL
//!
//! ```rust,ignore
//! use ripple_transport::{HttpBot, HttpBotConfig};
//!
//! let bot = HttpBot::new(HttpBotConfig::new("token", 123456))?;
//! let dispatcher = Dispatcher::new(Arc::new(bot), true);
//! ```

mod http;

pub use http::{
    DEFAULT_API_URL, DEFAULT_API_VERSION, DEFAULT_TIMEOUT, HttpBot, HttpBotConfig, flatten_params,
};
