//! Chat platform adapters for LowBot.
//!
//! Each adapter provides a kernel `ClientFactory` and `ChatClient`:
//!
//! - **[`terminal`]**: replies on stdout, utterances from stdin.
//! - **[`webhook`]**: replies POSTed as JSON to an HTTP endpoint.
//!
//! [`settings`] maps declarative configuration onto adapter bindings.

pub mod error;
pub mod settings;
pub mod terminal;
pub mod webhook;

pub use error::{AdapterError, Result};
pub use settings::{AdapterKind, AdapterSettings};
pub use terminal::{TERMINAL_ADAPTER, TerminalClient, TerminalFactory, TerminalInput};
pub use webhook::{BEARER_LOGIN, WebhookClient, WebhookFactory};
