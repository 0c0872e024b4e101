//! facegate-session — Timed face sampling over a live camera.
//!
//! Drives an [`facegate_core::Poller`] from a tokio interval, loads the model
//! set from a remote host, and reports progress, notices, and the final
//! descriptor through a [`SessionListener`].

pub mod config;
pub mod models;
pub mod session;

pub use config::{Config, ConfigError};
pub use models::{load_model_set, HttpModelSource, RemoteModelProvider};
pub use session::{
    spawn_session, ChannelListener, SessionError, SessionEvent, SessionHandle, SessionListener,
};
