//! Session management.
//!
//! A session is an isolated browsing identity: one browser context inside
//! one pooled browser process, plus the pages opened within it. The
//! [`SessionManager`] owns two mappings — session id to session, and process
//! port to shared control client — behind a single readers-writer lock.

mod analyzer;
mod error;
mod manager;
mod session;

pub use analyzer::{InteractiveSummary, PageStructure, SemanticSection, StructureDetail};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionInfo, SessionStatus};
