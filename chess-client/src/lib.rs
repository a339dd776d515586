//! Chess backend client library
//!
//! One asynchronous [`Provider`] contract over every game backend: an
//! in-process rules engine ([`LocalProvider`]) and several remote HTTP
//! engines with divergent JSON dialects ([`RemoteProvider`] plus one
//! adapter per backend). A [`BackendSelector`] owns the active provider
//! and its connectivity state; a [`GameSession`] orchestrates turn-taking
//! on top, including the artificial opponent.
//!
//! # Example
//!
//! ```no_run
//! use chess_client::{BackendSelector, GameSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let selector = BackendSelector::from_env()?;
//!     let mut session = GameSession::new(selector, None).await?;
//!     let snapshot = session.play_move("e2", "e4", None).await?;
//!     println!("fen after 1. e4: {}", snapshot.fen);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod error;
pub mod local;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod remote;
pub mod selector;
pub mod session;
pub mod traits;
pub mod transport;
pub mod types;

pub use error::{ClientError, ClientResult};
pub use local::LocalProvider;
pub use remote::RemoteProvider;
pub use selector::{BackendSelector, ConnectionStatus};
pub use session::{AiOpponent, GameSession};
pub use traits::Provider;
pub use types::{
    AiMoveOutcome, AnalysisScore, BackendId, BoardGrid, BoardPiece, Capabilities,
    CreateGameOptions, GameSnapshot, LegalMove, MoveRecord, RemoteAnalysis, SelectorSettings,
};
