//! Binding between a `tower-sessions` cookie session and a tracked session.
//!
//! Storing the tracked session id in the cookie session lets activity checks
//! name their session explicitly through
//! [`Reconciler::reconcile_session`](crate::Reconciler::reconcile_session)
//! instead of relying on the most recent login.
//!
//! ```no_run
//! use tower_sessions::Session;
//! use session_locator::{token, SessionId};
//!
//! # async fn example(session: Session) -> Result<(), tower_sessions::session::Error> {
//! token::remember(&session, &SessionId::from("0b8e4d0c")).await?;
//! let tracked: Option<SessionId> = token::recall(&session).await?;
//! # Ok(())
//! # }
//! ```

use tower_sessions::session::Error;
use tower_sessions::Session;

use crate::model::SessionId;

/// Key under which the tracked session id is kept.
pub const TRACKED_SESSION_KEY: &str = "session_locator.tracked_session_id";

/// Associates the cookie session with a tracked session.
pub async fn remember(session: &Session, id: &SessionId) -> Result<(), Error> {
    session.insert(TRACKED_SESSION_KEY, id).await
}

/// The tracked session bound to the cookie session, if any.
pub async fn recall(session: &Session) -> Result<Option<SessionId>, Error> {
    session.get(TRACKED_SESSION_KEY).await
}

/// Removes the binding and returns the tracked session it pointed to.
pub async fn forget(session: &Session) -> Result<Option<SessionId>, Error> {
    session.remove(TRACKED_SESSION_KEY).await
}
