//! Sea-ORM entities backing [`SeaOrmStore`](crate::SeaOrmStore).
//!
//! Nested values (locations, histories) are stored as MessagePack blobs and
//! decoded into [`crate::model`] types by the store. Timestamps are
//! `TIMESTAMPTZ` columns.

/// One row per login session.
pub mod tracked_session;

/// Location fields denormalized per user.
pub mod user_location;
