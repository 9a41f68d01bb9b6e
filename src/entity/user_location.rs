//! Per-user denormalized location entity.

use sea_orm::entity::prelude::*;

/// Latest location fields of a user, kept in sync by the reconciler.
///
/// At most one of `last_vpn_location` and `last_actual_location` is non-null,
/// and `is_vpn_currently_detected` tells which.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_location")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub user_id: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_ip_address: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_isp: Option<String>,
    pub last_vpn_location: Option<Vec<u8>>,
    pub last_actual_location: Option<Vec<u8>>,
    pub is_vpn_currently_detected: bool,
    /// MessagePack-encoded bounded history, oldest first.
    pub location_history: Vec<u8>,
    pub updated_at: DateTimeWithTimeZone,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
