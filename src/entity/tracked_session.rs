//! Tracked login session entity.

use sea_orm::entity::prelude::*;

/// Sea-ORM model of a login session and its location/VPN state.
///
/// # Database Schema
///
/// | Column                | Type                 | Description                                   |
/// |-----------------------|----------------------|-----------------------------------------------|
/// | id                    | TEXT (Primary Key)   | Session ID                                    |
/// | user_id               | TEXT                 | Owning user                                   |
/// | ip_address            | TEXT                 | Last origin IP seen for the session           |
/// | user_agent            | TEXT NULL            | User agent at login                           |
/// | login_time            | TIMESTAMPTZ          | Session start                                 |
/// | logout_time           | TIMESTAMPTZ NULL     | Set when the session is closed                |
/// | is_active             | BOOLEAN              | `false` once closed                           |
/// | location              | BLOB                 | Last resolved location, always written        |
/// | vpn_location          | BLOB NULL            | Set only while a VPN is detected              |
/// | real_location         | BLOB NULL            | Set only on a direct connection               |
/// | vpn_detected_at       | TIMESTAMPTZ NULL     | When the current VPN verdict was reached      |
/// | real_ip_confirmed_at  | TIMESTAMPTZ NULL     | When the direct connection was confirmed      |
/// | is_vpn_detected       | BOOLEAN              | Current VPN verdict                           |
/// | vpn_provider          | TEXT NULL            | Named VPN service, if recognised              |
/// | vpn_detection_score   | INTEGER              | Latest fraud score (0 to 100)                 |
/// | vpn_detection_history | BLOB                 | Bounded history of detection records          |
/// | version               | INTEGER              | Optimistic concurrency counter                |
///
/// Exactly one of `vpn_location` and `real_location` is non-null.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tracked_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub user_id: String,
    #[sea_orm(column_type = "Text")]
    pub ip_address: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    pub login_time: DateTimeWithTimeZone,
    pub logout_time: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
    pub location: Vec<u8>,
    pub vpn_location: Option<Vec<u8>>,
    pub real_location: Option<Vec<u8>>,
    pub vpn_detected_at: Option<DateTimeWithTimeZone>,
    pub real_ip_confirmed_at: Option<DateTimeWithTimeZone>,
    pub is_vpn_detected: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub vpn_provider: Option<String>,
    pub vpn_detection_score: i32,
    pub vpn_detection_history: Vec<u8>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
