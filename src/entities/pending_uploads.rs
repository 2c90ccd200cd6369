use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Queue row status: eligible for drains.
pub const STATUS_PENDING: &str = "pending";
/// Queue row status: kept but excluded from drains until requeued.
pub const STATUS_PARKED: &str = "parked";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_uploads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub upload_key: String,
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub file_bytes: Vec<u8>,
    pub checksum: String,
    pub size: i64,
    pub owner_id: String,
    pub account_id: String,
    pub path: String,
    pub created_at: i64,
    #[sea_orm(default_value = 0)]
    pub attempts: i32,
    pub last_error: Option<String>,
    #[sea_orm(default_value = 0)]
    pub next_attempt_at: i64,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
