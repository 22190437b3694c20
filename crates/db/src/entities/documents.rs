//! `SeaORM` Entity for the documents table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One stored document row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    /// Document id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Collection the document belongs to, e.g. `trips`.
    pub collection: String,
    /// Owning organisation.
    pub organization_id: Uuid,
    /// Organisation-unique short code, if the collection has one.
    pub code: Option<String>,
    /// Full document body.
    #[sea_orm(column_type = "JsonBinary")]
    pub body: Json,
    /// Write version, bumped on every replace.
    pub version: i64,
    /// Soft-delete flag mirrored from the body for filtering.
    pub disabled: bool,
    /// Insert time.
    pub created_at: DateTimeWithTimeZone,
    /// Last write time.
    pub updated_at: DateTimeWithTimeZone,
}

/// Documents reference each other by value, not by foreign key.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
