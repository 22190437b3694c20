//! PostgreSQL document store on `SeaORM`.
//!
//! All collections share the `documents` table. Bodies are JSONB, so
//! containment filters run as `body @> $1` and array pushes as an
//! in-place `jsonb_set`.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use serde_json::Value;
use uuid::Uuid;

use super::{DocumentStore, StoreError, StoredDocument};
use crate::entities::documents;

/// `SeaORM`-backed [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct SeaStore {
    db: DatabaseConnection,
}

impl SeaStore {
    /// Creates a store over an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn scoped(collection: &str, organization_id: Uuid) -> sea_orm::Select<documents::Entity> {
        documents::Entity::find()
            .filter(documents::Column::Collection.eq(collection))
            .filter(documents::Column::OrganizationId.eq(organization_id))
    }

    fn containing(
        collection: &str,
        organization_id: Uuid,
        filter: &Value,
    ) -> sea_orm::Select<documents::Entity> {
        Self::scoped(collection, organization_id)
            .filter(Expr::cust_with_values("body @> ?", [filter.clone()]))
    }

    async fn exists(&self, collection: &str, organization_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let count = Self::scoped(collection, organization_id)
            .filter(documents::Column::Id.eq(id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

impl From<documents::Model> for StoredDocument {
    fn from(model: documents::Model) -> Self {
        Self {
            id: model.id,
            collection: model.collection,
            organization_id: model.organization_id,
            code: model.code,
            version: model.version,
            disabled: model.disabled,
            body: model.body,
        }
    }
}

fn insert_error(err: DbErr, document: &StoredDocument) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateCode {
            collection: document.collection.clone(),
            code: document.code.clone().unwrap_or_default(),
        },
        _ => StoreError::Database(err.to_string()),
    }
}

#[async_trait]
impl DocumentStore for SeaStore {
    async fn insert(&self, document: StoredDocument) -> Result<StoredDocument, StoreError> {
        let now = chrono::Utc::now().into();

        let model = documents::ActiveModel {
            id: Set(document.id),
            collection: Set(document.collection.clone()),
            organization_id: Set(document.organization_id),
            code: Set(document.code.clone()),
            body: Set(document.body.clone()),
            version: Set(document.version),
            disabled: Set(document.disabled),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model
            .insert(&self.db)
            .await
            .map(StoredDocument::from)
            .map_err(|e| insert_error(e, &document))
    }

    async fn find(
        &self,
        collection: &str,
        organization_id: Uuid,
        filter: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let models = Self::containing(collection, organization_id, filter)
            .order_by_asc(documents::Column::CreatedAt)
            .order_by_asc(documents::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(StoredDocument::from).collect())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let model = Self::scoped(collection, organization_id)
            .filter(documents::Column::Id.eq(id))
            .one(&self.db)
            .await?;
        Ok(model.map(StoredDocument::from))
    }

    async fn replace(
        &self,
        mut document: StoredDocument,
        expected_version: i64,
    ) -> Result<StoredDocument, StoreError> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let next_version = expected_version + 1;

        let result = documents::Entity::update_many()
            .col_expr(documents::Column::Body, Expr::value(document.body.clone()))
            .col_expr(documents::Column::Code, Expr::value(document.code.clone()))
            .col_expr(documents::Column::Disabled, Expr::value(document.disabled))
            .col_expr(documents::Column::Version, Expr::value(next_version))
            .col_expr(documents::Column::UpdatedAt, Expr::value(now))
            .filter(documents::Column::Id.eq(document.id))
            .filter(documents::Column::Collection.eq(document.collection.as_str()))
            .filter(documents::Column::OrganizationId.eq(document.organization_id))
            .filter(documents::Column::Version.eq(expected_version))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            let exists = self
                .exists(&document.collection, document.organization_id, document.id)
                .await?;
            return Err(if exists {
                StoreError::Conflict {
                    collection: document.collection,
                    id: document.id,
                    expected: expected_version,
                }
            } else {
                StoreError::NotFound {
                    collection: document.collection,
                    id: document.id,
                }
            });
        }

        document.version = next_version;
        Ok(document)
    }

    async fn push(
        &self,
        collection: &str,
        organization_id: Uuid,
        id: Uuid,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let appended = Expr::cust_with_values(
            "jsonb_set(body, ARRAY[?]::text[], COALESCE(body -> ?, '[]'::jsonb) || jsonb_build_array(?::jsonb))",
            [
                sea_orm::Value::from(field.to_string()),
                sea_orm::Value::from(field.to_string()),
                sea_orm::Value::from(value),
            ],
        );

        let result = documents::Entity::update_many()
            .col_expr(documents::Column::Body, appended)
            .col_expr(
                documents::Column::Version,
                Expr::col(documents::Column::Version).add(1),
            )
            .col_expr(documents::Column::UpdatedAt, Expr::value(now))
            .filter(documents::Column::Id.eq(id))
            .filter(documents::Column::Collection.eq(collection))
            .filter(documents::Column::OrganizationId.eq(organization_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }
        Ok(())
    }

    async fn remove(&self, collection: &str, organization_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        let result = documents::Entity::delete_many()
            .filter(documents::Column::Id.eq(id))
            .filter(documents::Column::Collection.eq(collection))
            .filter(documents::Column::OrganizationId.eq(organization_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }
        Ok(())
    }

    async fn count(
        &self,
        collection: &str,
        organization_id: Uuid,
        filter: &Value,
    ) -> Result<u64, StoreError> {
        Ok(Self::containing(collection, organization_id, filter)
            .count(&self.db)
            .await?)
    }
}
