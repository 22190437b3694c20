//! Documents table.
//!
//! Every collection (trips, vehicles, payments, invoices, users, vendors,
//! customers) lives in one JSONB table keyed by collection and organisation.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DOCUMENTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS documents CASCADE;")
            .await?;
        Ok(())
    }
}

const DOCUMENTS_SQL: &str = r"
CREATE TABLE documents (
    id UUID PRIMARY KEY,
    collection VARCHAR(64) NOT NULL,
    organization_id UUID NOT NULL,
    code VARCHAR(32),
    body JSONB NOT NULL,
    version BIGINT NOT NULL DEFAULT 0,
    disabled BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_version_non_negative CHECK (version >= 0)
);

-- Short codes are unique per collection within an organisation
CREATE UNIQUE INDEX idx_documents_code
    ON documents(collection, organization_id, code)
    WHERE code IS NOT NULL;

-- Listing a collection for an organisation
CREATE INDEX idx_documents_scope ON documents(collection, organization_id, created_at);

-- Containment filters (requestIds lookups, status filters)
CREATE INDEX idx_documents_body ON documents USING GIN (body jsonb_path_ops);
";
