//! Operator account persistence operations.

use anyhow::Result;
use chrono::Utc;
use skywatch_core::models::{Operator, Role};
use sqlx::SqlitePool;

use super::flights::parse_timestamp;

/// Outcome of an insert attempt; duplicate emails are surfaced rather
/// than treated as storage failures.
pub enum InsertOutcome {
    Created(Operator),
    DuplicateEmail,
}

/// Insert a new operator account.
pub async fn insert_operator(
    pool: &SqlitePool,
    email: &str,
    role: Role,
    credential_verifier: &str,
) -> Result<InsertOutcome> {
    let created_at = Utc::now();
    let result = sqlx::query(
        "INSERT INTO operators (email, role, credential_verifier, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(email)
    .bind(role_str(role))
    .bind(credential_verifier)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(done) => Ok(InsertOutcome::Created(Operator {
            id: done.last_insert_rowid(),
            email: email.to_string(),
            role,
            credential_verifier: credential_verifier.to_string(),
            created_at,
        })),
        Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::DuplicateEmail),
        Err(err) => Err(err.into()),
    }
}

/// Look up an operator by email.
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Operator>> {
    let row = sqlx::query_as::<_, OperatorRow>("SELECT * FROM operators WHERE email = ?1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Operator::from))
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Analyst => "analyst",
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed"))
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct OperatorRow {
    id: i64,
    email: String,
    role: String,
    credential_verifier: String,
    created_at: String,
}

impl From<OperatorRow> for Operator {
    fn from(row: OperatorRow) -> Self {
        Operator {
            id: row.id,
            email: row.email,
            role: match row.role.as_str() {
                "admin" => Role::Admin,
                _ => Role::Analyst,
            },
            credential_verifier: row.credential_verifier,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}
