//! The account code guard in the database.
//!
//! A partial unique index over `LOWER(TRIM(code))` for live accounts plus a
//! validation trigger that raises `unique_violation` with a readable message.
//! Both statements are idempotent.

use ledgerkeep_core::LedgerError;
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement, TransactionTrait};

use crate::error::StoreError;

/// Name of the partial unique index.
pub const CODE_GUARD_INDEX: &str = "idx_accounts_code_active";

const DUPLICATE_CODES_SQL: &str = r"
SELECT LOWER(TRIM(code)) AS normalized_code
FROM accounts
WHERE deleted_at IS NULL
GROUP BY LOWER(TRIM(code))
HAVING COUNT(*) > 1
ORDER BY 1
";

const GUARD_INSTALLED_SQL: &str = r"
SELECT COUNT(*) AS installed
FROM pg_indexes
WHERE tablename = 'accounts'
  AND indexname = 'idx_accounts_code_active'
  AND indexdef ILIKE '%trim%'
";

// An index built over untrimmed codes is replaced.
const GUARD_INDEX_SQL: &str = r"
DROP INDEX IF EXISTS idx_accounts_code_active;
CREATE UNIQUE INDEX idx_accounts_code_active
    ON accounts (LOWER(TRIM(code)))
    WHERE deleted_at IS NULL
";

const GUARD_TRIGGER_SQL: &str = r"
CREATE OR REPLACE FUNCTION prevent_duplicate_account_code()
RETURNS TRIGGER AS $$
BEGIN
    IF NEW.deleted_at IS NOT NULL THEN
        RETURN NEW;
    END IF;
    IF EXISTS (
        SELECT 1 FROM accounts
        WHERE LOWER(TRIM(code)) = LOWER(TRIM(NEW.code))
          AND deleted_at IS NULL
          AND id <> NEW.id
    ) THEN
        RAISE EXCEPTION 'Account code % already exists', NEW.code
            USING ERRCODE = '23505';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS trg_prevent_duplicate_account_code ON accounts;
CREATE TRIGGER trg_prevent_duplicate_account_code
    BEFORE INSERT OR UPDATE OF code, deleted_at ON accounts
    FOR EACH ROW EXECUTE FUNCTION prevent_duplicate_account_code();
";

/// Returns true if the unique index is present.
///
/// # Errors
///
/// Returns an error if the catalog query fails.
pub async fn is_installed<C: ConnectionTrait>(conn: &C) -> Result<bool, StoreError> {
    let row = conn
        .query_one(Statement::from_string(DatabaseBackend::Postgres, GUARD_INSTALLED_SQL))
        .await?;
    let count: i64 = match row {
        Some(row) => row.try_get("", "installed")?,
        None => 0,
    };
    Ok(count > 0)
}

/// Normalized codes shared by more than one live account.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn duplicate_codes<C: ConnectionTrait>(conn: &C) -> Result<Vec<String>, StoreError> {
    let rows = conn
        .query_all(Statement::from_string(DatabaseBackend::Postgres, DUPLICATE_CODES_SQL))
        .await?;
    rows.iter()
        .map(|row| row.try_get::<String>("", "normalized_code").map_err(StoreError::from))
        .collect()
}

/// Installs the index and trigger. Returns false if the index already
/// existed.
///
/// # Errors
///
/// Returns [`LedgerError::GuardViolation`] while live duplicates remain, or
/// a database error.
pub async fn install_code_guard<C>(db: &C) -> Result<bool, StoreError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let codes = duplicate_codes(&txn).await?;
    if !codes.is_empty() {
        return Err(LedgerError::GuardViolation { codes }.into());
    }

    let existed = is_installed(&txn).await?;
    if !existed {
        txn.execute_unprepared(GUARD_INDEX_SQL).await?;
    }
    txn.execute_unprepared(GUARD_TRIGGER_SQL).await?;
    txn.commit().await?;

    if existed {
        tracing::debug!(index = CODE_GUARD_INDEX, "account code guard already installed");
    } else {
        tracing::info!(index = CODE_GUARD_INDEX, "account code guard installed");
    }
    Ok(!existed)
}
