//! Ledger schema migration.
//!
//! Creates the chart of accounts, the unified journal, cash/bank sub-ledger
//! records and drift incidents, plus the critical-account trigger. The
//! account code guard is not part of the schema; it is installed once
//! duplicates have been resolved (see [`crate::guard`]).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(TABLES_SQL).await?;
        db.execute_unprepared(INDEXES_SQL).await?;
        db.execute_unprepared(CRITICAL_ACCOUNT_TRIGGER_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const TABLES_SQL: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL,
    name VARCHAR(255) NOT NULL,
    description TEXT,
    account_type VARCHAR(20) NOT NULL,
    category VARCHAR(50) NOT NULL DEFAULT '',
    parent_id UUID REFERENCES accounts(id),
    level INTEGER NOT NULL DEFAULT 1,
    is_header BOOLEAN NOT NULL DEFAULT false,
    balance NUMERIC(20, 2) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    is_system_critical BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_account_type CHECK (account_type IN ('ASSET', 'LIABILITY', 'EQUITY', 'REVENUE', 'EXPENSE')),
    CONSTRAINT chk_account_level CHECK (level >= 1),
    CONSTRAINT chk_account_not_own_parent CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE TABLE IF NOT EXISTS journal_entries (
    id UUID PRIMARY KEY,
    entry_number VARCHAR(100) NOT NULL,
    source_type VARCHAR(50) NOT NULL,
    source_id VARCHAR(100),
    entry_date DATE NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status VARCHAR(20) NOT NULL DEFAULT 'DRAFT',
    total_debit NUMERIC(20, 2) NOT NULL DEFAULT 0,
    total_credit NUMERIC(20, 2) NOT NULL DEFAULT 0,
    posted_at TIMESTAMPTZ,
    reversed_from UUID REFERENCES journal_entries(id),
    reversed_by UUID REFERENCES journal_entries(id),
    reversal_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_journal_entry_number UNIQUE (entry_number),
    CONSTRAINT chk_journal_status CHECK (status IN ('DRAFT', 'POSTED', 'REVERSED')),
    CONSTRAINT chk_journal_balanced CHECK (status = 'DRAFT' OR total_debit = total_credit),
    CONSTRAINT chk_journal_posted_at CHECK (status = 'DRAFT' OR posted_at IS NOT NULL),
    CONSTRAINT chk_journal_reversed_by CHECK (status <> 'REVERSED' OR reversed_by IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS journal_lines (
    id UUID PRIMARY KEY,
    journal_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    line_number INTEGER NOT NULL,
    debit_amount NUMERIC(20, 2) NOT NULL DEFAULT 0,
    credit_amount NUMERIC(20, 2) NOT NULL DEFAULT 0,
    memo TEXT,
    CONSTRAINT uq_journal_line_number UNIQUE (journal_id, line_number),
    CONSTRAINT chk_line_non_negative CHECK (debit_amount >= 0 AND credit_amount >= 0),
    CONSTRAINT chk_line_one_side CHECK ((debit_amount > 0) <> (credit_amount > 0))
);

CREATE TABLE IF NOT EXISTS cash_banks (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL,
    name VARCHAR(255) NOT NULL,
    kind VARCHAR(10) NOT NULL,
    account_id UUID REFERENCES accounts(id),
    balance NUMERIC(20, 2) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_cash_bank_kind CHECK (kind IN ('CASH', 'BANK'))
);

CREATE TABLE IF NOT EXISTS balance_incidents (
    id UUID PRIMARY KEY,
    subledger_id UUID NOT NULL REFERENCES cash_banks(id),
    account_id UUID NOT NULL REFERENCES accounts(id),
    subledger_balance NUMERIC(20, 2) NOT NULL,
    gl_balance NUMERIC(20, 2) NOT NULL,
    difference NUMERIC(20, 2) NOT NULL,
    severity VARCHAR(10) NOT NULL,
    status VARCHAR(10) NOT NULL DEFAULT 'OPEN',
    detected_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    resolved_at TIMESTAMPTZ,
    resolution_note TEXT,
    CONSTRAINT chk_incident_severity CHECK (severity IN ('LOW', 'HIGH', 'CRITICAL')),
    CONSTRAINT chk_incident_status CHECK (status IN ('OPEN', 'RESOLVED'))
);
";

const INDEXES_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_accounts_parent ON accounts (parent_id) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_accounts_code_lower ON accounts (LOWER(TRIM(code)));
CREATE INDEX IF NOT EXISTS idx_journal_lines_account ON journal_lines (account_id);
CREATE INDEX IF NOT EXISTS idx_journal_entries_status ON journal_entries (status);
CREATE UNIQUE INDEX IF NOT EXISTS idx_cash_banks_account_live
    ON cash_banks (account_id) WHERE deleted_at IS NULL AND account_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_balance_incidents_open
    ON balance_incidents (subledger_id) WHERE status = 'OPEN';
";

/// Locks code, type, category, status and deletion of critical accounts.
/// A merge transaction sets `ledgerkeep.merge` to fold critical duplicates.
const CRITICAL_ACCOUNT_TRIGGER_SQL: &str = r"
CREATE OR REPLACE FUNCTION protect_critical_account()
RETURNS TRIGGER AS $$
BEGIN
    IF NOT OLD.is_system_critical THEN
        RETURN NEW;
    END IF;
    IF current_setting('ledgerkeep.merge', true) IS NOT DISTINCT FROM 'on' THEN
        RETURN NEW;
    END IF;
    IF NEW.code IS DISTINCT FROM OLD.code
        OR NEW.account_type IS DISTINCT FROM OLD.account_type
        OR NEW.category IS DISTINCT FROM OLD.category
        OR NEW.is_active IS DISTINCT FROM OLD.is_active
        OR NEW.deleted_at IS DISTINCT FROM OLD.deleted_at THEN
        RAISE EXCEPTION 'Account % is system critical', OLD.code
            USING ERRCODE = 'check_violation';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS trg_protect_critical_account ON accounts;
CREATE TRIGGER trg_protect_critical_account
    BEFORE UPDATE ON accounts
    FOR EACH ROW EXECUTE FUNCTION protect_critical_account();
";

const DROP_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_prevent_duplicate_account_code ON accounts;
DROP FUNCTION IF EXISTS prevent_duplicate_account_code();
DROP TRIGGER IF EXISTS trg_protect_critical_account ON accounts;
DROP FUNCTION IF EXISTS protect_critical_account();
DROP TABLE IF EXISTS balance_incidents CASCADE;
DROP TABLE IF EXISTS cash_banks CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
";
