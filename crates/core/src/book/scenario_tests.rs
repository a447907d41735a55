//! End-to-end scenarios against an in-process book.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use ledgerkeep_shared::types::AccountId;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::engine::LedgerBook;
use super::observer::LedgerObserver;
use crate::chart::{Account, AccountPatch, AccountType, MERGED_MARKER, NewAccount};
use crate::dedup::{GroupOutcome, MergeSummary};
use crate::ledger::{JournalStatus, LedgerError, NewJournalEntry, NewJournalLine};
use crate::subledger::{
    BridgeConfig, DriftIncident, DriftSeverity, IntegrityStatus, NewSubledger, SubledgerKind,
    SyncOutcome,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
}

struct Fixture {
    book: LedgerBook,
    assets: AccountId,
    cash: AccountId,
    revenue: AccountId,
}

fn fixture() -> Fixture {
    let mut book = LedgerBook::default();
    let assets = book
        .create_account(NewAccount::new("1000", "Assets", AccountType::Asset).header())
        .unwrap()
        .id;
    let cash = book
        .create_account(NewAccount::new("1100", "Cash", AccountType::Asset).under("1000"))
        .unwrap()
        .id;
    let revenue = book
        .create_account(NewAccount::new("4000", "Revenue", AccountType::Revenue))
        .unwrap()
        .id;
    Fixture {
        book,
        assets,
        cash,
        revenue,
    }
}

fn sale(number: &str, debit: AccountId, credit: AccountId, amount: Decimal) -> NewJournalEntry {
    NewJournalEntry::new(number, date())
        .with_source("SALE", number)
        .line(NewJournalLine::debit(debit, amount))
        .line(NewJournalLine::credit(credit, amount))
}

fn legacy(code: &str, created_at: chrono::DateTime<Utc>) -> Account {
    Account {
        id: AccountId::new(),
        code: code.into(),
        name: format!("Legacy {code}"),
        description: None,
        account_type: AccountType::Asset,
        category: "ASSET".into(),
        parent_id: None,
        level: 1,
        is_header: false,
        balance: Decimal::ZERO,
        is_active: true,
        is_system_critical: false,
        created_at,
        updated_at: created_at,
        deleted_at: None,
    }
}

fn balance(book: &LedgerBook, id: AccountId) -> Decimal {
    book.chart().get(id).unwrap().balance
}

#[derive(Default)]
struct Recorder {
    drifts: Mutex<Vec<DriftIncident>>,
    merges: Mutex<Vec<MergeSummary>>,
}

impl LedgerObserver for Recorder {
    fn on_drift(&self, incident: &DriftIncident) {
        self.drifts.lock().push(incident.clone());
    }

    fn on_merge(&self, summary: &MergeSummary) {
        self.merges.lock().push(summary.clone());
    }
}

#[test]
fn test_post_updates_leaves_and_header() {
    let Fixture {
        mut book,
        assets,
        cash,
        revenue,
    } = fixture();

    let result = book.post_entry(sale("JE-001", cash, revenue, dec!(100))).unwrap();

    assert_eq!(balance(&book, cash), dec!(100));
    assert_eq!(balance(&book, revenue), dec!(100));
    assert_eq!(balance(&book, assets), dec!(100));
    assert_eq!(result.entry.status, JournalStatus::Posted);
    assert!(result.entry.posted_at.is_some());
    assert_eq!(result.updated_ancestors, vec![assets]);
}

#[test]
fn test_unbalanced_post_changes_nothing() {
    let Fixture {
        mut book,
        cash,
        revenue,
        ..
    } = fixture();

    let err = book
        .post_entry(
            NewJournalEntry::new("JE-002", date())
                .line(NewJournalLine::debit(cash, dec!(100)))
                .line(NewJournalLine::credit(revenue, dec!(90))),
        )
        .unwrap_err();

    assert!(matches!(err, LedgerError::Unbalanced { .. }));
    assert!(book.journal().is_empty());
    assert_eq!(balance(&book, cash), Decimal::ZERO);
}

#[test]
fn test_header_target_rejected() {
    let Fixture {
        mut book,
        assets,
        revenue,
        ..
    } = fixture();

    let err = book
        .post_entry(sale("JE-003", assets, revenue, dec!(10)))
        .unwrap_err();
    assert_eq!(err, LedgerError::HeaderAccountTarget(assets));
}

#[test]
fn test_most_used_duplicate_becomes_primary() {
    let mut book = LedgerBook::default();
    let now = Utc::now();
    let older = legacy("1101", now - Duration::days(10));
    let busier = legacy("1101", now);
    let (older_id, busier_id) = (older.id, busier.id);
    book.import_account(older).unwrap();
    book.import_account(busier).unwrap();
    let revenue = book
        .create_account(NewAccount::new("4000", "Revenue", AccountType::Revenue))
        .unwrap()
        .id;

    for n in 0..5 {
        book.post_entry(sale(&format!("A-{n}"), older_id, revenue, dec!(1)))
            .unwrap();
    }
    for n in 0..12 {
        book.post_entry(sale(&format!("B-{n}"), busier_id, revenue, dec!(1)))
            .unwrap();
    }

    let report = book.resolve_duplicates(None);

    assert_eq!(report.groups_found, 1);
    let summary = report.summaries().next().unwrap();
    assert_eq!(summary.primary, busier_id);
    assert_eq!(summary.merged, vec![older_id]);
    assert_eq!(summary.lines_repointed, 5);
    assert_eq!(balance(&book, busier_id), dec!(17));
    assert!(report.guard_installed);
}

#[test]
fn test_merge_moves_lines_and_binding() {
    let recorder = Arc::new(Recorder::default());
    let mut book = LedgerBook::default().with_observer(recorder.clone());
    let now = Utc::now();
    let primary = legacy("1102", now - Duration::days(1));
    let duplicate = legacy("1102", now);
    let (primary_id, duplicate_id) = (primary.id, duplicate.id);
    book.import_account(primary).unwrap();
    book.import_account(duplicate).unwrap();
    let revenue = book
        .create_account(NewAccount::new("4000", "Revenue", AccountType::Revenue))
        .unwrap()
        .id;

    for n in 0..5 {
        book.post_entry(sale(&format!("P-{n}"), primary_id, revenue, dec!(10)))
            .unwrap();
    }
    for n in 0..3 {
        book.post_entry(sale(&format!("D-{n}"), duplicate_id, revenue, dec!(7)))
            .unwrap();
    }
    let bank = book
        .register_subledger(
            NewSubledger::new("BCA", "BCA Operating", SubledgerKind::Bank)
                .bound_to(duplicate_id)
                .with_balance(dec!(21)),
        )
        .unwrap();

    let report = book.resolve_duplicates(Some("1102"));

    let summary = report.summaries().next().unwrap();
    assert_eq!(summary.primary, primary_id);
    assert_eq!(summary.lines_repointed, 3);
    assert_eq!(summary.subledgers_repointed, 1);
    assert_eq!(balance(&book, primary_id), dec!(71));
    assert_eq!(book.journal().posted_line_count(primary_id), 8);
    assert_eq!(book.journal().posted_line_count(duplicate_id), 0);
    assert_eq!(book.bridge().get(bank.id).unwrap().account_id, Some(primary_id));

    let merged = book.chart().get(duplicate_id).unwrap();
    assert!(merged.is_deleted());
    assert!(!merged.is_active);
    assert!(merged.name.ends_with(MERGED_MARKER));
    assert_eq!(book.journal_balance(primary_id).unwrap(), dec!(71));
    assert_eq!(recorder.merges.lock().len(), 1);
    // Scoped runs leave the guard alone.
    assert!(!report.guard_installed);
}

#[test]
fn test_failed_group_is_rolled_back() {
    let mut book = LedgerBook::default();
    let now = Utc::now();
    let a = legacy("1103", now - Duration::hours(2));
    let b = legacy("1103", now);
    let (a_id, b_id) = (a.id, b.id);
    book.import_account(a).unwrap();
    book.import_account(b).unwrap();
    book.register_subledger(NewSubledger::new("C1", "Till 1", SubledgerKind::Cash).bound_to(a_id))
        .unwrap();
    book.register_subledger(NewSubledger::new("C2", "Till 2", SubledgerKind::Cash).bound_to(b_id))
        .unwrap();

    let report = book.resolve_duplicates(None);

    assert_eq!(report.failed_count(), 1);
    assert!(matches!(
        &report.outcomes[0],
        GroupOutcome::Failed { error_code, .. } if error_code == "MERGE_CONFLICT"
    ));
    assert!(!book.chart().get(a_id).unwrap().is_deleted());
    assert!(!book.chart().get(b_id).unwrap().is_deleted());
    assert!(!report.guard_installed);
    assert!(!book.chart().code_guard_installed());
}

#[test]
fn test_second_reversal_rejected() {
    let Fixture {
        mut book,
        assets,
        cash,
        revenue,
    } = fixture();
    let posted = book.post_entry(sale("JE-010", cash, revenue, dec!(40))).unwrap();
    let id = posted.entry.id;

    let reversal = book.reverse_entry(id, "customer refund").unwrap();
    let err = book.reverse_entry(id, "again").unwrap_err();

    assert_eq!(err, LedgerError::AlreadyReversed(id));
    assert_eq!(reversal.entry.entry_number, "REV-JE-010");
    assert_eq!(reversal.entry.reversed_from, Some(id));
    let original = book.journal().get(id).unwrap();
    assert_eq!(original.status, JournalStatus::Reversed);
    assert_eq!(original.reversed_by, Some(reversal.entry.id));
    assert_eq!(original.reversal_reason.as_deref(), Some("customer refund"));
    assert_eq!(balance(&book, cash), Decimal::ZERO);
    assert_eq!(balance(&book, revenue), Decimal::ZERO);
    assert_eq!(balance(&book, assets), Decimal::ZERO);
}

#[test]
fn test_reverse_draft_is_not_posted() {
    let Fixture {
        mut book,
        cash,
        revenue,
        ..
    } = fixture();
    let draft = book.create_draft(sale("JE-011", cash, revenue, dec!(5))).unwrap();

    let err = book.reverse_entry(draft.id, "oops").unwrap_err();
    assert_eq!(err, LedgerError::NotPosted(draft.id));
}

#[test]
fn test_draft_lifecycle() {
    let Fixture {
        mut book,
        cash,
        revenue,
        ..
    } = fixture();

    let draft = book.create_draft(sale("JE-020", cash, revenue, dec!(30))).unwrap();
    assert_eq!(draft.status, JournalStatus::Draft);
    assert!(draft.posted_at.is_none());
    assert_eq!(balance(&book, cash), Decimal::ZERO);

    let posted = book.post_draft(draft.id).unwrap();
    assert_eq!(posted.entry.id, draft.id);
    assert_eq!(posted.entry.status, JournalStatus::Posted);
    assert_eq!(balance(&book, cash), dec!(30));

    let err = book.post_draft(draft.id).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    let err = book.discard_draft(draft.id).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidEntry(_)));

    let other = book.create_draft(sale("JE-021", cash, revenue, dec!(1))).unwrap();
    book.discard_draft(other.id).unwrap();
    assert!(book.journal().get(other.id).is_none());
    assert!(!book.journal().contains_number("JE-021"));
}

#[test]
fn test_drift_recorded_without_touching_gl() {
    let recorder = Arc::new(Recorder::default());
    let Fixture {
        book,
        cash,
        revenue,
        ..
    } = fixture();
    let mut book = book.with_observer(recorder.clone());
    let petty = book
        .register_subledger(NewSubledger::new("PETTY", "Petty cash", SubledgerKind::Cash).bound_to(cash))
        .unwrap();

    let result = book.post_entry(sale("JE-030", cash, revenue, dec!(50))).unwrap();

    assert!(matches!(
        result.subledger_outcomes[..],
        [SyncOutcome::DriftRecorded { .. }]
    ));
    assert_eq!(book.bridge().get(petty.id).unwrap().balance, Decimal::ZERO);
    assert_eq!(balance(&book, cash), dec!(50));
    assert_eq!(recorder.drifts.lock().len(), 1);
    assert_eq!(recorder.drifts.lock()[0].severity, DriftSeverity::Low);
    assert_eq!(book.validate_integrity().status, IntegrityStatus::Warning);

    let outcome = book.on_subledger_balance_changed(petty.id, dec!(50)).unwrap();
    assert_eq!(outcome, SyncOutcome::InSync { subledger_id: petty.id });
    assert_eq!(balance(&book, cash), dec!(50));

    let outcome = book.on_subledger_balance_changed(petty.id, dec!(45)).unwrap();
    assert!(matches!(outcome, SyncOutcome::DriftRecorded { .. }));
    assert_eq!(book.bridge().open_incidents().count(), 1);

    let reconciled = book.reconcile_subledger(petty.id, "counted till").unwrap();
    assert_eq!(reconciled.reconciled_balance, dec!(50));
    assert_eq!(book.bridge().open_incidents().count(), 0);
    assert_eq!(book.validate_integrity().status, IntegrityStatus::Ok);
}

#[test]
fn test_auto_sync_follows_gl() {
    let config = BridgeConfig {
        auto_sync_enabled: true,
        ..BridgeConfig::default()
    };
    let mut book = LedgerBook::new(config, crate::chart::HierarchyConfig::default());
    let cash = book
        .create_account(NewAccount::new("1100", "Cash", AccountType::Asset))
        .unwrap()
        .id;
    let revenue = book
        .create_account(NewAccount::new("4000", "Revenue", AccountType::Revenue))
        .unwrap()
        .id;
    let petty = book
        .register_subledger(NewSubledger::new("PETTY", "Petty cash", SubledgerKind::Cash).bound_to(cash))
        .unwrap();

    let result = book.post_entry(sale("JE-040", cash, revenue, dec!(12.5))).unwrap();

    assert!(matches!(
        result.subledger_outcomes[..],
        [SyncOutcome::Synced { .. }]
    ));
    assert_eq!(book.bridge().get(petty.id).unwrap().balance, dec!(12.5));
}

#[test]
fn test_bound_account_cannot_become_header() {
    let Fixture { mut book, cash, .. } = fixture();
    book.register_subledger(NewSubledger::new("PETTY", "Petty cash", SubledgerKind::Cash).bound_to(cash))
        .unwrap();

    let err = book
        .create_account(NewAccount::new("1110", "Till", AccountType::Asset).under("1100"))
        .unwrap_err();
    assert_eq!(err, LedgerError::AccountIsHeader(cash));

    let err = book
        .update_account(
            cash,
            AccountPatch {
                is_header: Some(true),
                ..AccountPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err, LedgerError::AccountIsHeader(cash));

    let err = book.delete_account(cash).unwrap_err();
    assert!(matches!(err, LedgerError::AccountAlreadyBound { .. }));
}

#[test]
fn test_posted_account_cannot_be_deleted() {
    let Fixture {
        mut book,
        assets,
        cash,
        revenue,
    } = fixture();
    let posted = book.post_entry(sale("JE-040", cash, revenue, dec!(100))).unwrap();

    assert_eq!(book.delete_account(cash).unwrap_err(), LedgerError::HasPostings(cash));
    assert_eq!(balance(&book, assets), dec!(100));

    book.reverse_entry(posted.entry.id, "wrong till").unwrap();
    assert_eq!(balance(&book, cash), Decimal::ZERO);

    // Reversed lines still count as history.
    assert_eq!(book.delete_account(cash).unwrap_err(), LedgerError::HasPostings(cash));
    assert!(!book.chart().get(cash).unwrap().is_deleted());
}

#[test]
fn test_subledger_compares_against_journal_balance() {
    let Fixture { mut book, .. } = fixture();
    let mut imported = legacy("1190", Utc::now());
    imported.balance = dec!(500);
    let bank = imported.id;
    book.import_account(imported).unwrap();
    let record = book
        .register_subledger(NewSubledger::new("BCA", "BCA", SubledgerKind::Bank).bound_to(bank))
        .unwrap();

    let outcome = book.on_subledger_balance_changed(record.id, Decimal::ZERO).unwrap();
    assert!(matches!(outcome, SyncOutcome::InSync { .. }));

    let reconciled = book.reconcile_subledger(record.id, "bank statement").unwrap();
    assert_eq!(reconciled.reconciled_balance, Decimal::ZERO);
    assert_eq!(book.validate_integrity().status, IntegrityStatus::Ok);
}

#[test]
fn test_type_change_recomputes_from_journal() {
    let Fixture {
        mut book,
        cash,
        revenue,
        ..
    } = fixture();
    let other = book
        .create_account(NewAccount::new("2100", "Payable", AccountType::Asset))
        .unwrap()
        .id;
    book.post_entry(sale("JE-050", other, revenue, dec!(20))).unwrap();
    assert_eq!(balance(&book, other), dec!(20));

    book.update_account(
        other,
        AccountPatch {
            account_type: Some(AccountType::Liability),
            ..AccountPatch::default()
        },
    )
    .unwrap();

    assert_eq!(balance(&book, other), dec!(-20));
    assert_eq!(balance(&book, cash), Decimal::ZERO);
}

#[test]
fn test_reparent_moves_balance_between_headers() {
    let Fixture {
        mut book,
        assets,
        cash,
        revenue,
    } = fixture();
    let current = book
        .create_account(NewAccount::new("1500", "Current assets", AccountType::Asset).header())
        .unwrap()
        .id;
    book.post_entry(sale("JE-060", cash, revenue, dec!(80))).unwrap();

    let moved = book.reparent("1100", "1500").unwrap();

    assert_eq!(moved.parent_id, Some(current));
    assert_eq!(moved.level, 2);
    assert_eq!(balance(&book, current), dec!(80));
    assert_eq!(balance(&book, assets), Decimal::ZERO);
    assert!(book.validate_hierarchy().is_valid());
}

#[test]
fn test_guard_blocks_new_duplicates_after_resolution() {
    let mut book = LedgerBook::default();
    let now = Utc::now();
    book.import_account(legacy("1104", now - Duration::minutes(5)))
        .unwrap();
    book.import_account(legacy("1104", now)).unwrap();

    let report = book.resolve_duplicates(None);
    assert!(report.guard_installed);
    assert_eq!(book.install_code_guard(), Ok(false));

    let err = book.import_account(legacy("1104", now)).unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateCode { .. }));
}
