// 📤 Submission Workflow - Brand submissions, corporate approval, approved set
//
// The ledger is one JSON document: submissions, the rows frozen under each
// submission, the approved rows, and the per-brand workflow state.
//
// Eligibility is never cached. submit() recomputes variances from the raw
// rows and the mapping snapshot on every call.
//
// Saves go to "<file>.tmp" first and are renamed over the ledger, so a crash
// mid-write leaves the previous ledger intact. Mutations are built on a copy
// and adopted only once that copy is on disk.

use crate::entities::{ApprovedRow, RawFinancialRow, SubmissionRow};
use crate::error::{HarmonizeError, Result};
use crate::governance::GovernanceSnapshot;
use crate::reconciliation::{aggregate_corporate_view, rows_for_brand, CorporateViewRow, PreviewSummary, SubmissionGate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// WORKFLOW STATE MACHINE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Draft,
    Ready,
    Blocked,
    Submitted,
    Approved,
    Rejected,
}

impl WorkflowState {
    pub fn allowed_transitions(&self) -> &'static [WorkflowState] {
        use WorkflowState::*;
        match self {
            Draft => &[Ready, Blocked, Submitted],
            Ready => &[Blocked, Submitted],
            Blocked => &[Ready, Draft],
            Submitted => &[Approved, Rejected],
            Approved => &[],
            Rejected => &[Draft, Ready],
        }
    }

    pub fn can_transition_to(&self, next: WorkflowState) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Draft => "DRAFT",
            WorkflowState::Ready => "READY",
            WorkflowState::Blocked => "BLOCKED",
            WorkflowState::Submitted => "SUBMITTED",
            WorkflowState::Approved => "APPROVED",
            WorkflowState::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from_state: WorkflowState,
    pub to_state: WorkflowState,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,

    /// System transitions skip validation
    pub auto: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandWorkflow {
    pub brand: String,
    pub state: WorkflowState,
    pub transitions: Vec<Transition>,
}

impl BrandWorkflow {
    pub fn new(brand: &str) -> Self {
        BrandWorkflow {
            brand: brand.to_string(),
            state: WorkflowState::Draft,
            transitions: Vec::new(),
        }
    }

    /// Validated transition; moving to the current state is a no-op
    pub fn transition(&mut self, next: WorkflowState, actor: &str, reason: Option<&str>) -> Result<()> {
        if self.state != next && !self.state.can_transition_to(next) {
            return Err(HarmonizeError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.record(next, actor, reason, false);
        Ok(())
    }

    /// System transition, never rejected
    pub fn auto_transition(&mut self, next: WorkflowState, reason: &str) {
        self.record(next, "system", Some(reason), true);
    }

    fn record(&mut self, next: WorkflowState, actor: &str, reason: Option<&str>, auto: bool) {
        if self.state == next {
            return;
        }

        debug!(brand = %self.brand, from = %self.state, to = %next, auto, "workflow transition");

        self.transitions.push(Transition {
            from_state: self.state,
            to_state: next,
            actor: actor.to_string(),
            timestamp: Utc::now(),
            reason: reason.map(|r| r.to_string()),
            auto,
        });
        self.state = next;
    }
}

// ============================================================================
// SUBMISSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Submitted,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "SUBMITTED",
            SubmissionStatus::Approved => "APPROVED",
            SubmissionStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub submission_id: String,

    /// Upper-case brand tag
    pub brand: String,

    pub status: SubmissionStatus,
    pub timestamp: DateTime<Utc>,
    pub record_count: usize,

    /// GovernanceSnapshot::fingerprint() the preview was computed under
    pub mapping_fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    Submitted { submission_id: String, record_count: usize },
    Blocked { blocking_count: usize },
    NothingToSubmit,
}

impl SubmissionOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmissionOutcome::Submitted { .. })
    }

    pub fn message(&self) -> String {
        match self {
            SubmissionOutcome::Submitted { submission_id, record_count } => {
                format!("Submitted {} ({} records)", submission_id, record_count)
            }
            SubmissionOutcome::Blocked { blocking_count } => format!(
                "Cannot submit: {} unmapped account(s) or cost center(s) must be resolved first. Please update mappings in Mapping Governance.",
                blocking_count
            ),
            SubmissionOutcome::NothingToSubmit => "No data to submit".to_string(),
        }
    }
}

// ============================================================================
// SUBMISSION LEDGER
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionLedger {
    #[serde(default)]
    submissions: Vec<Submission>,

    #[serde(default)]
    submission_rows: Vec<SubmissionRow>,

    #[serde(default)]
    approved_rows: Vec<ApprovedRow>,

    /// Keyed by lower-case brand
    #[serde(default)]
    workflows: BTreeMap<String, BrandWorkflow>,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl SubmissionLedger {
    /// Ledger that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the ledger at `path`, or start an empty one there
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut ledger = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str::<SubmissionLedger>(&content)?
        } else {
            SubmissionLedger::default()
        };

        ledger.path = Some(path.to_path_buf());
        Ok(ledger)
    }

    /// Write-new-then-rename
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Submit a brand's fully mapped rows
    ///
    /// Blocked while any UNMAPPED_ACCOUNT / UNMAPPED_COST_CENTER variance
    /// exists for the brand; nothing is written in that case.
    pub fn submit(
        &mut self,
        brand: &str,
        rows: &[RawFinancialRow],
        snapshot: &GovernanceSnapshot,
    ) -> Result<SubmissionOutcome> {
        let engine = snapshot.reconciliation();
        let brand_rows = rows_for_brand(rows, brand);

        if let SubmissionGate::Blocked { blocking_count } = engine.submission_gate(brand_rows.iter().copied()) {
            info!(brand, blocking_count, "submission blocked");
            return Ok(SubmissionOutcome::Blocked { blocking_count });
        }

        let preview = engine.preview(brand_rows.iter().copied());
        if preview.is_empty() {
            return Ok(SubmissionOutcome::NothingToSubmit);
        }

        let brand_upper = brand.trim().to_uppercase();
        let submission_id = uuid::Uuid::new_v4().to_string();
        let record_count = preview.len();
        let mapping_fingerprint = snapshot.fingerprint()?;

        self.commit(|ledger| {
            ledger.submissions.push(Submission {
                submission_id: submission_id.clone(),
                brand: brand_upper.clone(),
                status: SubmissionStatus::Submitted,
                timestamp: Utc::now(),
                record_count,
                mapping_fingerprint,
            });

            ledger.submission_rows.extend(preview.into_iter().map(|row| SubmissionRow {
                submission_id: submission_id.clone(),
                brand: brand_upper.clone(),
                source_account: row.source_account,
                unified_account: row.unified_account,
                unified_cost_center: row.unified_cost_center,
                amount: row.amount,
            }));

            ledger
                .workflow_mut(brand)
                .auto_transition(WorkflowState::Submitted, "submitted to corporate");
            Ok(())
        })?;

        info!(brand = %brand_upper, %submission_id, record_count, "submission created");

        Ok(SubmissionOutcome::Submitted {
            submission_id,
            record_count,
        })
    }

    /// Approval copies the submission's rows into the approved set
    /// (replacing any earlier copy); rejection removes them. Moving back to
    /// SUBMITTED leaves the approved set alone.
    pub fn update_status(&mut self, submission_id: &str, status: SubmissionStatus) -> Result<()> {
        self.commit(|ledger| {
            let submission = ledger
                .submissions
                .iter_mut()
                .find(|s| s.submission_id == submission_id)
                .ok_or_else(|| HarmonizeError::SubmissionNotFound(submission_id.to_string()))?;

            submission.status = status;
            let brand = submission.brand.clone();

            match status {
                SubmissionStatus::Approved => {
                    ledger.approved_rows.retain(|r| r.submission_id != submission_id);
                    let approved_at = Utc::now();
                    let copies: Vec<ApprovedRow> = ledger
                        .submission_rows
                        .iter()
                        .filter(|r| r.submission_id == submission_id)
                        .map(|r| ApprovedRow::from_submission_row(r, approved_at))
                        .collect();
                    ledger.approved_rows.extend(copies);
                    ledger
                        .workflow_mut(&brand)
                        .auto_transition(WorkflowState::Approved, "approved by corporate");
                }
                SubmissionStatus::Rejected => {
                    ledger.approved_rows.retain(|r| r.submission_id != submission_id);
                    ledger
                        .workflow_mut(&brand)
                        .auto_transition(WorkflowState::Rejected, "rejected by corporate");
                }
                SubmissionStatus::Submitted => {}
            }
            Ok(())
        })?;

        info!(%submission_id, %status, "submission status updated");
        Ok(())
    }

    pub fn submissions(&self, brand: Option<&str>) -> Vec<&Submission> {
        self.submissions
            .iter()
            .filter(|s| brand.map_or(true, |b| s.brand.eq_ignore_ascii_case(b.trim())))
            .collect()
    }

    pub fn submission_rows(&self, submission_id: &str) -> Vec<&SubmissionRow> {
        self.submission_rows
            .iter()
            .filter(|r| r.submission_id == submission_id)
            .collect()
    }

    pub fn approved_rows(&self, brand: Option<&str>) -> Vec<&ApprovedRow> {
        self.approved_rows
            .iter()
            .filter(|r| brand.map_or(true, |b| r.brand.eq_ignore_ascii_case(b.trim())))
            .collect()
    }

    pub fn corporate_view(&self) -> Vec<CorporateViewRow> {
        aggregate_corporate_view(&self.approved_rows)
    }

    // ========================================================================
    // WORKFLOW STATE
    // ========================================================================

    pub fn workflow_state(&self, brand: &str) -> WorkflowState {
        self.workflows
            .get(&brand.trim().to_lowercase())
            .map_or(WorkflowState::Draft, |w| w.state)
    }

    pub fn workflow(&self, brand: &str) -> Option<&BrandWorkflow> {
        self.workflows.get(&brand.trim().to_lowercase())
    }

    /// Validated, user-driven transition
    pub fn set_workflow_state(
        &mut self,
        brand: &str,
        next: WorkflowState,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        self.commit(|ledger| ledger.workflow_mut(brand).transition(next, actor, reason))
    }

    /// Move an open (DRAFT / READY / BLOCKED) brand to READY or BLOCKED
    pub fn sync_readiness(&mut self, summary: &PreviewSummary) -> Result<WorkflowState> {
        self.commit(|ledger| {
            let workflow = ledger.workflow_mut(&summary.brand);

            if matches!(
                workflow.state,
                WorkflowState::Draft | WorkflowState::Ready | WorkflowState::Blocked
            ) {
                if summary.blocking_count > 0 {
                    workflow.auto_transition(WorkflowState::Blocked, "blocking variances present");
                } else if summary.can_submit {
                    workflow.auto_transition(WorkflowState::Ready, "all rows mapped");
                }
            }

            Ok(workflow.state)
        })
    }

    /// Run `change` on a copy, save the copy, then adopt it
    fn commit<T>(&mut self, change: impl FnOnce(&mut SubmissionLedger) -> Result<T>) -> Result<T> {
        let mut next = self.clone();
        let value = change(&mut next)?;
        next.save()?;
        *self = next;
        Ok(value)
    }

    fn workflow_mut(&mut self, brand: &str) -> &mut BrandWorkflow {
        let key = brand.trim().to_lowercase();
        self.workflows
            .entry(key)
            .or_insert_with(|| BrandWorkflow::new(&brand.trim().to_uppercase()))
    }

    /// Hard reset: drop all history, keep nothing but the file
    pub fn reset(&mut self) -> Result<Vec<String>> {
        let steps = vec![
            format!("Deleted {} submission record(s)", self.submissions.len()),
            format!("Deleted {} submission row(s)", self.submission_rows.len()),
            format!("Deleted {} approved record(s)", self.approved_rows.len()),
            format!("Reset {} brand workflow(s)", self.workflows.len()),
        ];

        self.commit(|ledger| {
            ledger.submissions.clear();
            ledger.submission_rows.clear();
            ledger.approved_rows.clear();
            ledger.workflows.clear();
            Ok(())
        })?;

        for step in &steps {
            info!("reset: {}", step);
        }
        Ok(steps)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AccountMapping, CostCenterMapping};
    use crate::reconciliation::aggregate_corporate_view;

    fn create_test_snapshot() -> GovernanceSnapshot {
        let mut snapshot = GovernanceSnapshot::default();
        snapshot
            .account_mappings
            .insert("Office Supplies".to_string(), AccountMapping::new("Office Expense", "6000"));
        snapshot
            .account_mappings
            .insert("Rent".to_string(), AccountMapping::new("Occupancy", "6500"));
        snapshot
            .cost_center_mappings
            .insert("CC10".to_string(), CostCenterMapping::new("CC-100", "Operations"));
        snapshot
    }

    fn create_test_rows() -> Vec<RawFinancialRow> {
        vec![
            RawFinancialRow::new("TMH", "Office Supplies", "6100", "CC10", "125.50"),
            RawFinancialRow::new("TMH", "Rent", "6200", "CC10", "1000"),
            RawFinancialRow::new("TMH", "Rent", "6200", "", "40"),
            RawFinancialRow::new("Raymond", "Marketing", "7100", "CC10", "300"),
        ]
    }

    fn submitted_id(outcome: &SubmissionOutcome) -> String {
        match outcome {
            SubmissionOutcome::Submitted { submission_id, .. } => submission_id.clone(),
            other => panic!("expected submission, got {:?}", other),
        }
    }

    #[test]
    fn test_state_machine_transitions() {
        assert!(WorkflowState::Draft.can_transition_to(WorkflowState::Submitted));
        assert!(WorkflowState::Blocked.can_transition_to(WorkflowState::Draft));
        assert!(!WorkflowState::Approved.can_transition_to(WorkflowState::Draft));
        assert!(!WorkflowState::Submitted.can_transition_to(WorkflowState::Ready));
        assert!(WorkflowState::Approved.allowed_transitions().is_empty());
    }

    #[test]
    fn test_invalid_transition_rejected_auto_allowed() {
        let mut workflow = BrandWorkflow::new("TMH");
        workflow.transition(WorkflowState::Submitted, "liam", None).unwrap();

        let err = workflow.transition(WorkflowState::Draft, "liam", None).unwrap_err();
        assert!(matches!(err, HarmonizeError::InvalidTransition { .. }));
        assert_eq!(workflow.state, WorkflowState::Submitted);

        workflow.auto_transition(WorkflowState::Draft, "reset");
        assert_eq!(workflow.state, WorkflowState::Draft);
        assert_eq!(workflow.transitions.len(), 2);
        assert!(workflow.transitions[1].auto);
    }

    #[test]
    fn test_same_state_is_not_logged() {
        let mut workflow = BrandWorkflow::new("TMH");
        workflow.transition(WorkflowState::Draft, "liam", None).unwrap();
        assert!(workflow.transitions.is_empty());
    }

    #[test]
    fn test_submit_clean_brand_returns_record_count() {
        let mut ledger = SubmissionLedger::in_memory();
        let snapshot = create_test_snapshot();
        let rows = create_test_rows();

        let outcome = ledger.submit("tmh", &rows, &snapshot).unwrap();
        match &outcome {
            SubmissionOutcome::Submitted { submission_id, record_count } => {
                assert_eq!(submission_id.len(), 36);
                // empty cost center row is neither flagged nor previewed
                assert_eq!(*record_count, 2);
            }
            other => panic!("expected submission, got {:?}", other),
        }

        let id = submitted_id(&outcome);
        assert_eq!(ledger.submissions(Some("TMH")).len(), 1);
        assert_eq!(ledger.submissions(Some("TMH"))[0].status, SubmissionStatus::Submitted);
        assert_eq!(
            ledger.submissions(None)[0].mapping_fingerprint,
            snapshot.fingerprint().unwrap()
        );
        assert_eq!(ledger.submission_rows(&id).len(), 2);
        assert_eq!(ledger.workflow_state("TMH"), WorkflowState::Submitted);
    }

    #[test]
    fn test_submit_blocked_writes_nothing() {
        let mut ledger = SubmissionLedger::in_memory();
        let outcome = ledger
            .submit("Raymond", &create_test_rows(), &create_test_snapshot())
            .unwrap();

        assert_eq!(outcome, SubmissionOutcome::Blocked { blocking_count: 1 });
        assert!(outcome.message().starts_with("Cannot submit: 1 unmapped"));
        assert!(ledger.submissions(None).is_empty());
    }

    #[test]
    fn test_submit_nothing_to_submit() {
        let mut ledger = SubmissionLedger::in_memory();
        let rows = vec![RawFinancialRow::new("TMH", "Rent", "6200", "", "40")];

        let outcome = ledger.submit("TMH", &rows, &create_test_snapshot()).unwrap();
        assert_eq!(outcome, SubmissionOutcome::NothingToSubmit);
        assert_eq!(outcome.message(), "No data to submit");
    }

    #[test]
    fn test_approve_then_reject() {
        let mut ledger = SubmissionLedger::in_memory();
        let id = submitted_id(&ledger.submit("TMH", &create_test_rows(), &create_test_snapshot()).unwrap());

        ledger.update_status(&id, SubmissionStatus::Approved).unwrap();
        // approving twice replaces, never duplicates
        ledger.update_status(&id, SubmissionStatus::Approved).unwrap();
        assert_eq!(ledger.approved_rows(Some("tmh")).len(), 2);
        assert_eq!(ledger.workflow_state("TMH"), WorkflowState::Approved);

        let view = ledger.corporate_view();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].unified_account, "6000");

        ledger.update_status(&id, SubmissionStatus::Rejected).unwrap();
        assert!(ledger.approved_rows(None).is_empty());
        assert!(ledger.corporate_view().is_empty());
    }

    #[test]
    fn test_back_to_submitted_keeps_approved_rows() {
        let mut ledger = SubmissionLedger::in_memory();
        let id = submitted_id(&ledger.submit("TMH", &create_test_rows(), &create_test_snapshot()).unwrap());

        ledger.update_status(&id, SubmissionStatus::Approved).unwrap();
        assert_eq!(ledger.approved_rows(None).len(), 2);

        ledger.update_status(&id, SubmissionStatus::Submitted).unwrap();
        assert_eq!(ledger.submissions(None)[0].status, SubmissionStatus::Submitted);
        assert_eq!(ledger.approved_rows(None).len(), 2);
        assert_eq!(ledger.corporate_view().len(), 2);
    }

    #[test]
    fn test_failed_save_leaves_ledger_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        // parent of the ledger file is a regular file, so every save fails
        let mut ledger = SubmissionLedger::open(blocker.join("submissions.json")).unwrap();
        let result = ledger.submit("TMH", &create_test_rows(), &create_test_snapshot());

        assert!(matches!(result, Err(HarmonizeError::Io(_))));
        assert!(ledger.submissions(None).is_empty());
        assert_eq!(ledger.workflow_state("TMH"), WorkflowState::Draft);

        let summary = create_test_snapshot().reconciliation().preview_summary("TMH", &create_test_rows());
        assert!(ledger.sync_readiness(&summary).is_err());
        assert!(ledger.workflow("TMH").is_none());
    }

    #[test]
    fn test_unknown_submission() {
        let mut ledger = SubmissionLedger::in_memory();
        assert!(matches!(
            ledger.update_status("nope", SubmissionStatus::Approved),
            Err(HarmonizeError::SubmissionNotFound(_))
        ));
    }

    #[test]
    fn test_corporate_view_conserves_approved_amounts() {
        let mut ledger = SubmissionLedger::in_memory();
        let snapshot = create_test_snapshot();
        let rows = vec![
            RawFinancialRow::new("TMH", "Office Supplies", "6100", "CC10", "10.10"),
            RawFinancialRow::new("TMH", "Office Supplies", "6101", "CC10", "20.20"),
            RawFinancialRow::new("Raymond", "Rent", "6200", "CC10", "30.30"),
        ];

        for brand in ["TMH", "Raymond"] {
            let id = submitted_id(&ledger.submit(brand, &rows, &snapshot).unwrap());
            ledger.update_status(&id, SubmissionStatus::Approved).unwrap();
        }

        let approved: Vec<ApprovedRow> = ledger.approved_rows(None).into_iter().cloned().collect();
        let source_total: f64 = approved.iter().map(|r| crate::entities::parse_amount(&r.amount)).sum();
        let view_total: f64 = aggregate_corporate_view(&approved).iter().map(|r| r.amount).sum();
        assert!((source_total - 60.6).abs() < 1e-6);
        assert!((source_total - view_total).abs() < 1e-6);
    }

    #[test]
    fn test_sync_readiness() {
        let mut ledger = SubmissionLedger::in_memory();
        let snapshot = create_test_snapshot();
        let rows = create_test_rows();
        let engine = snapshot.reconciliation();

        let blocked = engine.preview_summary("Raymond", &rows);
        assert_eq!(ledger.sync_readiness(&blocked).unwrap(), WorkflowState::Blocked);

        let ready = engine.preview_summary("TMH", &rows);
        assert_eq!(ledger.sync_readiness(&ready).unwrap(), WorkflowState::Ready);
    }

    #[test]
    fn test_ledger_persists_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("financial").join("submissions.json");
        let snapshot = create_test_snapshot();

        let id = {
            let mut ledger = SubmissionLedger::open(&path).unwrap();
            let id = submitted_id(&ledger.submit("TMH", &create_test_rows(), &snapshot).unwrap());
            ledger.update_status(&id, SubmissionStatus::Approved).unwrap();
            id
        };

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let mut reopened = SubmissionLedger::open(&path).unwrap();
        assert_eq!(reopened.submission_rows(&id).len(), 2);
        assert_eq!(reopened.approved_rows(None).len(), 2);

        let steps = reopened.reset().unwrap();
        assert_eq!(steps[0], "Deleted 1 submission record(s)");
        assert_eq!(steps[2], "Deleted 2 approved record(s)");

        let after = SubmissionLedger::open(&path).unwrap();
        assert!(after.submissions(None).is_empty());
        assert_eq!(after.workflow_state("TMH"), WorkflowState::Draft);
    }
}
