//! The session operations.
//!
//! `SessionManager` composes the mailbox store, the completion client, and
//! the cost engine behind the operations a kiosk client drives. It is
//! generic over the mailbox backend and the completion API so every test
//! can run against the in-memory doubles.
//!
//! Two protocol rules shape everything here:
//!
//! 1. No transition without positive confirmation. A state only advances on
//!    a successful write, a finished completion, or a won delete.
//! 2. Delete is the consumption event. A payment confirmation is only acted
//!    on after this process's delete of the entry returned `true`; a lost
//!    race reads as "not yet paid".

use std::sync::Arc;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use tracing::{debug, info, warn};

use printvendo_econ::{
    completion_cost, estimate_submission, page_count, per_page_rate, print_cost, PricingTable,
};
use printvendo_llm::{CompletionApi, CompletionClient};
use printvendo_mailbox::{EntryRef, FolderRef, Mailbox, MailboxError};
use printvendo_types::{
    format_amount, parse_amount, Amount, ColorMode, CostDetails, EntryName, MachineId,
    MachineSession, PaymentKind, PrintJob, SessionState,
};

use crate::api::{
    ArtifactOutcome, CleanupOutcome, CostReport, PaymentPoll, ResponsePoll, SubmitOutcome,
};
use crate::error::{Result, SessionError};
use crate::store::SessionStore;

/// Orchestrates the per-machine session lifecycle.
pub struct SessionManager<M, A> {
    mailbox: M,
    completions: CompletionClient<A>,
    pricing: PricingTable,
    store: Arc<dyn SessionStore>,
}

impl<M, A> SessionManager<M, A>
where
    M: Mailbox,
    A: CompletionApi,
{
    /// Create a manager with the default pricing table.
    pub fn new(mailbox: M, completions: CompletionClient<A>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            mailbox,
            completions,
            pricing: PricingTable::default(),
            store,
        }
    }

    /// Use a different pricing table.
    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    /// The current session state, `Unregistered` when none exists.
    pub fn session_state(&self, machine: &MachineId) -> SessionState {
        self.store
            .get(machine)
            .map(|s| s.state)
            .unwrap_or(SessionState::Unregistered)
    }

    /// Snapshot of the session record, if one exists.
    pub fn session(&self, machine: &MachineId) -> Option<MachineSession> {
        self.store.get(machine)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Create the machine's mailbox folder (operator tooling).
    ///
    /// Sessions never provision implicitly; this is the out-of-band step
    /// that makes a machine id registerable.
    pub async fn provision_machine(&self, machine: &MachineId) -> Result<()> {
        self.mailbox.provision(machine).await?;
        info!(machine = %machine, "machine provisioned");
        Ok(())
    }

    /// Validate the machine id against the mailbox store and open a session.
    ///
    /// Succeeds only when a mailbox folder is pre-provisioned for the id.
    /// Idempotent: repeated calls on a live session leave it unchanged and
    /// skip the store lookup.
    pub async fn register(&self, machine: &MachineId) -> Result<SessionState> {
        if let Some(existing) = self.store.get(machine) {
            if !existing.state.is_initial() {
                debug!(machine = %machine, state = ?existing.state, "already registered");
                return Ok(existing.state);
            }
        }

        self.mailbox.ensure_folder(machine).await?;
        self.store.put(MachineSession::registered(machine.clone()));
        info!(machine = %machine, "machine registered");
        Ok(SessionState::Registered)
    }

    // =========================================================================
    // Content & Generation
    // =========================================================================

    /// Store the prompt (and optional extracted document text) in the
    /// mailbox and quote an estimated cost.
    pub async fn submit_content(
        &self,
        machine: &MachineId,
        prompt: &str,
        document: Option<&str>,
    ) -> Result<SubmitOutcome> {
        let mut session = self.require_session(machine)?;
        if !session.state.can_submit() {
            return Err(SessionError::InvalidTransition {
                operation: "submit_content",
                required: SessionState::Registered,
                actual: session.state,
            });
        }

        let mut content = prompt.trim().to_string();
        if let Some(doc) = document {
            let doc = doc.trim();
            if !doc.is_empty() {
                if !content.is_empty() {
                    content.push_str("\n\n");
                }
                content.push_str(doc);
            }
        }
        if content.is_empty() {
            return Err(SessionError::Validation("prompt must not be empty".into()));
        }

        let folder = self.mailbox.ensure_folder(machine).await?;
        let quote = estimate_submission(&content, &self.pricing);
        let details = quote.to_details(now_stamp(), true);

        self.replace_entry(&folder, &EntryName::Prompt, content.as_bytes())
            .await?;
        self.replace_entry(&folder, &EntryName::CostDetails, &encode_json(&details)?)
            .await?;

        session.prompt = Some(content);
        session.cost = Some(details);
        session.state = SessionState::ContentSubmitted;
        self.store.put(session);

        info!(machine = %machine, estimated = quote.final_cost_minor, "content submitted");
        Ok(SubmitOutcome {
            accepted: true,
            estimated_cost: quote.final_cost_minor,
        })
    }

    /// Drive the prompt through the completion service and publish the
    /// response and the authoritative cost record.
    ///
    /// A concurrent second call observes the claimed state and
    /// short-circuits; the machine is never billed twice for one prompt.
    /// On any failure the session returns to `ContentSubmitted` with
    /// nothing published, so the client may retry.
    pub async fn generate_response(&self, machine: &MachineId) -> Result<CostReport> {
        let claimed = self.store.advance_if(
            machine,
            SessionState::ContentSubmitted,
            SessionState::AwaitingAiResponse,
        );
        let Some(session) = claimed else {
            let actual = self.session_state(machine);
            return Err(SessionError::InvalidTransition {
                operation: "generate_response",
                required: SessionState::ContentSubmitted,
                actual,
            });
        };

        match self.run_generation(machine, session.clone()).await {
            Ok(report) => Ok(report),
            Err(e) => {
                // Roll back the claim; nothing was published.
                let mut session = session;
                session.state = SessionState::ContentSubmitted;
                session.response = None;
                self.store.put(session);
                warn!(machine = %machine, error = %e, "generation failed, session rolled back");
                Err(e)
            }
        }
    }

    async fn run_generation(
        &self,
        machine: &MachineId,
        mut session: MachineSession,
    ) -> Result<CostReport> {
        let prompt = session
            .prompt
            .clone()
            .ok_or_else(|| SessionError::Validation("no prompt stored for session".into()))?;
        let folder = self.mailbox.ensure_folder(machine).await?;

        let completion = self.completions.complete(&prompt).await?;
        session.response = Some(completion.text.clone());
        session.state = SessionState::ResponseReady;
        self.store.put(session.clone());

        // The authoritative record uses the real usage, overriding the
        // pre-submission estimate.
        let cost = completion_cost(
            completion.input_tokens,
            completion.output_tokens,
            &self.pricing,
        );
        let details = cost.to_details(now_stamp(), false);

        self.replace_entry(&folder, &EntryName::Response, completion.text.as_bytes())
            .await?;
        self.replace_entry(&folder, &EntryName::CostDetails, &encode_json(&details)?)
            .await?;

        session.cost = Some(details);
        session.state = SessionState::CostPublished;
        self.store.put(session);

        info!(
            machine = %machine,
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            final_cost = cost.final_cost_minor,
            "response and cost published"
        );
        Ok(CostReport {
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            final_cost: cost.final_cost_minor,
        })
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Publish the amount due as a payment-request entry.
    ///
    /// For the completion charge this requires `CostPublished` and advances
    /// to `AwaitingPayment`. For the print charge a prepared print job is
    /// required; re-requesting re-publishes the same amount.
    pub async fn request_payment(&self, machine: &MachineId, kind: PaymentKind) -> Result<Amount> {
        let mut session = self.require_session(machine)?;
        let amount = match kind {
            PaymentKind::Completion => {
                if !session.state.can_request_payment() {
                    return Err(SessionError::InvalidTransition {
                        operation: "request_payment",
                        required: SessionState::CostPublished,
                        actual: session.state,
                    });
                }
                session
                    .cost
                    .as_ref()
                    .map(|c| c.final_cost_minor)
                    .ok_or_else(|| {
                        SessionError::Validation("no cost record for session".into())
                    })?
            }
            PaymentKind::Print => session
                .print_job
                .as_ref()
                .map(|j| j.total_cost_minor)
                .ok_or_else(|| SessionError::Validation("no print job prepared".into()))?,
        };

        let folder = self.mailbox.ensure_folder(machine).await?;
        self.replace_entry(
            &folder,
            &EntryName::PaymentRequest(kind),
            format_amount(amount).as_bytes(),
        )
        .await?;

        session.payment_requests.record(kind, amount);
        if kind == PaymentKind::Completion {
            session.state = SessionState::AwaitingPayment;
        }
        self.store.put(session);

        info!(machine = %machine, kind = ?kind, amount = %format_amount(amount), "payment requested");
        Ok(amount)
    }

    /// Check for, and consume, a payment confirmation.
    ///
    /// The confirmation's presence is the signal; non-empty content is
    /// corroborated against the requested amount. A confirmation with no
    /// matching request from this session is a stale signal: logged,
    /// rejected, and left unconsumed. The delete is the consumption event;
    /// only the poller whose delete succeeds unlocks, all others keep
    /// reading "not yet paid".
    pub async fn poll_for_payment(
        &self,
        machine: &MachineId,
        kind: PaymentKind,
    ) -> Result<PaymentPoll> {
        let mut session = self.require_session(machine)?;

        // Idempotent re-entry after a reload: the completion charge was
        // already consumed and the session unlocked.
        if kind == PaymentKind::Completion && session.state.is_unlocked() {
            return Ok(PaymentPoll { paid: true });
        }

        let folder = self.mailbox.ensure_folder(machine).await?;
        let confirmation = EntryName::PaymentConfirmation(kind);
        let Some(entry) = self.mailbox.find(&folder, &confirmation).await? else {
            return Ok(PaymentPoll { paid: false });
        };

        let Some(expected) = session.payment_requests.amount(kind) else {
            warn!(
                machine = %machine,
                entry = %entry.name,
                "payment confirmation without a prior request; ignoring"
            );
            return Err(SessionError::StaleSignal(format!(
                "confirmation '{}' has no matching request",
                entry.name
            )));
        };

        if let Some(bytes) = self.mailbox.read(&folder, &confirmation).await? {
            let text = String::from_utf8_lossy(&bytes);
            let trimmed = text.trim();
            if !trimmed.is_empty() && parse_amount(trimmed) != Some(expected) {
                warn!(
                    machine = %machine,
                    found = trimmed,
                    expected = %format_amount(expected),
                    "payment confirmation amount mismatch; ignoring"
                );
                return Err(SessionError::StaleSignal(format!(
                    "confirmation amount '{trimmed}' does not match requested {}",
                    format_amount(expected)
                )));
            }
        }

        if !self.mailbox.delete(&entry).await? {
            // Someone else consumed the entry first. Their session unlocks,
            // not ours.
            debug!(machine = %machine, entry = %entry.name, "lost the consumption race");
            return Ok(PaymentPoll { paid: false });
        }

        if kind == PaymentKind::Completion && session.state.awaiting_payment() {
            session.state = SessionState::PaymentConfirmed;
            self.store.put(session.clone());
            session.state = SessionState::Unlocked;
            self.store.put(session);
        }

        info!(machine = %machine, kind = ?kind, "payment confirmed and consumed");
        Ok(PaymentPoll { paid: true })
    }

    /// The loose legacy convention: the *request* entry exists with empty
    /// content, meaning the terminal blanked it on payment.
    ///
    /// Observation only: this never consumes anything and never advances
    /// state. The canonical signal is the confirmation entry handled by
    /// [`Self::poll_for_payment`].
    pub async fn legacy_payment_satisfied(
        &self,
        machine: &MachineId,
        kind: PaymentKind,
    ) -> Result<bool> {
        self.require_session(machine)?;
        let folder = self.mailbox.ensure_folder(machine).await?;
        match self
            .mailbox
            .read(&folder, &EntryName::PaymentRequest(kind))
            .await?
        {
            Some(bytes) => Ok(String::from_utf8_lossy(&bytes).trim().is_empty()),
            None => Ok(false),
        }
    }

    // =========================================================================
    // Deliverable
    // =========================================================================

    /// Assemble the deliverable in the mailbox: the content file, an
    /// optional client-rendered PDF, the human-readable cost summary, and
    /// the print payment request.
    pub async fn prepare_artifact(
        &self,
        machine: &MachineId,
        content: &str,
        color_mode: ColorMode,
        save_pdf_copy: bool,
        pdf_bytes: Option<&[u8]>,
    ) -> Result<ArtifactOutcome> {
        let mut session = self.require_session(machine)?;
        if !session.state.is_unlocked() {
            return Err(SessionError::InvalidTransition {
                operation: "prepare_artifact",
                required: SessionState::Unlocked,
                actual: session.state,
            });
        }
        if content.trim().is_empty() {
            return Err(SessionError::Validation(
                "print content must not be empty".into(),
            ));
        }

        let folder = self.mailbox.ensure_folder(machine).await?;
        let file_id = generate_file_id();
        let pages = page_count(content);
        let total = print_cost(pages, color_mode, save_pdf_copy);

        let mut references = Vec::new();

        let entry = self
            .mailbox
            .write(
                &folder,
                &EntryName::Artifact(format!("{file_id}.txt")),
                content.as_bytes(),
            )
            .await?;
        references.push(entry.id);

        if let Some(bytes) = pdf_bytes {
            let entry = self
                .mailbox
                .write(&folder, &EntryName::Artifact(format!("{file_id}.pdf")), bytes)
                .await?;
            references.push(entry.id);
        }

        let summary = cost_summary(machine, &file_id, pages, color_mode, save_pdf_copy, total);
        let entry = self
            .replace_entry(&folder, &EntryName::CostSummary, summary.as_bytes())
            .await?;
        references.push(entry.id);

        let entry = self
            .replace_entry(
                &folder,
                &EntryName::PaymentRequest(PaymentKind::Print),
                format_amount(total).as_bytes(),
            )
            .await?;
        references.push(entry.id);

        session.print_job = Some(PrintJob {
            page_count: pages,
            color_mode,
            per_page_rate: per_page_rate(color_mode),
            save_pdf_copy,
            total_cost_minor: total,
        });
        session.payment_requests.record(PaymentKind::Print, total);
        self.store.put(session);

        info!(
            machine = %machine,
            file_id = %file_id,
            pages,
            total = %format_amount(total),
            "deliverable prepared"
        );
        Ok(ArtifactOutcome {
            accepted: true,
            file_id,
            drive_references: references,
            total_cost: total,
        })
    }

    // =========================================================================
    // Read-back
    // =========================================================================

    /// Whether the response is available, and its text when it is.
    /// Idempotent: safe to call on every poll tick.
    pub async fn poll_response(&self, machine: &MachineId) -> Result<ResponsePoll> {
        self.require_session(machine)?;
        let folder = self.mailbox.ensure_folder(machine).await?;
        match self.mailbox.read(&folder, &EntryName::Response).await? {
            Some(bytes) => Ok(ResponsePoll {
                ready: true,
                text: Some(String::from_utf8_lossy(&bytes).into_owned()),
            }),
            None => Ok(ResponsePoll {
                ready: false,
                text: None,
            }),
        }
    }

    /// The stored prompt text, if any.
    pub async fn get_prompt(&self, machine: &MachineId) -> Result<Option<String>> {
        self.require_session(machine)?;
        let folder = self.mailbox.ensure_folder(machine).await?;
        Ok(self
            .mailbox
            .read(&folder, &EntryName::Prompt)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// The latest published cost record, if any.
    pub async fn get_cost_details(&self, machine: &MachineId) -> Result<Option<CostReport>> {
        self.require_session(machine)?;
        let folder = self.mailbox.ensure_folder(machine).await?;
        match self.mailbox.read(&folder, &EntryName::CostDetails).await? {
            Some(bytes) => {
                let details: CostDetails = serde_json::from_slice(&bytes).map_err(|e| {
                    SessionError::Store(MailboxError::InvalidResponse(format!(
                        "unreadable cost record: {e}"
                    )))
                })?;
                Ok(Some(CostReport {
                    input_tokens: details.input_tokens,
                    output_tokens: details.output_tokens,
                    final_cost: details.final_cost_minor,
                }))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Delete every entry under the machine's mailbox folder and reset the
    /// session. Valid from any state; the folder itself is kept.
    pub async fn cleanup_session(&self, machine: &MachineId) -> Result<CleanupOutcome> {
        let folder = self.mailbox.ensure_folder(machine).await?;
        let files_deleted = self.mailbox.purge(&folder).await?;
        self.store.remove(machine);

        info!(machine = %machine, files_deleted, "session cleaned up");
        Ok(CleanupOutcome { files_deleted })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_session(&self, machine: &MachineId) -> Result<MachineSession> {
        self.store.get(machine).ok_or(SessionError::InvalidTransition {
            operation: "session operation",
            required: SessionState::Registered,
            actual: SessionState::Unregistered,
        })
    }

    /// Delete-then-write: the store has no atomic replace, so replacement
    /// is emulated and readers tolerate the brief absence.
    async fn replace_entry(
        &self,
        folder: &FolderRef,
        name: &EntryName,
        bytes: &[u8],
    ) -> Result<EntryRef> {
        if let Some(existing) = self.mailbox.find(folder, name).await? {
            // A false return just means another writer got there first.
            let _ = self.mailbox.delete(&existing).await?;
        }
        Ok(self.mailbox.write(folder, name, bytes).await?)
    }
}

fn now_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn generate_file_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("file_{millis}_{suffix}")
}

fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        SessionError::Store(MailboxError::InvalidResponse(format!(
            "encode mailbox record: {e}"
        )))
    })
}

fn cost_summary(
    machine: &MachineId,
    file_id: &str,
    pages: u32,
    color_mode: ColorMode,
    save_pdf_copy: bool,
    total: Amount,
) -> String {
    let mode = match color_mode {
        ColorMode::Monochrome => "Black & White",
        ColorMode::Color => "Color",
    };
    let mut summary = String::new();
    summary.push_str("Document Cost Summary\n");
    summary.push_str("-----------------------\n");
    summary.push_str(&format!("File ID: {file_id}\n"));
    summary.push_str(&format!("Machine ID: {machine}\n"));
    summary.push_str(&format!("Timestamp: {}\n", now_stamp()));
    summary.push_str(&format!("Total Pages: {pages}\n"));
    summary.push_str(&format!("Print Type: {mode}\n"));
    summary.push_str(&format!(
        "Cost per Page: {}\n",
        format_amount(per_page_rate(color_mode))
    ));
    if save_pdf_copy {
        summary.push_str("PDF Copy: yes\n");
    }
    summary.push_str(&format!("Total Cost: {}\n", format_amount(total)));
    summary.push_str("-----------------------");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_file_id_shape() {
        let id = generate_file_id();
        assert!(id.starts_with("file_"));
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn test_generate_file_id_unique() {
        let a = generate_file_id();
        let b = generate_file_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_cost_summary_contents() {
        let machine = MachineId::new("kiosk-07").unwrap();
        let summary = cost_summary(&machine, "file_1_abc", 3, ColorMode::Color, true, 1700);
        assert!(summary.contains("Machine ID: kiosk-07"));
        assert!(summary.contains("Total Pages: 3"));
        assert!(summary.contains("Print Type: Color"));
        assert!(summary.contains("Cost per Page: 5.00"));
        assert!(summary.contains("PDF Copy: yes"));
        assert!(summary.contains("Total Cost: 17.00"));
    }
}
