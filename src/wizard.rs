//! Manual UPI payment flow: `details -> qr -> transaction`.
//!
//! Success is an outcome overlaid on the last step, not a fourth step. Cancel
//! leaves the flow entirely and is only offered before transaction entry.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Details,
    Qr,
    Transaction,
}

impl WizardStep {
    pub fn as_str(self) -> &'static str {
        match self {
            WizardStep::Details => "details",
            WizardStep::Qr => "qr",
            WizardStep::Transaction => "transaction",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WizardOutcome {
    #[serde(rename_all = "camelCase")]
    Succeeded {
        transaction_id: String,
        message: Option<String>,
        receipt_number: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Cancelled { at_step: WizardStep },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("cannot {action} from the {from} step")]
    InvalidTransition {
        from: WizardStep,
        action: &'static str,
    },
    #[error("transaction id is required")]
    EmptyTransactionId,
    #[error("payment flow has already finished")]
    Finished,
}

impl WizardError {
    pub fn code(&self) -> &'static str {
        match self {
            WizardError::InvalidTransition { .. } => "invalid_transition",
            WizardError::EmptyTransactionId => "bad_params",
            WizardError::Finished => "wizard_finished",
        }
    }
}

/// What the student is paying for. Amount is in rupees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    pub student_name: String,
    #[serde(default)]
    pub regd_no: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub purpose: String,
}

#[derive(Debug, Clone)]
pub struct PaymentWizard {
    order: PaymentOrder,
    step: WizardStep,
    outcome: Option<WizardOutcome>,
    last_error: Option<String>,
}

impl PaymentWizard {
    pub fn new(order: PaymentOrder) -> Self {
        Self {
            order,
            step: WizardStep::Details,
            outcome: None,
            last_error: None,
        }
    }

    pub fn order(&self) -> &PaymentOrder {
        &self.order
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn outcome(&self) -> Option<&WizardOutcome> {
        self.outcome.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.is_finished() {
            return Err(WizardError::Finished);
        }
        Ok(())
    }

    fn move_to(
        &mut self,
        expected: WizardStep,
        next: WizardStep,
        action: &'static str,
    ) -> Result<WizardStep, WizardError> {
        self.ensure_open()?;
        if self.step != expected {
            return Err(WizardError::InvalidTransition {
                from: self.step,
                action,
            });
        }
        self.step = next;
        self.last_error = None;
        Ok(next)
    }

    /// "Proceed to Payment".
    pub fn proceed(&mut self) -> Result<WizardStep, WizardError> {
        self.move_to(WizardStep::Details, WizardStep::Qr, "proceed")
    }

    /// "Continue" after the QR code has been shown.
    pub fn continue_to_transaction(&mut self) -> Result<WizardStep, WizardError> {
        self.move_to(WizardStep::Qr, WizardStep::Transaction, "continue")
    }

    // Only qr -> details. Transaction entry has no back edge.
    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.move_to(WizardStep::Qr, WizardStep::Details, "go back")
    }

    pub fn cancel(&mut self) -> Result<WizardOutcome, WizardError> {
        self.ensure_open()?;
        match self.step {
            WizardStep::Details | WizardStep::Qr => {
                let outcome = WizardOutcome::Cancelled { at_step: self.step };
                self.outcome = Some(outcome.clone());
                Ok(outcome)
            }
            WizardStep::Transaction => Err(WizardError::InvalidTransition {
                from: self.step,
                action: "cancel",
            }),
        }
    }

    /// Guard run before any submit request. Returns the trimmed transaction id
    /// to send; nothing is sent when this fails.
    pub fn begin_submit(&self, transaction_id: &str) -> Result<String, WizardError> {
        self.ensure_open()?;
        if self.step != WizardStep::Transaction {
            return Err(WizardError::InvalidTransition {
                from: self.step,
                action: "submit",
            });
        }
        let trimmed = transaction_id.trim();
        if trimmed.is_empty() {
            return Err(WizardError::EmptyTransactionId);
        }
        Ok(trimmed.to_string())
    }

    pub fn record_acceptance(
        &mut self,
        transaction_id: String,
        message: Option<String>,
        receipt_number: Option<String>,
    ) -> &WizardOutcome {
        self.last_error = None;
        self.outcome.insert(WizardOutcome::Succeeded {
            transaction_id,
            message,
            receipt_number,
        })
    }

    /// Backend refused the submission. The step stays on transaction entry.
    pub fn record_rejection(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }
}
