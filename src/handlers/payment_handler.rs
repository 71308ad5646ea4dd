//! Payment Handler
//!
//! Submits a payment initiation under a payments consent. The initial
//! status is decided once by the status policy from the risk decision and
//! the requested execution date; funds are reserved only when the status
//! requires settlement now.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::consent::ConsentAuthorizer;
use crate::domain::{Amount, CoreError, Currency, DomainEvent, OperationContext};
use crate::model::{Payment, PaymentStatus};
use crate::policy;
use crate::ports::{EventPublisher, FundsReservation, PaymentInitiation, Ports, RiskAssessment};
use crate::store::{IdempotencyStore, Tables};

use super::{content_digest, request_fingerprint, run_idempotent, Idempotent, PaymentCommand};

const PAYMENTS_SCOPE: &str = "payments";

/// Handler for payment initiations
pub struct PaymentHandler {
    idempotency: Arc<IdempotencyStore>,
    authorizer: ConsentAuthorizer,
    tables: Arc<Tables>,
    risk: Arc<dyn RiskAssessment>,
    funds: Arc<dyn FundsReservation>,
    events: Arc<dyn EventPublisher>,
    require_signature: bool,
}

impl PaymentHandler {
    pub fn new(
        idempotency: Arc<IdempotencyStore>,
        authorizer: ConsentAuthorizer,
        tables: Arc<Tables>,
        ports: &Ports,
        require_signature: bool,
    ) -> Self {
        Self {
            idempotency,
            authorizer,
            tables,
            risk: ports.risk.clone(),
            funds: ports.funds.clone(),
            events: ports.events.clone(),
            require_signature,
        }
    }

    /// Execute the payment command
    pub async fn execute(
        &self,
        command: PaymentCommand,
        signature: Option<&str>,
        idempotency_key: &str,
        context: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<Idempotent<Payment>, CoreError> {
        // integrity check runs before any store is touched
        if self.require_signature {
            self.verify_signature(&command, signature)?;
        }

        let request_hash = request_fingerprint(&command, context.interaction_id)?;

        run_idempotent(
            &self.idempotency,
            idempotency_key,
            context,
            request_hash,
            now,
            || self.submit(command, context, now),
        )
        .await
    }

    fn verify_signature(
        &self,
        command: &PaymentCommand,
        signature: Option<&str>,
    ) -> Result<(), CoreError> {
        let provided = signature.ok_or_else(|| {
            CoreError::InvalidRequest("Missing x-payload-signature header".into())
        })?;
        let expected = content_digest(command)?;
        if provided != expected {
            return Err(CoreError::InvalidRequest(
                "Payload signature does not match request body".into(),
            ));
        }
        Ok(())
    }

    async fn submit(
        &self,
        command: PaymentCommand,
        context: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<Payment, CoreError> {
        self.authorizer.authorize(
            &command.consent_id,
            PAYMENTS_SCOPE,
            &command.debtor_account,
            &context.participant_id,
            now,
        )?;

        let amount: Amount = command
            .amount
            .parse()
            .map_err(|e| CoreError::InvalidRequest(format!("Invalid amount: {}", e)))?;
        let currency = Currency::new(&command.currency)
            .map_err(|e| CoreError::InvalidRequest(format!("Invalid currency: {}", e)))?;

        if command.debtor_account == command.creditor_account {
            return Err(CoreError::InvalidRequest(
                "Debtor and creditor account must differ".into(),
            ));
        }

        let initiation = PaymentInitiation {
            participant_id: context.participant_id.clone(),
            debtor_account: command.debtor_account.clone(),
            creditor_account: command.creditor_account.clone(),
            amount: amount.value(),
            currency: currency.clone(),
            execution_date: command.execution_date,
        };
        let decision = self.risk.assess(&initiation).await;

        let status = policy::payment_initial_status(now, command.execution_date, &decision);
        let payment_id = Uuid::new_v4();

        // side effects implied by the computed status, before persistence
        if status == PaymentStatus::SettlementInProcess {
            let reserved = self
                .funds
                .reserve(
                    &command.debtor_account,
                    amount.value(),
                    &currency,
                    &payment_id.to_string(),
                )
                .await;
            if !reserved {
                return Err(CoreError::BusinessRuleViolation(
                    "Funds reservation declined".into(),
                ));
            }
        }

        let payment = Payment {
            id: payment_id,
            participant_id: context.participant_id.clone(),
            consent_id: command.consent_id,
            debtor_account: command.debtor_account,
            creditor_account: command.creditor_account,
            amount: amount.value(),
            currency: currency.clone(),
            status,
            execution_date: policy::effective_execution_date(now, command.execution_date),
            remittance_info: command.remittance_info,
            created_at: now,
            updated_at: now,
        };

        self.tables.insert_payment(&payment);
        self.events
            .publish(DomainEvent::PaymentInitiated {
                payment_id: payment.id,
                participant_id: payment.participant_id.clone(),
                status: payment.status.to_string(),
                amount: payment.amount,
                currency: currency.as_str().to_string(),
                occurred_at: now,
            })
            .await;

        tracing::info!(
            payment_id = %payment.id,
            participant_id = %payment.participant_id,
            status = %payment.status,
            "Payment initiated"
        );

        Ok(payment)
    }
}
