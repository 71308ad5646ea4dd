//! Onboarding Handler
//!
//! Opens an account from an encrypted onboarding application. The profile
//! is decrypted and screened; a screening rejection publishes a rejection
//! event before the error surfaces, and no account or idempotency record
//! is left behind.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::consent::ConsentAuthorizer;
use crate::domain::{CoreError, DomainEvent, OperationContext};
use crate::model::{Account, AccountStatus};
use crate::ports::{EventPublisher, PayloadDecrypter, Ports, ScreeningCheck};
use crate::store::{IdempotencyStore, Tables};

use super::{request_fingerprint, run_idempotent, Idempotent, OnboardingCommand};

const ACCOUNTS_SCOPE: &str = "accounts";

/// Handler for account onboarding
pub struct OnboardingHandler {
    idempotency: Arc<IdempotencyStore>,
    authorizer: ConsentAuthorizer,
    tables: Arc<Tables>,
    screening: Arc<dyn ScreeningCheck>,
    decrypter: Arc<dyn PayloadDecrypter>,
    events: Arc<dyn EventPublisher>,
}

impl OnboardingHandler {
    pub fn new(
        idempotency: Arc<IdempotencyStore>,
        authorizer: ConsentAuthorizer,
        tables: Arc<Tables>,
        ports: &Ports,
    ) -> Self {
        Self {
            idempotency,
            authorizer,
            tables,
            screening: ports.screening.clone(),
            decrypter: ports.decrypter.clone(),
            events: ports.events.clone(),
        }
    }

    /// Execute the onboarding command
    pub async fn execute(
        &self,
        command: OnboardingCommand,
        idempotency_key: &str,
        context: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<Idempotent<Account>, CoreError> {
        let request_hash = request_fingerprint(&command, context.interaction_id)?;

        run_idempotent(
            &self.idempotency,
            idempotency_key,
            context,
            request_hash,
            now,
            || self.open(command, context, now),
        )
        .await
    }

    async fn open(
        &self,
        command: OnboardingCommand,
        context: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<Account, CoreError> {
        self.authorizer.authorize(
            &command.consent_id,
            ACCOUNTS_SCOPE,
            &command.application_ref,
            &context.participant_id,
            now,
        )?;

        let profile = self
            .decrypter
            .decrypt(&command.encrypted_profile)
            .await
            .map_err(|e| CoreError::DecryptionFailed(e.to_string()))?;

        if !self.screening.screen(&profile).await {
            // the rejection event goes out even though the command fails
            self.events
                .publish(DomainEvent::OnboardingRejected {
                    participant_id: context.participant_id.clone(),
                    application_ref: command.application_ref.clone(),
                    reason: "Applicant failed sanctions screening".into(),
                    occurred_at: now,
                })
                .await;
            tracing::warn!(
                application_ref = %command.application_ref,
                participant_id = %context.participant_id,
                "Onboarding rejected by screening"
            );
            return Err(CoreError::ComplianceViolation(
                "Applicant failed sanctions screening".into(),
            ));
        }

        let account = Account {
            id: Uuid::new_v4(),
            participant_id: context.participant_id.clone(),
            consent_id: command.consent_id,
            application_ref: command.application_ref,
            holder_name: profile.full_name,
            status: AccountStatus::Active,
            opened_at: now,
            updated_at: now,
        };

        self.tables.insert_account(&account);
        self.events
            .publish(DomainEvent::AccountOpened {
                account_id: account.id,
                participant_id: account.participant_id.clone(),
                application_ref: account.application_ref.clone(),
                occurred_at: now,
            })
            .await;

        tracing::info!(
            account_id = %account.id,
            application_ref = %account.application_ref,
            "Account opened"
        );

        Ok(account)
    }
}
