//! Read paths
//!
//! Consent-gated, cache-aside queries with conditional-request support.
//! Authorization re-runs on every read against the cached value's owning
//! identifiers; a cache hit never skips it. The content fingerprint is
//! computed after authorization and cache resolution.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::consent::ConsentAuthorizer;
use crate::domain::{CoreError, OperationContext};
use crate::model::{Account, FxDeal, Payment};
use crate::store::{Tables, TtlCache};

/// An entity servable through the read path.
pub trait Readable: Clone {
    /// Scope the consent must carry to read this entity
    const SCOPE: &'static str;
    /// Human name used in not-found messages
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn owner_participant(&self) -> &str;
    /// The consent-linked resource this entity belongs to
    fn owner_resource(&self) -> &str;
    fn status_label(&self) -> String;
    fn last_modified(&self) -> DateTime<Utc>;
}

impl Readable for Payment {
    const SCOPE: &'static str = "payments";
    const KIND: &'static str = "Payment";

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_participant(&self) -> &str {
        &self.participant_id
    }
    fn owner_resource(&self) -> &str {
        &self.debtor_account
    }
    fn status_label(&self) -> String {
        self.status.to_string()
    }
    fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Readable for FxDeal {
    const SCOPE: &'static str = "fx-quotes";
    const KIND: &'static str = "FX deal";

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_participant(&self) -> &str {
        &self.participant_id
    }
    fn owner_resource(&self) -> &str {
        &self.settlement_account
    }
    fn status_label(&self) -> String {
        self.status.to_string()
    }
    fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Readable for Account {
    const SCOPE: &'static str = "accounts";
    const KIND: &'static str = "Account";

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_participant(&self) -> &str {
        &self.participant_id
    }
    fn owner_resource(&self) -> &str {
        &self.application_ref
    }
    fn status_label(&self) -> String {
        self.status.to_string()
    }
    fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Stable content fingerprint over identity, status and last-modified.
pub fn etag_for<T: Readable>(value: &T) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.id().as_bytes());
    hasher.update(value.status_label().as_bytes());
    hasher.update(value.last_modified().to_rfc3339().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("\"{}\"", &digest[..16])
}

/// A fresh read result.
#[derive(Debug, Clone)]
pub struct ReadOutcome<T> {
    pub value: T,
    pub cache_hit: bool,
    pub etag: String,
}

/// Outcome of a possibly-conditional read.
#[derive(Debug, Clone)]
pub enum ReadResult<T> {
    Fresh(ReadOutcome<T>),
    /// The caller's fingerprint still matches; the body is not re-serialized
    NotModified { etag: String },
}

/// Consent-gated cache-aside reads over the entity tables.
pub struct ReadService {
    authorizer: ConsentAuthorizer,
    tables: Arc<Tables>,
    payments: TtlCache<Uuid, Payment>,
    deals: TtlCache<Uuid, FxDeal>,
    accounts: TtlCache<Uuid, Account>,
}

impl ReadService {
    pub fn new(
        authorizer: ConsentAuthorizer,
        tables: Arc<Tables>,
        ttl: Duration,
        capacity: usize,
    ) -> Self {
        Self {
            authorizer,
            tables,
            payments: TtlCache::new(ttl, capacity),
            deals: TtlCache::new(ttl, capacity),
            accounts: TtlCache::new(ttl, capacity),
        }
    }

    pub fn payment(
        &self,
        id: Uuid,
        context: &OperationContext,
        if_none_match: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReadResult<Payment>, CoreError> {
        self.read(&self.payments, id, context, if_none_match, now, |tables| {
            tables.get_payment(id)
        })
    }

    pub fn deal(
        &self,
        id: Uuid,
        context: &OperationContext,
        if_none_match: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReadResult<FxDeal>, CoreError> {
        self.read(&self.deals, id, context, if_none_match, now, |tables| {
            tables.get_deal(id)
        })
    }

    pub fn account(
        &self,
        id: Uuid,
        context: &OperationContext,
        if_none_match: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReadResult<Account>, CoreError> {
        self.read(&self.accounts, id, context, if_none_match, now, |tables| {
            tables.get_account(id)
        })
    }

    fn read<T, F>(
        &self,
        cache: &TtlCache<Uuid, T>,
        id: Uuid,
        context: &OperationContext,
        if_none_match: Option<&str>,
        now: DateTime<Utc>,
        load: F,
    ) -> Result<ReadResult<T>, CoreError>
    where
        T: Readable,
        F: FnOnce(&Tables) -> Result<Option<T>, CoreError>,
    {
        let consent_id = context.require_consent()?;

        let (value, cache_hit) = match cache.get(&id, now) {
            Some(value) => (value, true),
            None => {
                let value = load(&self.tables)?
                    .ok_or_else(|| CoreError::not_found(format!("{} {}", T::KIND, id)))?;
                cache.insert(id, value.clone(), now);
                (value, false)
            }
        };

        // authorization always runs against the value's owning identifiers,
        // cached or not
        self.authorizer.authorize(
            consent_id,
            T::SCOPE,
            value.owner_resource(),
            &context.participant_id,
            now,
        )?;
        if value.owner_participant() != context.participant_id {
            return Err(CoreError::forbidden("Resource not linked to consent"));
        }

        let etag = etag_for(&value);
        if if_none_match == Some(etag.as_str()) {
            return Ok(ReadResult::NotModified { etag });
        }

        Ok(ReadResult::Fresh(ReadOutcome {
            value,
            cache_hit,
            etag,
        }))
    }
}
