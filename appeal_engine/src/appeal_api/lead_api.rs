use std::fmt::Debug;

use log::*;
use property_data::County;
use serde::{Deserialize, Serialize};

use crate::{
    appeal_api::{errors::LeadError, RequestContext},
    config::SystemConfig,
    db_types::{AuditEntityType, AuditEventType, Lead, LeadId, NewAuditEvent, NewLead},
    events::EventProducers,
    helpers::is_valid_email,
    traits::LeadManagement,
};

/// A "notify me when appeals open" sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRequest {
    pub email: String,
    pub tag: String,
    #[serde(default)]
    pub county: Option<County>,
}

impl LeadRequest {
    pub fn validate(&self) -> Result<(), LeadError> {
        if !is_valid_email(&self.email) {
            return Err(LeadError::ValidationError("Invalid email address".into()));
        }
        if self.tag.trim().is_empty() {
            return Err(LeadError::ValidationError("Tag is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadReceipt {
    pub id: LeadId,
    pub status: String,
}

impl From<&Lead> for LeadReceipt {
    fn from(lead: &Lead) -> Self {
        let status = if lead.opt_in_confirmed_at.is_some() { "confirmed" } else { "pending_confirmation" };
        Self { id: lead.id.clone(), status: status.to_string() }
    }
}

pub struct LeadApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for LeadApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LeadApi")
    }
}

impl<B> LeadApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B: LeadManagement> LeadApi<B> {
    /// Stores a lead. The recontact month is the configured default for the lead's county.
    pub async fn submit(
        &self,
        user_id: &str,
        request: &LeadRequest,
        config: &SystemConfig,
        ctx: &RequestContext,
    ) -> Result<Lead, LeadError> {
        request.validate()?;
        let county = request.county.unwrap_or_default();
        let new_lead = NewLead {
            user_id: user_id.to_string(),
            email: request.email.trim().to_string(),
            tag: request.tag.trim().to_string(),
            recontact_month: config.recontact_month_for(county),
        };
        let lead = self.db.insert_lead(new_lead).await?;
        debug!("📬️ Lead {} stored for {user_id} ({county}, month {})", lead.id, lead.recontact_month);
        let event = NewAuditEvent::new(AuditEventType::LeadSubmitted, AuditEntityType::Lead, &lead.id)
            .with_user(user_id)
            .with_origin(ctx.ip.clone(), ctx.user_agent.clone());
        self.producers.record_audit(event);
        Ok(lead)
    }

    /// Records the opt-in. Confirming twice keeps the first confirmation time.
    pub async fn confirm(&self, id: &LeadId) -> Result<Lead, LeadError> {
        let lead = self.db.confirm_lead(id).await?.ok_or_else(|| LeadError::LeadNotFound(id.clone()))?;
        debug!("📬️ Lead {id} confirmed at {:?}", lead.opt_in_confirmed_at);
        Ok(lead)
    }
}
