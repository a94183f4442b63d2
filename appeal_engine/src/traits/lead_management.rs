use crate::{
    db_types::{Lead, LeadId, NewLead},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait LeadManagement {
    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, StoreError>;

    async fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError>;

    /// Stamps the opt-in confirmation time if the lead has not been confirmed before. Returns the lead as stored
    /// afterwards, or `None` if it does not exist.
    async fn confirm_lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError>;
}
