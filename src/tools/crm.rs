//! CRM entities: leads, deals, contacts and companies.
//!
//! All four expose the same five operations over `crm.<entity>.*`, so a
//! single façade is configured per entity instead of four copies.

use std::sync::Arc;

use serde_json::{json, Value};

use super::ListQuery;
use crate::client::{Params, Transport};
use crate::envelope::Envelope;
use crate::error::ToolError;
use crate::normalize::{apply_limit, parse_field_list, parse_object, parse_object_or_none};
use crate::response::ResponseShape;

/// Names and capabilities of one CRM entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrmEntity {
    /// Capitalized name used in messages ("Lead").
    pub label: &'static str,
    /// Singular key ("lead"), also the `<singular>_id` prefix.
    pub singular: &'static str,
    /// Plural key for list envelopes ("leads").
    pub plural: &'static str,
    /// REST method namespace ("crm.lead").
    pub namespace: &'static str,
    /// Whether the list tool forwards a caller-supplied `order`.
    pub supports_order: bool,
}

pub const LEAD: CrmEntity = CrmEntity {
    label: "Lead",
    singular: "lead",
    plural: "leads",
    namespace: "crm.lead",
    supports_order: false,
};

pub const DEAL: CrmEntity = CrmEntity {
    label: "Deal",
    singular: "deal",
    plural: "deals",
    namespace: "crm.deal",
    supports_order: false,
};

pub const CONTACT: CrmEntity = CrmEntity {
    label: "Contact",
    singular: "contact",
    plural: "contacts",
    namespace: "crm.contact",
    supports_order: true,
};

pub const COMPANY: CrmEntity = CrmEntity {
    label: "Company",
    singular: "company",
    plural: "companies",
    namespace: "crm.company",
    supports_order: false,
};

#[derive(Clone)]
pub struct CrmTools {
    client: Arc<dyn Transport>,
    entity: CrmEntity,
}

impl CrmTools {
    pub fn new(client: Arc<dyn Transport>, entity: CrmEntity) -> Self {
        Self { client, entity }
    }

    pub fn entity(&self) -> &CrmEntity {
        &self.entity
    }

    fn method(&self, action: &str) -> String {
        format!("{}.{}", self.entity.namespace, action)
    }

    fn id_key(&self) -> String {
        format!("{}_id", self.entity.singular)
    }

    /// List records matching `query`, fetching every page and truncating to
    /// `query.limit`.
    pub async fn list(&self, query: &ListQuery) -> Envelope {
        let operation = format!("getting {}", self.entity.plural);
        Envelope::settle(self.try_list(query).await, &operation)
    }

    async fn try_list(&self, query: &ListQuery) -> Result<Envelope, ToolError> {
        let mut params = Params::new();

        if let Some(filter) = parse_object_or_none(query.filter.as_deref(), "filter_params")? {
            if !filter.is_empty() {
                params.insert("filter".to_string(), Value::Object(filter));
            }
        }
        if let Some(select) = parse_field_list(query.select.as_deref()) {
            params.insert("select".to_string(), select.into());
        }
        if let Some(order) = parse_object_or_none(query.order.as_deref(), "order")? {
            if !order.is_empty() {
                if !self.entity.supports_order {
                    return Err(ToolError::UnsupportedOrder {
                        entity: self.entity.plural,
                    });
                }
                params.insert("order".to_string(), Value::Object(order));
            }
        }

        let items = self.client.get_all(&self.method("list"), params).await?;
        Ok(Envelope::list(
            self.entity.plural,
            apply_limit(items, query.limit),
        ))
    }

    pub async fn get(&self, id: &str) -> Envelope {
        let operation = format!("getting {} {}", self.entity.singular, id);
        Envelope::settle(self.try_get(id).await, &operation)
    }

    async fn try_get(&self, id: &str) -> Result<Envelope, ToolError> {
        let mut params = Params::new();
        params.insert("id".to_string(), json!(id));

        let response = self.client.call(&self.method("get"), params).await?;
        match ResponseShape::classify(response).into_record() {
            Some(record) => Ok(Envelope::record(self.entity.singular, record)),
            None => Err(ToolError::not_found(self.entity.label, id)),
        }
    }

    /// Create a record from a JSON object of field values.
    pub async fn create(&self, fields: &str) -> Envelope {
        let operation = format!("creating {}", self.entity.singular);
        Envelope::settle(self.try_create(fields).await, &operation)
    }

    async fn try_create(&self, fields: &str) -> Result<Envelope, ToolError> {
        let fields = parse_object(fields, "fields")?;
        let mut params = Params::new();
        params.insert("fields".to_string(), Value::Object(fields));

        let response = self.client.call(&self.method("add"), params).await?;
        let id = ResponseShape::classify(response).created_id(&[]);
        Ok(Envelope::created(&self.id_key(), id, self.entity.label))
    }

    pub async fn update(&self, id: &str, fields: &str) -> Envelope {
        let operation = format!("updating {} {}", self.entity.singular, id);
        Envelope::settle(self.try_update(id, fields).await, &operation)
    }

    async fn try_update(&self, id: &str, fields: &str) -> Result<Envelope, ToolError> {
        let fields = parse_object(fields, "fields")?;
        let mut params = Params::new();
        params.insert("id".to_string(), json!(id));
        params.insert("fields".to_string(), Value::Object(fields));

        let response = self.client.call(&self.method("update"), params).await?;
        let updated = ResponseShape::classify(response).is_truthy();
        Ok(Envelope::outcome(updated)
            .with(&self.id_key(), id)
            .with_message(
                &format!("{} updated successfully", self.entity.label),
                &format!("Failed to update {}", self.entity.singular),
            ))
    }

    /// Field metadata for the entity.
    pub async fn fields(&self) -> Envelope {
        let operation = format!("getting {} fields", self.entity.singular);
        Envelope::settle(self.try_fields().await, &operation)
    }

    async fn try_fields(&self) -> Result<Envelope, ToolError> {
        let response = self.client.call(&self.method("fields"), Params::new()).await?;
        let fields = ResponseShape::classify(response)
            .into_value()
            .unwrap_or_else(|| json!({}));
        Ok(Envelope::record("fields", fields))
    }
}
