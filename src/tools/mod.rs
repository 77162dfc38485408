//! Tool groups: one façade per Bitrix24 entity family.
//!
//! Each group is constructed with a shared transport handle and turns raw
//! tool arguments into a single `Envelope`. Groups keep no state between calls.

mod calendar;
mod crm;
mod projects;
mod tasks;

use std::sync::Arc;

pub use calendar::{CalendarTools, EventQuery, MeetingStatus, NearestEventsQuery};
pub use crm::{CrmEntity, CrmTools, COMPANY, CONTACT, DEAL, LEAD};
pub use projects::ProjectTools;
pub use tasks::{TaskAction, TaskTools};

use crate::client::{BitrixClient, ClientError, Transport};
use crate::config::BitrixConfig;

/// Default number of records returned by list tools.
pub const DEFAULT_LIMIT: i64 = 50;

/// Arguments shared by the list tools.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// JSON object of filter conditions.
    pub filter: Option<String>,
    /// Comma-separated field names.
    pub select: Option<String>,
    /// JSON object of sort conditions.
    pub order: Option<String>,
    /// Maximum records to return; zero or negative means all.
    pub limit: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: None,
            select: None,
            order: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListQuery {
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

/// The transport handle plus every tool group bound to it.
#[derive(Clone)]
pub struct AppContext {
    client: Arc<dyn Transport>,
    pub leads: CrmTools,
    pub deals: CrmTools,
    pub contacts: CrmTools,
    pub companies: CrmTools,
    pub tasks: TaskTools,
    pub calendar: CalendarTools,
    pub projects: ProjectTools,
}

impl AppContext {
    /// Bind every tool group to `client`.
    pub fn new(client: Arc<dyn Transport>) -> Self {
        Self {
            leads: CrmTools::new(client.clone(), LEAD),
            deals: CrmTools::new(client.clone(), DEAL),
            contacts: CrmTools::new(client.clone(), CONTACT),
            companies: CrmTools::new(client.clone(), COMPANY),
            tasks: TaskTools::new(client.clone()),
            calendar: CalendarTools::new(client.clone()),
            projects: ProjectTools::new(client.clone()),
            client,
        }
    }

    /// Connect to the portal described by `config`.
    pub fn connect(config: &BitrixConfig) -> Result<Self, ClientError> {
        let client = BitrixClient::connect(config)?;
        Ok(Self::new(Arc::new(client)))
    }

    pub fn client(&self) -> &Arc<dyn Transport> {
        &self.client
    }

    /// Drop the tool groups and the transport handle.
    pub fn shutdown(self) {
        tracing::info!("Shutting down Bitrix24 MCP server");
        drop(self);
        tracing::info!("Disconnected from Bitrix24");
    }
}
