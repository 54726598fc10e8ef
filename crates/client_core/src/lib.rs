use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{CategoryEntry, ServiceConfig, ServiceEntry},
    error::ApiError,
    ordered_map::OrderedMap,
    protocol::{
        categories_route, category_order_route, services_route, CategoryMutationResponse,
        DeleteResponse, OrderUpdate, OrderUpdateResponse, ServiceMutationResponse,
    },
};
use tracing::{debug, info};
use url::Url;

pub mod error;
pub mod panel;
pub mod reorder;

pub use error::{Result, SettingsError};
pub use panel::{CategoryForm, CategoryOption, PanelEvent, ServiceForm, SettingsPanel, SettingsTab};
pub use reorder::{DropPosition, ListReorder, ListRow, OrderableItem, ReorderableList, RowState};

/// Backend surface the settings panel talks to.
#[async_trait]
pub trait SettingsApi: Send + Sync {
    async fn fetch_config(&self) -> Result<ServiceConfig>;
    async fn create_service(&self, entry: &ServiceEntry) -> Result<ServiceEntry>;
    async fn update_service(&self, name: &str, entry: &ServiceEntry) -> Result<ServiceEntry>;
    async fn delete_service(&self, name: &str) -> Result<()>;
    async fn fetch_categories(&self) -> Result<OrderedMap<CategoryEntry>>;
    async fn create_category(&self, entry: &CategoryEntry) -> Result<CategoryEntry>;
    async fn update_category(&self, name: &str, entry: &CategoryEntry) -> Result<CategoryEntry>;
    async fn delete_category(&self, name: &str) -> Result<()>;
    /// Persists the category display order; returns the order the backend stored.
    async fn save_category_order(&self, order: &[String]) -> Result<Vec<String>>;
}

/// HTTP client for the services hub REST API.
#[derive(Debug, Clone)]
pub struct SettingsClient {
    http: Client,
    base_url: Url,
}

impl SettingsClient {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_timeout(server_url, None)
    }

    pub fn with_timeout(server_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = parse_base_url(server_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str, name: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SettingsError::UrlNotABase(self.base_url.to_string()))?;
            segments.pop_if_empty();
            segments.extend(route.trim_start_matches('/').split('/'));
            if let Some(name) = name {
                segments.push(name);
            }
        }
        Ok(url)
    }
}

fn parse_base_url(server_url: &str) -> Result<Url> {
    let url = Url::parse(server_url.trim()).map_err(|source| SettingsError::InvalidUrl {
        url: server_url.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(SettingsError::UrlNotABase(server_url.to_string()));
    }
    Ok(url)
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_body(status.as_u16(), &body).into())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    Ok(ensure_success(response).await?.json().await?)
}

#[async_trait]
impl SettingsApi for SettingsClient {
    async fn fetch_config(&self) -> Result<ServiceConfig> {
        let url = self.endpoint(services_route(), None)?;
        let config: ServiceConfig = decode(self.http.get(url).send().await?).await?;
        debug!(
            services = config.services.len(),
            categories = config.categories.len(),
            "fetched service config"
        );
        Ok(config)
    }

    async fn create_service(&self, entry: &ServiceEntry) -> Result<ServiceEntry> {
        let url = self.endpoint(services_route(), None)?;
        let response: ServiceMutationResponse =
            decode(self.http.post(url).json(entry).send().await?).await?;
        info!(service = %entry.name, "created service");
        Ok(response.service.unwrap_or_else(|| entry.clone()))
    }

    async fn update_service(&self, name: &str, entry: &ServiceEntry) -> Result<ServiceEntry> {
        let url = self.endpoint(services_route(), Some(name))?;
        let response: ServiceMutationResponse =
            decode(self.http.put(url).json(entry).send().await?).await?;
        info!(service = %name, "updated service");
        Ok(response.service.unwrap_or_else(|| entry.clone()))
    }

    async fn delete_service(&self, name: &str) -> Result<()> {
        let url = self.endpoint(services_route(), Some(name))?;
        let response: DeleteResponse = decode(self.http.delete(url).send().await?).await?;
        info!(service = %name, success = response.success, "deleted service");
        Ok(())
    }

    async fn fetch_categories(&self) -> Result<OrderedMap<CategoryEntry>> {
        let url = self.endpoint(categories_route(), None)?;
        decode(self.http.get(url).send().await?).await
    }

    async fn create_category(&self, entry: &CategoryEntry) -> Result<CategoryEntry> {
        let url = self.endpoint(categories_route(), None)?;
        let response: CategoryMutationResponse =
            decode(self.http.post(url).json(entry).send().await?).await?;
        info!(category = %entry.name, "created category");
        Ok(response.category.unwrap_or_else(|| entry.clone()))
    }

    async fn update_category(&self, name: &str, entry: &CategoryEntry) -> Result<CategoryEntry> {
        let url = self.endpoint(categories_route(), Some(name))?;
        let response: CategoryMutationResponse =
            decode(self.http.put(url).json(entry).send().await?).await?;
        info!(category = %name, "updated category");
        Ok(response.category.unwrap_or_else(|| entry.clone()))
    }

    async fn delete_category(&self, name: &str) -> Result<()> {
        let url = self.endpoint(categories_route(), Some(name))?;
        let response: DeleteResponse = decode(self.http.delete(url).send().await?).await?;
        info!(category = %name, success = response.success, "deleted category");
        Ok(())
    }

    async fn save_category_order(&self, order: &[String]) -> Result<Vec<String>> {
        let url = self.endpoint(category_order_route(), None)?;
        let body = OrderUpdate::new(order.to_vec());
        let response = ensure_success(self.http.put(url).json(&body).send().await?).await?;
        let text = response.text().await?;
        // An empty or non-JSON success body still means the order was accepted.
        let stored = serde_json::from_str::<OrderUpdateResponse>(&text)
            .ok()
            .filter(|parsed| parsed.success)
            .map(|parsed| parsed.order)
            .unwrap_or(body.order);
        debug!(order = ?stored, "saved category order");
        Ok(stored)
    }
}

#[cfg(test)]
#[path = "tests/mock_backend.rs"]
mod mock_backend;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
