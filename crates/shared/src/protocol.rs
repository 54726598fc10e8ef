use serde::{Deserialize, Serialize};

use crate::domain::{CategoryEntry, ServiceEntry};

/// Body of `PUT /api/categories/order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order: Vec<String>,
}

impl OrderUpdate {
    pub fn new(order: Vec<String>) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceMutationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMutationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: bool,
}

pub fn services_route() -> &'static str {
    "/api/services"
}

pub fn categories_route() -> &'static str {
    "/api/categories"
}

pub fn category_order_route() -> &'static str {
    "/api/categories/order"
}
