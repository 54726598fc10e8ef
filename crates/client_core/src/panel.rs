//! Settings panel host: services/categories CRUD plus the category reorder list.

use std::sync::Arc;

use shared::{
    domain::{CategoryEntry, ServiceEntry, FALLBACK_CATEGORY},
    ordered_map::OrderedMap,
    protocol::OrderUpdate,
};
use tokio::{runtime::Handle, sync::broadcast};
use tracing::{debug, info, warn};

use crate::{
    error::{Result, SettingsError},
    reorder::{ListReorder, ReorderableList},
    SettingsApi,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsTab {
    #[default]
    Services,
    Categories,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    ServicesLoaded { count: usize },
    CategoriesLoaded { order: Vec<String> },
    /// Category data arrived mid-drag and is parked until the drag ends.
    ReloadDeferred,
    OrderSaved { order: Vec<String> },
    OrderSaveFailed { order: Vec<String>, message: String },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Options offered by the service form's category picker.
///
/// Every known category in backend order, followed by the fallback category
/// unless a category of that name already exists.
pub fn category_options(categories: &OrderedMap<CategoryEntry>, selected: &str) -> Vec<CategoryOption> {
    let mut options: Vec<CategoryOption> = categories
        .iter()
        .map(|(key, category)| CategoryOption {
            value: key.to_string(),
            label: category.display_name(key).to_string(),
            selected: key == selected,
        })
        .collect();
    if !categories.contains_key(FALLBACK_CATEGORY) {
        options.push(CategoryOption {
            value: FALLBACK_CATEGORY.to_string(),
            label: FALLBACK_CATEGORY.to_string(),
            selected: selected == FALLBACK_CATEGORY,
        });
    }
    options
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceForm {
    /// Name the entry is stored under; `None` for a new service.
    pub original_name: Option<String>,
    pub draft: ServiceEntry,
    pub category_options: Vec<CategoryOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryForm {
    pub original_name: Option<String>,
    pub draft: CategoryEntry,
}

#[derive(Debug)]
struct CategorySnapshot {
    categories: OrderedMap<CategoryEntry>,
    stored_order: Vec<String>,
}

pub struct SettingsPanel {
    api: Arc<dyn SettingsApi>,
    visible: bool,
    active_tab: SettingsTab,
    services: OrderedMap<ServiceEntry>,
    categories: Option<ReorderableList<CategoryEntry>>,
    deferred_reload: Option<CategorySnapshot>,
    service_form: Option<ServiceForm>,
    category_form: Option<CategoryForm>,
    events: broadcast::Sender<PanelEvent>,
}

impl SettingsPanel {
    pub fn new(api: Arc<dyn SettingsApi>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            api,
            visible: false,
            active_tab: SettingsTab::default(),
            services: OrderedMap::new(),
            categories: None,
            deferred_reload: None,
            service_form: None,
            category_form: None,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PanelEvent> {
        self.events.subscribe()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn active_tab(&self) -> SettingsTab {
        self.active_tab
    }

    pub fn show_tab(&mut self, tab: SettingsTab) {
        self.active_tab = tab;
    }

    pub fn services(&self) -> &OrderedMap<ServiceEntry> {
        &self.services
    }

    pub fn categories(&self) -> Option<&ReorderableList<CategoryEntry>> {
        self.categories.as_ref()
    }

    pub fn service_form(&self) -> Option<&ServiceForm> {
        self.service_form.as_ref()
    }

    pub fn category_form(&self) -> Option<&CategoryForm> {
        self.category_form.as_ref()
    }

    pub fn has_deferred_reload(&self) -> bool {
        self.deferred_reload.is_some()
    }

    pub async fn open(&mut self) -> Result<()> {
        self.visible = true;
        self.load_services().await?;
        self.load_categories().await?;
        self.show_tab(SettingsTab::Services);
        Ok(())
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.categories = None;
        self.deferred_reload = None;
        self.service_form = None;
        self.category_form = None;
    }

    pub async fn load_services(&mut self) -> Result<()> {
        let config = self.api.fetch_config().await.inspect_err(|err| self.report(err))?;
        self.services = config.services;
        info!(count = self.services.len(), "loaded services");
        let _ = self.events.send(PanelEvent::ServicesLoaded {
            count: self.services.len(),
        });
        Ok(())
    }

    pub async fn load_categories(&mut self) -> Result<()> {
        let categories = self
            .api
            .fetch_categories()
            .await
            .inspect_err(|err| self.report(err))?;
        let config = self.api.fetch_config().await.inspect_err(|err| self.report(err))?;
        self.apply_categories(CategorySnapshot {
            categories,
            stored_order: config.category_order,
        });
        Ok(())
    }

    fn apply_categories(&mut self, snapshot: CategorySnapshot) {
        if self.categories.as_ref().is_some_and(ReorderableList::is_dragging) {
            debug!("category reload arrived during drag; deferring");
            self.deferred_reload = Some(snapshot);
            let _ = self.events.send(PanelEvent::ReloadDeferred);
            return;
        }
        self.install_categories(snapshot.categories, &snapshot.stored_order);
    }

    fn install_categories(&mut self, categories: OrderedMap<CategoryEntry>, stored_order: &[String]) {
        let list = ReorderableList::from_order(stored_order.iter().map(String::as_str), categories)
            .on_commit(self.order_persister());
        let order = list.keys();
        info!(order = ?order, "loaded categories");
        self.categories = Some(list);
        let _ = self.events.send(PanelEvent::CategoriesLoaded { order });
    }

    // Fire-and-forget: the save runs on the ambient runtime and its outcome
    // only reaches the event channel and the log. Each drag-end spawns its own
    // PUT, so back-to-back drags are not guaranteed to land in order.
    fn order_persister(&self) -> impl Fn(&OrderUpdate) + Send + Sync + 'static {
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        move |update: &OrderUpdate| {
            let order = update.order.clone();
            let Ok(runtime) = Handle::try_current() else {
                warn!(order = ?order, "no async runtime available; category order not saved");
                let _ = events.send(PanelEvent::OrderSaveFailed {
                    order,
                    message: "no async runtime available".into(),
                });
                return;
            };
            let api = Arc::clone(&api);
            let events = events.clone();
            runtime.spawn(async move {
                match api.save_category_order(&order).await {
                    Ok(stored) => {
                        info!(order = ?stored, "saved category order");
                        let _ = events.send(PanelEvent::OrderSaved { order: stored });
                    }
                    Err(err) => {
                        warn!(order = ?order, "failed to save category order: {err}");
                        let _ = events.send(PanelEvent::OrderSaveFailed {
                            order,
                            message: err.to_string(),
                        });
                    }
                }
            });
        }
    }

    pub fn drag_start(&mut self, key: &str) -> bool {
        self.categories
            .as_mut()
            .is_some_and(|list| list.on_drag_start(key))
    }

    pub fn drag_over(&mut self, target_key: &str, pointer_y_fraction: f64) -> Option<ListReorder> {
        self.categories
            .as_mut()?
            .on_drag_over(target_key, pointer_y_fraction)
    }

    pub fn drop_on_list(&mut self) {
        if let Some(list) = self.categories.as_mut() {
            list.on_drop();
        }
    }

    /// Commits the dragged order and applies any reload parked during the drag.
    ///
    /// A parked reload is merged with the order just committed, so the fresh
    /// key set is shown in the order the user produced.
    pub fn drag_end(&mut self) -> Option<OrderUpdate> {
        let committed = self.categories.as_mut()?.on_drag_end()?;
        if let Some(snapshot) = self.deferred_reload.take() {
            self.install_categories(snapshot.categories, &committed.order);
        }
        Some(committed)
    }

    pub async fn begin_service_form(&mut self, name: Option<&str>) -> Result<()> {
        let (original_name, draft) = match name {
            Some(name) => {
                let config = self.api.fetch_config().await.inspect_err(|err| self.report(err))?;
                let mut entry = config.services.get(name).cloned().unwrap_or_default();
                if entry.name.is_empty() {
                    entry.name = name.to_string();
                }
                (Some(name.to_string()), entry)
            }
            None => (None, ServiceEntry::default()),
        };
        let categories = self
            .api
            .fetch_categories()
            .await
            .inspect_err(|err| self.report(err))?;
        let category_options = category_options(&categories, &draft.category);
        self.service_form = Some(ServiceForm {
            original_name,
            draft,
            category_options,
        });
        Ok(())
    }

    pub fn cancel_service_form(&mut self) {
        self.service_form = None;
    }

    /// Saves `entry` through the open service form: new services are created,
    /// edits replace the entry stored under the form's original name.
    pub async fn submit_service_form(&mut self, entry: ServiceEntry) -> Result<()> {
        let form = self
            .service_form
            .as_ref()
            .ok_or(SettingsError::NoOpenForm("service"))?;
        let entry = normalize_service(entry, &form.category_options)?;

        let saved = match form.original_name.as_deref() {
            Some(original) if !original.is_empty() => {
                self.api.update_service(original, &entry).await
            }
            _ => self.api.create_service(&entry).await,
        };
        saved.inspect_err(|err| self.report(err))?;

        self.load_services().await?;
        self.cancel_service_form();
        Ok(())
    }

    pub async fn delete_service(&mut self, name: &str) -> Result<()> {
        self.api
            .delete_service(name)
            .await
            .inspect_err(|err| self.report(err))?;
        self.load_services().await
    }

    pub async fn begin_category_form(&mut self, name: Option<&str>) -> Result<()> {
        let form = match name {
            Some(name) => {
                let categories = self
                    .api
                    .fetch_categories()
                    .await
                    .inspect_err(|err| self.report(err))?;
                let mut draft = categories.get(name).cloned().unwrap_or_default();
                if draft.name.is_empty() {
                    draft.name = name.to_string();
                }
                CategoryForm {
                    original_name: Some(name.to_string()),
                    draft,
                }
            }
            None => CategoryForm {
                original_name: None,
                draft: CategoryEntry::default(),
            },
        };
        self.category_form = Some(form);
        Ok(())
    }

    pub fn cancel_category_form(&mut self) {
        self.category_form = None;
    }

    pub async fn submit_category_form(&mut self, entry: CategoryEntry) -> Result<()> {
        let form = self
            .category_form
            .as_ref()
            .ok_or(SettingsError::NoOpenForm("category"))?;
        let entry = CategoryEntry {
            name: required_name(&entry.name, "category")?,
            icon: entry.icon.trim().to_string(),
        };

        let saved = match form.original_name.as_deref() {
            Some(original) if !original.is_empty() => {
                self.api.update_category(original, &entry).await
            }
            _ => self.api.create_category(&entry).await,
        };
        saved.inspect_err(|err| self.report(err))?;

        self.load_categories().await?;
        self.cancel_category_form();
        Ok(())
    }

    pub async fn delete_category(&mut self, name: &str) -> Result<()> {
        self.api
            .delete_category(name)
            .await
            .inspect_err(|err| self.report(err))?;
        self.load_categories().await
    }

    fn report(&self, err: &SettingsError) {
        warn!("settings request failed: {err}");
        let _ = self.events.send(PanelEvent::Error(err.to_string()));
    }
}

fn required_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SettingsError::Validation(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

// An empty category takes the picker's current selection, like an untouched
// select element would.
fn normalize_service(entry: ServiceEntry, options: &[CategoryOption]) -> Result<ServiceEntry> {
    let name = required_name(&entry.name, "service")?;
    let category = entry.category.trim();
    let category = if category.is_empty() {
        options
            .iter()
            .find(|option| option.selected)
            .or_else(|| options.first())
            .map(|option| option.value.clone())
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
    } else if options.iter().any(|option| option.value == category) {
        category.to_string()
    } else {
        return Err(SettingsError::Validation(format!(
            "unknown category '{category}'"
        )));
    };

    Ok(ServiceEntry {
        name,
        description: entry.description.trim().to_string(),
        icon: entry.icon.trim().to_string(),
        category,
    })
}

#[cfg(test)]
#[path = "tests/panel_tests.rs"]
mod tests;
