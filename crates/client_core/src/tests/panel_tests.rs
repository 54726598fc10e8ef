use std::time::Duration;

use super::*;
use crate::{
    mock_backend::{category, sample_config, service, MockBackend},
    SettingsClient,
};

async fn open_panel() -> (MockBackend, SettingsPanel) {
    let backend = MockBackend::with_config(sample_config());
    let server_url = backend.spawn().await;
    let client = SettingsClient::new(&server_url).expect("client");
    let mut panel = SettingsPanel::new(Arc::new(client));
    panel.open().await.expect("open");
    (backend, panel)
}

fn category_keys(panel: &SettingsPanel) -> Vec<String> {
    panel.categories().expect("category list").keys()
}

async fn next_order_event(rx: &mut broadcast::Receiver<PanelEvent>) -> PanelEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await.expect("event channel") {
                event @ (PanelEvent::OrderSaved { .. } | PanelEvent::OrderSaveFailed { .. }) => {
                    return event
                }
                _ => continue,
            }
        }
    })
    .await
    .expect("order event before timeout")
}

#[tokio::test]
async fn open_loads_both_tabs_and_merges_stored_order() {
    let (_backend, panel) = open_panel().await;
    assert!(panel.is_visible());
    assert_eq!(panel.active_tab(), SettingsTab::Services);
    assert_eq!(panel.services().keys().collect::<Vec<_>>(), vec!["plex"]);
    assert_eq!(category_keys(&panel), vec!["Tools", "Media", "Network"]);
}

#[tokio::test]
async fn completed_drag_persists_order_without_blocking() {
    let (backend, mut panel) = open_panel().await;
    let mut events = panel.subscribe_events();

    assert!(panel.drag_start("Network"));
    panel.drag_over("Tools", 0.2).expect("moved");
    panel.drop_on_list();
    let committed = panel.drag_end().expect("committed");
    assert_eq!(committed.order, vec!["Network", "Tools", "Media"]);
    assert_eq!(category_keys(&panel), committed.order);

    match next_order_event(&mut events).await {
        PanelEvent::OrderSaved { order } => assert_eq!(order, committed.order),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(*backend.order_puts.lock().await, vec![committed.order.clone()]);
    assert_eq!(backend.config.lock().await.category_order, committed.order);
}

#[tokio::test]
async fn failed_save_keeps_displayed_order() {
    let (backend, mut panel) = open_panel().await;
    backend.fail_order_saves(true);
    let mut events = panel.subscribe_events();

    assert!(panel.drag_start("Tools"));
    panel.drag_over("Network", 0.9).expect("moved");
    let committed = panel.drag_end().expect("committed");
    assert_eq!(committed.order, vec!["Media", "Network", "Tools"]);

    match next_order_event(&mut events).await {
        PanelEvent::OrderSaveFailed { order, message } => {
            assert_eq!(order, committed.order);
            assert!(message.contains("disk full"), "{message}");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(category_keys(&panel), committed.order);
    assert_eq!(
        backend.config.lock().await.category_order,
        vec!["Tools", "Retired", "Media"]
    );
}

#[tokio::test]
async fn reload_during_drag_waits_for_drag_end() {
    let (backend, mut panel) = open_panel().await;
    let mut events = panel.subscribe_events();

    assert!(panel.drag_start("Media"));
    panel.drag_over("Tools", 0.1).expect("moved");
    assert_eq!(category_keys(&panel), vec!["Media", "Tools", "Network"]);

    backend
        .config
        .lock()
        .await
        .categories
        .insert("Backup", category("Backup", "💾"));
    panel.load_categories().await.expect("reload");

    assert!(panel.has_deferred_reload());
    assert_eq!(panel.categories().and_then(|list| list.dragged_key()), Some("Media"));
    assert_eq!(category_keys(&panel), vec!["Media", "Tools", "Network"]);
    assert_eq!(events.recv().await.expect("event"), PanelEvent::ReloadDeferred);

    let committed = panel.drag_end().expect("committed");
    assert_eq!(committed.order, vec!["Media", "Tools", "Network"]);
    assert!(!panel.has_deferred_reload());
    assert_eq!(
        category_keys(&panel),
        vec!["Media", "Tools", "Network", "Backup"]
    );
    assert!(!panel.categories().expect("list").is_dragging());
}

#[tokio::test]
async fn new_service_form_offers_fallback_category_and_creates_entry() {
    let (backend, mut panel) = open_panel().await;
    panel.begin_service_form(None).await.expect("form");

    let form = panel.service_form().expect("form open");
    assert_eq!(form.original_name, None);
    let values: Vec<&str> = form
        .category_options
        .iter()
        .map(|option| option.value.as_str())
        .collect();
    assert_eq!(values, vec!["Media", "Tools", "Network", "Other"]);
    assert!(form.category_options.iter().all(|option| !option.selected));

    let mut entry = service("grafana", "");
    entry.name = "  grafana ".into();
    panel.submit_service_form(entry).await.expect("submit");

    assert!(panel.service_form().is_none());
    let stored = backend
        .config
        .lock()
        .await
        .services
        .get("grafana")
        .cloned()
        .expect("created");
    assert_eq!(stored.category, "Media");
    assert!(panel.services().contains_key("grafana"));
}

#[tokio::test]
async fn edit_service_form_updates_original_entry() {
    let (backend, mut panel) = open_panel().await;
    panel.begin_service_form(Some("plex")).await.expect("form");

    let form = panel.service_form().expect("form open").clone();
    assert_eq!(form.original_name.as_deref(), Some("plex"));
    assert_eq!(form.draft.category, "Media");
    let selected: Vec<&str> = form
        .category_options
        .iter()
        .filter(|option| option.selected)
        .map(|option| option.value.as_str())
        .collect();
    assert_eq!(selected, vec!["Media"]);

    let mut entry = form.draft.clone();
    entry.description = "Movies and shows".into();
    entry.category = "Other".into();
    panel.submit_service_form(entry).await.expect("submit");

    let config = backend.config.lock().await;
    let stored = config.services.get("plex").expect("plex");
    assert_eq!(stored.description, "Movies and shows");
    assert_eq!(stored.category, "Other");
}

#[tokio::test]
async fn service_form_validation_keeps_form_open() {
    let (backend, mut panel) = open_panel().await;

    let err = panel
        .submit_service_form(service("orphan", "Media"))
        .await
        .expect_err("no form");
    assert!(matches!(err, SettingsError::NoOpenForm("service")));

    panel.begin_service_form(None).await.expect("form");
    let err = panel
        .submit_service_form(service("   ", "Media"))
        .await
        .expect_err("empty name");
    assert!(matches!(err, SettingsError::Validation(_)));

    let err = panel
        .submit_service_form(service("grafana", "Nowhere"))
        .await
        .expect_err("unknown category");
    assert!(matches!(err, SettingsError::Validation(_)));

    assert!(panel.service_form().is_some());
    assert_eq!(backend.config.lock().await.services.len(), 1);
}

#[tokio::test]
async fn delete_service_reloads_list() {
    let (_backend, mut panel) = open_panel().await;
    panel.delete_service("plex").await.expect("delete");
    assert!(panel.services().is_empty());

    let mut events = panel.subscribe_events();
    let err = panel.delete_service("plex").await.expect_err("already gone");
    assert!(err.is_not_found());
    assert!(matches!(
        events.recv().await.expect("event"),
        PanelEvent::Error(_)
    ));
}

#[tokio::test]
async fn category_form_create_and_delete_rebuild_list() {
    let (backend, mut panel) = open_panel().await;

    panel.begin_category_form(None).await.expect("form");
    panel
        .submit_category_form(category("Backup", "💾"))
        .await
        .expect("create");
    assert!(panel.category_form().is_none());
    assert_eq!(
        category_keys(&panel),
        vec!["Tools", "Media", "Network", "Backup"]
    );

    panel.begin_category_form(Some("Tools")).await.expect("form");
    let form = panel.category_form().expect("form open").clone();
    assert_eq!(form.original_name.as_deref(), Some("Tools"));
    assert_eq!(form.draft.icon, "🔧");
    panel
        .submit_category_form(category("Tools", "🛠"))
        .await
        .expect("update");

    panel.delete_category("Tools").await.expect("delete");
    assert_eq!(category_keys(&panel), vec!["Media", "Network", "Backup"]);
    assert_eq!(
        backend.config.lock().await.category_order,
        vec!["Retired", "Media"]
    );
}

#[tokio::test]
async fn close_discards_list_and_forms() {
    let (_backend, mut panel) = open_panel().await;
    panel.show_tab(SettingsTab::Categories);
    panel.begin_category_form(None).await.expect("form");
    assert!(panel.drag_start("Media"));

    panel.close();
    assert!(!panel.is_visible());
    assert!(panel.categories().is_none());
    assert!(panel.category_form().is_none());
    assert!(!panel.drag_start("Media"));
    assert_eq!(panel.drag_end(), None);
}

#[test]
fn drag_end_outside_runtime_reports_unsaved_order() {
    let client = SettingsClient::new("http://127.0.0.1:9").expect("client");
    let mut panel = SettingsPanel::new(Arc::new(client));
    let mut events = panel.subscribe_events();

    let categories: OrderedMap<CategoryEntry> = [
        ("A".to_string(), category("A", "")),
        ("B".to_string(), category("B", "")),
    ]
    .into_iter()
    .collect();
    panel.install_categories(categories, &[]);

    assert!(panel.drag_start("B"));
    panel.drag_over("A", 0.0).expect("moved");
    let committed = panel.drag_end().expect("committed");
    assert_eq!(committed.order, vec!["B", "A"]);

    assert!(matches!(
        events.try_recv(),
        Ok(PanelEvent::CategoriesLoaded { .. })
    ));
    match events.try_recv() {
        Ok(PanelEvent::OrderSaveFailed { order, .. }) => assert_eq!(order, committed.order),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn category_options_list_fallback_once() {
    let mut categories = OrderedMap::new();
    categories.insert("Media", category("Movies", "🎬"));
    categories.insert("Other", category("", ""));

    let options = category_options(&categories, "Other");
    assert_eq!(
        options,
        vec![
            CategoryOption {
                value: "Media".into(),
                label: "Movies".into(),
                selected: false,
            },
            CategoryOption {
                value: "Other".into(),
                label: "Other".into(),
                selected: true,
            },
        ]
    );
}
