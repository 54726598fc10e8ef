use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{PanelEvent, SettingsClient, SettingsPanel, SettingsTab};
use shared::domain::{CategoryEntry, ServiceEntry};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

const ORDER_SAVE_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(about = "Manage services and categories of a services hub")]
struct Cli {
    /// Overrides `server_url` from settings.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Services,
    Categories,
    AddService(ServiceArgs),
    EditService {
        #[arg(value_name = "NAME")]
        key: String,
        #[command(flatten)]
        fields: ServiceArgs,
    },
    DeleteService {
        name: String,
        #[arg(long)]
        yes: bool,
    },
    AddCategory(CategoryArgs),
    EditCategory {
        #[arg(value_name = "NAME")]
        key: String,
        #[command(flatten)]
        fields: CategoryArgs,
    },
    DeleteCategory {
        name: String,
        #[arg(long)]
        yes: bool,
    },
    /// Drags category `name` over `--over` and saves the resulting order.
    MoveCategory {
        name: String,
        #[arg(long)]
        over: String,
        /// Pointer position inside the target row, 0.0 (top) to 1.0 (bottom).
        #[arg(long, default_value_t = 0.25)]
        fraction: f64,
    },
}

#[derive(Args, Debug)]
struct ServiceArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    icon: Option<String>,
    #[arg(long)]
    category: Option<String>,
}

impl ServiceArgs {
    fn apply(self, mut entry: ServiceEntry) -> ServiceEntry {
        if let Some(v) = self.name {
            entry.name = v;
        }
        if let Some(v) = self.description {
            entry.description = v;
        }
        if let Some(v) = self.icon {
            entry.icon = v;
        }
        if let Some(v) = self.category {
            entry.category = v;
        }
        entry
    }
}

#[derive(Args, Debug)]
struct CategoryArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    icon: Option<String>,
}

impl CategoryArgs {
    fn apply(self, mut entry: CategoryEntry) -> CategoryEntry {
        if let Some(v) = self.name {
            entry.name = v;
        }
        if let Some(v) = self.icon {
            entry.icon = v;
        }
        entry
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }

    let client = SettingsClient::with_timeout(&settings.server_url, settings.request_timeout())
        .with_context(|| format!("failed to create client for '{}'", settings.server_url))?;
    let mut panel = SettingsPanel::new(Arc::new(client));
    panel
        .open()
        .await
        .with_context(|| format!("failed to load settings from '{}'", settings.server_url))?;

    let order_wait = settings
        .request_timeout()
        .map(|timeout| timeout + ORDER_SAVE_GRACE);
    run(&mut panel, cli.command, order_wait).await
}

async fn run(
    panel: &mut SettingsPanel,
    command: Command,
    order_wait: Option<Duration>,
) -> Result<()> {
    match command {
        Command::Services => print_services(panel),
        Command::Categories => print_categories(panel),
        Command::AddService(fields) => {
            panel.begin_service_form(None).await?;
            let draft = panel
                .service_form()
                .map(|form| form.draft.clone())
                .unwrap_or_default();
            panel.submit_service_form(fields.apply(draft)).await?;
            print_services(panel);
        }
        Command::EditService { key, fields } => {
            if !panel.services().contains_key(&key) {
                bail!("no service named '{key}'");
            }
            panel.begin_service_form(Some(&key)).await?;
            let draft = panel
                .service_form()
                .map(|form| form.draft.clone())
                .unwrap_or_default();
            panel.submit_service_form(fields.apply(draft)).await?;
            print_services(panel);
        }
        Command::DeleteService { name, yes } => {
            if !yes {
                bail!("refusing to delete service '{name}' without --yes");
            }
            panel.delete_service(&name).await?;
            print_services(panel);
        }
        Command::AddCategory(fields) => {
            panel.show_tab(SettingsTab::Categories);
            panel.begin_category_form(None).await?;
            panel
                .submit_category_form(fields.apply(CategoryEntry::default()))
                .await?;
            print_categories(panel);
        }
        Command::EditCategory { key, fields } => {
            if panel.categories().and_then(|list| list.get(&key)).is_none() {
                bail!("no category named '{key}'");
            }
            panel.show_tab(SettingsTab::Categories);
            panel.begin_category_form(Some(&key)).await?;
            let draft = panel
                .category_form()
                .map(|form| form.draft.clone())
                .unwrap_or_default();
            panel.submit_category_form(fields.apply(draft)).await?;
            print_categories(panel);
        }
        Command::DeleteCategory { name, yes } => {
            if !yes {
                bail!("refusing to delete category '{name}' without --yes");
            }
            panel.show_tab(SettingsTab::Categories);
            panel.delete_category(&name).await?;
            print_categories(panel);
        }
        Command::MoveCategory {
            name,
            over,
            fraction,
        } => {
            panel.show_tab(SettingsTab::Categories);
            let mut events = panel.subscribe_events();
            if !panel.drag_start(&name) {
                bail!("no category named '{name}'");
            }
            if panel.drag_over(&over, fraction).is_none() {
                tracing::info!(category = %name, target = %over, "category already in place");
            }
            panel.drop_on_list();
            let committed = panel
                .drag_end()
                .ok_or_else(|| anyhow!("drag session ended unexpectedly"))?;
            print_categories(panel);
            wait_for_order_save(&mut events, &committed.order, order_wait).await?;
        }
    }
    Ok(())
}

async fn wait_for_order_save(
    events: &mut broadcast::Receiver<PanelEvent>,
    order: &[String],
    wait: Option<Duration>,
) -> Result<()> {
    let outcome = async {
        loop {
            match events.recv().await {
                Ok(PanelEvent::OrderSaved { order }) => return Ok(order),
                Ok(PanelEvent::OrderSaveFailed { message, .. }) => {
                    return Err(anyhow!("category order not saved: {message}"))
                }
                Ok(_) => continue,
                Err(err) => return Err(anyhow!("settings panel event stream closed: {err}")),
            }
        }
    };
    let saved = match wait {
        Some(wait) => tokio::time::timeout(wait, outcome)
            .await
            .with_context(|| format!("timed out saving category order {order:?}"))??,
        None => outcome.await?,
    };
    println!("saved order: {}", saved.join(", "));
    Ok(())
}

fn print_services(panel: &SettingsPanel) {
    if panel.services().is_empty() {
        println!("(no services configured)");
        return;
    }
    for (key, service) in panel.services().iter() {
        println!(
            "{} {key} [{}] {}",
            service.icon, service.category, service.description
        );
    }
}

fn print_categories(panel: &SettingsPanel) {
    let Some(list) = panel.categories() else {
        println!("(categories not loaded)");
        return;
    };
    if list.is_empty() {
        println!("(no categories configured)");
        return;
    }
    for row in list.rows() {
        let marker = if row.state.dragging { "»" } else { "⠿" };
        println!(
            "{marker} {:>2}. {} {}",
            row.index + 1,
            row.data.icon,
            row.data.display_name(row.key)
        );
    }
}
