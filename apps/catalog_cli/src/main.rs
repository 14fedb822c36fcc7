use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client_core::{
    http::{HttpAuthSource, HttpCatalogSource},
    memory::InMemoryCatalogSource,
    settings::{load_settings, Settings},
    CatalogController, CatalogSource, LoginCoordinator, LoginOutcome, LoginView, NextPage,
};
use shared::domain::{CatalogItem, Credentials, Lot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catalog_cli", about = "Browse, search and sign in to a lot catalog")]
struct Args {
    /// Overrides server_url from catalog.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    /// Serve the catalog from a JSON array of items instead of the server.
    #[arg(long)]
    fixture: Option<PathBuf>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    page_size: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the first page, then page forward.
    Browse {
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Search by a partial item; unset fields are not filtered on.
    Search {
        #[command(flatten)]
        template: TemplateArgs,
        /// Clear the search afterwards and reload the first page.
        #[arg(long)]
        then_clear: bool,
    },
    Login {
        #[arg(long, default_value = "")]
        user: String,
        #[arg(long, default_value = "")]
        password: String,
    },
}

#[derive(ClapArgs, Debug)]
struct TemplateArgs {
    #[arg(long)]
    lot: Option<i64>,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    author: String,
    #[arg(long, default_value = "")]
    genre: String,
    #[arg(long, default_value = "")]
    description: String,
}

impl From<TemplateArgs> for CatalogItem {
    fn from(args: TemplateArgs) -> Self {
        let template = CatalogItem::template()
            .with_title(args.title)
            .with_author(args.author)
            .with_genre(args.genre)
            .with_description(args.description);
        match args.lot {
            Some(lot) => template.with_lot(Lot(lot)),
            None => template,
        }
    }
}

struct ConsoleLoginView;

impl LoginView for ConsoleLoginView {
    fn display_alert(&self, message: &str) {
        println!("{message}");
    }

    fn dismiss(&self) {
        println!("(login closed)");
    }
}

fn print_items(items: &[CatalogItem]) {
    println!("-- {} item(s) --", items.len());
    for item in items {
        let lot = item
            .lot
            .map(|lot| lot.to_string())
            .unwrap_or_else(|| "?".into());
        println!("{lot:>6}  {}  /  {}  [{}]", item.title, item.author, item.genre);
    }
}

fn catalog_source(
    fixture: Option<&PathBuf>,
    settings: &Settings,
) -> Result<Arc<dyn CatalogSource>> {
    Ok(match fixture {
        Some(path) => {
            let source = InMemoryCatalogSource::from_json_file(path, settings.page_size as usize)?;
            info!(items = source.len(), path = %path.display(), "serving catalog from fixture");
            Arc::new(source)
        }
        None => Arc::new(HttpCatalogSource::from_settings(settings)?),
    })
}

async fn browse(controller: &CatalogController, pages: u32) -> Result<()> {
    let _listing = controller.items().subscribe(|items| print_items(items));

    controller.load_initial_page().await?;
    for _ in 1..pages {
        match controller.load_next_page().await? {
            NextPage::Requested { page, .. } => info!(%page, "page loaded"),
            other => info!(?other, "page not requested"),
        }
    }
    println!("cursor: {}", controller.last_key());
    Ok(())
}

async fn search(
    controller: &CatalogController,
    template: CatalogItem,
    then_clear: bool,
) -> Result<()> {
    let _filter = controller.active_filter().subscribe(|filter| match filter {
        Some(filter) => println!("filter: {filter:?}"),
        None => println!("filter: none"),
    });

    if template.is_empty_template() {
        warn!("search template has no fields set; every item matches");
    }
    controller.search_by_template(template).await?;
    print_items(&controller.items().get());

    if then_clear {
        controller.clear_search().await?;
        print_items(&controller.items().get());
    }
    Ok(())
}

async fn login(settings: &Settings, user: String, password: String) -> Result<()> {
    let coordinator = LoginCoordinator::new(
        Arc::new(ConsoleLoginView),
        Arc::new(HttpAuthSource::from_settings(settings)?),
    );

    match coordinator.submit(Credentials::new(user, password)).await? {
        LoginOutcome::Succeeded => {
            if let Some(status) = coordinator.login_status().get() {
                info!(logged_in = status.logged_in, user = ?status.user, "login status");
            }
            Ok(())
        }
        outcome => bail!("login not completed ({outcome:?})"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(page_size) = args.page_size {
        settings.page_size = page_size;
    }

    match args.command {
        Command::Browse { pages } => {
            let controller =
                CatalogController::with_source(catalog_source(args.fixture.as_ref(), &settings)?);
            browse(&controller, pages).await
        }
        Command::Search {
            template,
            then_clear,
        } => {
            let controller =
                CatalogController::with_source(catalog_source(args.fixture.as_ref(), &settings)?);
            search(&controller, template.into(), then_clear).await
        }
        Command::Login { user, password } => login(&settings, user, password).await,
    }
}
