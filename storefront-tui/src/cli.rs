use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::json;

use storefront_core::{FeedConfig, FeedLoader, PageRequest, Product};

use crate::client::{CatalogClient, ClientPages};

/// Determine whether output should be JSON.
/// JSON is used when: --json flag is set, OR stdout is not a terminal (piped).
pub fn use_json(flag: bool) -> bool {
    flag || !io::stdout().is_terminal()
}

fn print_products(products: &[Product]) {
    for p in products {
        let mut tags = String::new();
        if p.is_on_sale() {
            tags.push_str(" [sale]");
        }
        if !p.in_stock {
            tags.push_str(" [sold out]");
        }
        println!("{:<20} {:<32} {:>10}{}", p.id, p.name, p.display_price(), tags);
    }
}

/// Print a structured error and exit with code 1.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let msg = format!("{:#}", err);
        eprintln!("{}", json!({ "error": msg }));
    } else {
        eprintln!("error: {:#}", err);
    }
    std::process::exit(1);
}

pub async fn collections(client: &dyn CatalogClient, json: bool) -> Result<()> {
    let collections = client.collections().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&collections)?);
    } else {
        for c in &collections {
            println!("{:<20} {:<32} {:>5}", c.key, c.title, c.product_count);
        }
    }
    Ok(())
}

pub async fn page(
    client: &dyn CatalogClient,
    collection: &str,
    page: usize,
    page_size: usize,
    json: bool,
) -> Result<()> {
    let result = client
        .page(PageRequest::new(collection, page, page_size))
        .await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_products(&result.items);
        println!(
            "-- page {} ({} items){}",
            result.page,
            result.items.len(),
            if result.has_more { ", more available" } else { "" }
        );
    }
    Ok(())
}

/// Outcome of draining a collection through a feed loader.
#[derive(Debug)]
pub struct FeedDump {
    pub items: Vec<Product>,
    pub pages: usize,
    pub has_more: bool,
}

/// Load `collection` page after page with the "load more" control until it
/// runs dry or `max_pages` pages are in.
pub async fn drain_feed(
    client: Arc<dyn CatalogClient>,
    collection: &str,
    config: FeedConfig,
    max_pages: Option<usize>,
) -> Result<FeedDump> {
    let seed = client
        .page(PageRequest::new(collection, 1, config.page_size))
        .await?;
    let mut loader = FeedLoader::mount(Arc::new(ClientPages(client)), collection, seed, config);

    let mut pages = 1;
    while max_pages.map_or(true, |max| pages < max) {
        let before = loader.state().items.len();
        if !loader.trigger_manual_load().is_started() {
            break;
        }
        loader.run_until_idle().await;
        if let Some(err) = &loader.state().error {
            bail!("{}", err.message());
        }
        if loader.state().items.len() > before {
            pages += 1;
        }
    }

    let state = loader.state();
    let dump = FeedDump {
        items: state.items.clone(),
        pages,
        has_more: state.has_more,
    };
    loader.unmount();
    Ok(dump)
}

pub async fn feed(
    client: Arc<dyn CatalogClient>,
    collection: &str,
    config: FeedConfig,
    max_pages: Option<usize>,
    json: bool,
) -> Result<()> {
    let dump = drain_feed(client, collection, config, max_pages).await?;
    if json {
        println!(
            "{}",
            json!({
                "collection": collection,
                "pages": dump.pages,
                "has_more": dump.has_more,
                "items": dump.items,
            })
        );
    } else {
        print_products(&dump.items);
        println!(
            "-- {} items over {} pages{}",
            dump.items.len(),
            dump.pages,
            if dump.has_more { ", more available" } else { "" }
        );
    }
    Ok(())
}
