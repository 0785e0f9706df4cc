use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use futures::TryStreamExt;
use serde::Serialize;
use subfinder_core::{
    identified_user, recommended_target, Catalog, CatalogSync, Config, NewProduct,
    OpenFoodFactsSource, Product, SyncOptions,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "subfinder")]
#[command(version, about = "Find healthier substitutes for food products", long_about = None)]
struct Cli {
    /// Catalog database (defaults to the one in the config file)
    #[arg(long, global = true, env = "SUBFINDER_DB")]
    db: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Search products by name, random products without a query
    Search {
        /// Search query
        query: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show a product with its nutrient levels
    Show {
        /// Product id
        id: i64,
    },
    /// Healthier products sharing a category
    Substitutes {
        /// Product id
        id: i64,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Saved products
    Favorites {
        /// Who is asking
        #[arg(long, global = true, env = "SUBFINDER_USER")]
        user: Option<String>,

        #[command(subcommand)]
        action: FavoriteCommands,
    },
    /// Refresh and grow the catalog from OpenFoodFacts
    Sync {
        /// Number of products to download (default: grows from the current size)
        #[arg(short, long)]
        target: Option<usize>,
        /// Download and normalize without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum FavoriteCommands {
    /// List saved products
    List,
    /// Save a product
    Add {
        /// Product id
        product_id: i64,
        /// Tag to file it under
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Tags already in use
    Tags,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Write a config file with the defaults
    Init,
    /// Print where the config file lives
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subfinder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load config")?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    match command {
        Commands::Config { action } => match action {
            ConfigCommands::Init => {
                let path = config.save().context("Failed to write config")?;
                println!("Wrote {}", path.display());
            }
            ConfigCommands::Path => println!("{}", Config::config_path()?.display()),
        },
        Commands::Search { query, limit } => {
            let catalog = open_catalog(&config, limit)?;
            tracing::info!("Searching for: {:?}", query);
            let products = catalog.search(query.as_deref())?;
            print_products(&products, cli.json)?;
        }
        Commands::Show { id } => {
            let catalog = open_catalog(&config, None)?;
            let product = catalog.get_by_id(id)?;
            if cli.json {
                print_json(&product)?;
            } else {
                print_product_detail(&product);
            }
        }
        Commands::Substitutes { id, limit } => {
            let catalog = open_catalog(&config, limit)?;
            let product = catalog.get_by_id(id)?;
            let substitutes = catalog.find_substitutes(&product, catalog.results_limit())?;
            if !cli.json {
                println!("Substitutes for {} [{}]:", product.name, product.nutriscore);
            }
            print_products(&substitutes, cli.json)?;
        }
        Commands::Favorites { user, action } => {
            let catalog = open_catalog(&config, None)?;
            let user = identified_user(user.as_deref())?;
            match action {
                FavoriteCommands::List => {
                    let saved = catalog.list_favorites(user)?;
                    if cli.json {
                        let rows: Vec<SavedProduct> = saved
                            .iter()
                            .map(|(product, tag)| SavedProduct {
                                tag: tag.as_str(),
                                product,
                            })
                            .collect();
                        print_json(&rows)?;
                    } else if saved.is_empty() {
                        println!("No saved products yet");
                    } else {
                        for (product, tag) in &saved {
                            println!("[{}] {}", tag, product_line(product));
                        }
                    }
                }
                FavoriteCommands::Add { product_id, tag } => {
                    let favorite = catalog.add_favorite(user, product_id, tag.as_deref())?;
                    if cli.json {
                        print_json(&favorite)?;
                    } else {
                        println!("Saved product {} under {}", product_id, favorite.tag);
                    }
                }
                FavoriteCommands::Tags => {
                    for tag in catalog.favorite_tags(user)? {
                        println!("{}", tag);
                    }
                }
            }
        }
        Commands::Sync { target, dry_run } => {
            let catalog = open_catalog(&config, None)?;
            let target = match target {
                Some(target) => target,
                None => recommended_target(
                    catalog.product_count()?,
                    config.sync.growth_factor,
                    config.sync.initial_target,
                ),
            };

            let source = OpenFoodFactsSource::from_config(&config.sync)?;
            let sync = CatalogSync::with_options(source, SyncOptions::from(&config.sync));

            if dry_run {
                tracing::info!("Dry run: fetching up to {} products", target);
                let products: Vec<NewProduct> = sync.fetch_batch(target).try_collect().await?;
                if cli.json {
                    print_json(&products)?;
                } else {
                    for product in &products {
                        println!("{:<16} [{}] {}", product.code, product.nutriscore, product.name);
                    }
                    println!("{} usable products", products.len());
                }
            } else {
                let summary = catalog.run_sync(&sync, target).await?;
                if cli.json {
                    print_json(&summary)?;
                } else {
                    println!("Sync: {}", summary);
                }
                if !summary.is_complete() {
                    eprintln!("Sync stopped early, run it again to continue");
                }
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct SavedProduct<'a> {
    tag: &'a str,
    product: &'a Product,
}

fn open_catalog(config: &Config, limit: Option<usize>) -> anyhow::Result<Catalog> {
    let catalog = Catalog::open(config).with_context(|| {
        format!("Failed to open catalog at {}", config.database.path.display())
    })?;
    Ok(match limit {
        Some(limit) => catalog.with_results_limit(limit),
        None => catalog,
    })
}

fn product_line(product: &Product) -> String {
    format!("#{:<6} [{}] {}", product.id, product.nutriscore, product.name)
}

fn print_products(products: &[Product], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&products);
    }

    if products.is_empty() {
        println!("Nothing found");
    }
    for product in products {
        println!("{}", product_line(product));
    }
    Ok(())
}

fn print_product_detail(product: &Product) {
    println!("{} (#{}, code {})", product.name, product.id, product.code);
    println!("Nutri-Score: {}", product.nutriscore.as_str().to_uppercase());
    if !product.categories.is_empty() {
        println!("Categories: {}", product.categories.join(", "));
    }
    for level in &product.nutrient_levels {
        println!("  - {}", level);
    }
    if !product.link.is_empty() {
        println!("More: {}", product.link);
    }
    if !product.image.is_empty() {
        println!("Image: {}", product.image);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
