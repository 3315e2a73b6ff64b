//! CLI commands

use anyhow::{Result, bail};
use catalog_http::CatalogClient;
use catalog_http::client::Navigator;
use catalog_http::types::{Product, ProductInput};
use clap::{Args, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the access token
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "CATALOG_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Signup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "CATALOG_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored access token
    Logout,

    /// Manage products
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// List all products
    List,

    /// Add a product
    Create(ProductArgs),

    /// Replace a product's fields
    Update {
        /// Product id
        id: String,

        #[command(flatten)]
        fields: ProductArgs,
    },

    /// Delete a product
    Delete {
        /// Product id
        id: String,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Args)]
pub struct ProductArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    price: f64,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, default_value = "")]
    category: String,

    /// Image URL (repeatable, or comma-separated)
    #[arg(long = "image")]
    images: Vec<String>,
}

impl From<ProductArgs> for ProductInput {
    fn from(args: ProductArgs) -> Self {
        Self {
            title: args.title,
            price: args.price,
            description: args.description,
            category: args.category,
            images: Vec::new(),
        }
        .with_image_urls(&args.images.join(","))
    }
}

/// Tells the user to log in again when the session cannot be refreshed
pub struct LoginPrompt;

impl Navigator for LoginPrompt {
    fn redirect_to_login(&self) {
        warn!("Session expired");
        eprintln!("Your session has expired. Run `catalog login` to sign in again.");
    }
}

impl Commands {
    pub async fn execute(self, client: &CatalogClient) -> Result<()> {
        match self {
            Self::Login { email, password } => {
                let response = client.login(email, password).await?;
                if response.access_token.is_none() {
                    warn!("Login response carried no access token");
                }
                println!(
                    "{}",
                    response.message.as_deref().unwrap_or("Login Successful")
                );
                Ok(())
            }
            Self::Signup {
                name,
                email,
                password,
            } => {
                let response = client.signup(name, email, password).await?;
                println!(
                    "{}",
                    response.message.as_deref().unwrap_or("Signup Successful")
                );
                println!("Run `catalog login` to sign in.");
                Ok(())
            }
            Self::Logout => {
                client.logout().await?;
                println!("Logged out");
                Ok(())
            }
            Self::Products { command } => command.execute(client).await,
        }
    }
}

impl ProductCommands {
    pub async fn execute(self, client: &CatalogClient) -> Result<()> {
        if !client.is_logged_in().await? {
            bail!("Not logged in. Run `catalog login` first.");
        }

        match self {
            Self::List => {
                let products = client.list_products().await?;
                info!(count = products.len(), "Fetched products");
                print_products(&products);
                Ok(())
            }
            Self::Create(fields) => {
                client.create_product(&fields.into()).await?;
                println!("Product Created");
                Ok(())
            }
            Self::Update { id, fields } => {
                client.update_product(&id, &fields.into()).await?;
                println!("Product Updated");
                Ok(())
            }
            Self::Delete { id, yes } => {
                if !yes && !confirm(&format!("Delete product {id}?")).await? {
                    println!("Cancelled");
                    return Ok(());
                }
                let message = client.delete_product(&id).await?;
                println!("{}", message.as_deref().unwrap_or("Product Deleted"));
                Ok(())
            }
        }
    }
}

fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products");
        return;
    }

    for product in products {
        println!(
            "{}  {}  {:.2}  {}",
            product.id, product.title, product.price, product.category
        );
        if !product.description.is_empty() {
            println!("    {}", product.description);
        }
        for image in &product.images {
            println!("    {}", image.url);
        }
    }
}

async fn confirm(question: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{question} [y/N] ").as_bytes())
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
