use std::env;
use clap::{Args, Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

/// Staff client for the ordering api
#[derive(Parser, Debug)]
#[command(name = "little-lemon")]
#[command(about = "client cli used by restaurant staffs to interact with the server", version, long_about = None
)]
struct Cli {
    /// api token, falls back to LITTLE_LEMON_TOKEN
    #[arg(long, global = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    /// menu related ops
    #[command(arg_required_else_help = true)]
    Menu(MenuArgs),
    /// cart related ops
    #[command(arg_required_else_help = true)]
    Cart(CartArgs),
    /// order related ops
    #[command(arg_required_else_help = true)]
    Order(OrderArgs),
}

#[derive(Debug, Args)]
struct MenuArgs {
    #[command(subcommand)]
    command: MenuCmds,
}

#[derive(Debug, Subcommand)]
enum MenuCmds {
    List {
        #[arg(long, help = "Case-insensitive search over titles.")]
        search: Option<String>,
        #[arg(long, help = "Only items of this category id.")]
        category: Option<i64>,
        #[arg(long, help = "price, -price, category or -category.")]
        ordering: Option<String>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        page: Option<u32>,
    },
    #[command(arg_required_else_help = true)]
    Show { id: i64 },
}

#[derive(Debug, Args)]
struct CartArgs {
    #[command(subcommand)]
    command: CartCmds,
}

#[derive(Debug, Subcommand)]
enum CartCmds {
    #[command(arg_required_else_help = true)]
    Add {
        #[arg(long, help = "Id of menu item to add.", value_name = "MENU_ITEM_ID")]
        item: i64,
        #[arg(short = 'q', long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..=999))]
        quantity: i32,
    },
    List,
    Clear,
}

#[derive(Debug, Args)]
struct OrderArgs {
    #[command(subcommand)]
    command: OrderCmds,
}

#[derive(Debug, Subcommand)]
enum OrderCmds {
    /// turn the cart into an order
    Place,
    List,
    #[command(arg_required_else_help = true)]
    Show { id: i64 },
    #[command(arg_required_else_help = true)]
    Assign {
        id: i64,
        #[arg(long, help = "User id of the delivery crew member.", value_name = "USER_ID")]
        crew: i64,
    },
    #[command(arg_required_else_help = true)]
    Deliver { id: i64 },
}

const DEFAULT_HOST: &str = "http://localhost:8080";

struct Api {
    client: Client,
    host: String,
    token: Option<String>,
}

impl Api {
    fn request(&self, builder: impl FnOnce(&Client, String) -> RequestBuilder, path: &str) -> RequestBuilder {
        let req = builder(&self.client, format!("{}/api/{}", self.host, path));
        match &self.token {
            Some(token) => req.header("Authorization", format!("Token {token}")),
            None => req,
        }
    }
}

async fn report(res: Response, action: &str) -> Result<(), anyhow::Error> {
    let status = res.status();
    let body = res.json::<Value>().await.unwrap_or(Value::Null);
    match status {
        StatusCode::OK | StatusCode::CREATED => {
            println!("{} succeeded", action);
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        StatusCode::UNAUTHORIZED => println!("{} failed, missing or invalid token", action),
        StatusCode::FORBIDDEN => println!("{} failed, you are not allowed to do this", action),
        StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
            println!("{} failed, {}", action, body["message"].as_str().unwrap_or("unknown reason"));
        }
        unexpected => {
            println!("got unexpected status code, {}", unexpected);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Cli::parse();
    let api = Api {
        client: Client::new(),
        host: env::var("LITTLE_LEMON_HOST").unwrap_or(DEFAULT_HOST.to_string()),
        token: args.token.or_else(|| env::var("LITTLE_LEMON_TOKEN").ok()),
    };

    match args.command {
        Commands::Menu(menu) => match menu.command {
            MenuCmds::List { search, category, ordering, page } => {
                let mut query = vec![];
                if let Some(search) = search {
                    query.push(("search", search));
                }
                if let Some(category) = category {
                    query.push(("category", category.to_string()));
                }
                if let Some(ordering) = ordering {
                    query.push(("ordering", ordering));
                }
                if let Some(page) = page {
                    query.push(("page", page.to_string()));
                }
                let res = api.request(Client::get, "menu-items").query(&query).send().await?;
                report(res, "listing menu").await?;
            }
            MenuCmds::Show { id } => {
                let res = api.request(Client::get, &format!("menu-items/{id}")).send().await?;
                report(res, "fetching menu item").await?;
            }
        },
        Commands::Cart(cart) => match cart.command {
            CartCmds::Add { item, quantity } => {
                println!("adding {} x menu item={} to cart", quantity, item);
                let res = api
                    .request(Client::post, "cart/menu-items")
                    .json(&serde_json::json!({
                        "menuitem": item,
                        "quantity": quantity,
                    }))
                    .send()
                    .await?;
                report(res, "adding to cart").await?;
            }
            CartCmds::List => {
                let res = api.request(Client::get, "cart/menu-items").send().await?;
                report(res, "listing cart").await?;
            }
            CartCmds::Clear => {
                let res = api.request(Client::delete, "cart/menu-items").send().await?;
                report(res, "clearing cart").await?;
            }
        },
        Commands::Order(order) => match order.command {
            OrderCmds::Place => {
                let res = api.request(Client::post, "orders").send().await?;
                report(res, "placing order").await?;
            }
            OrderCmds::List => {
                let res = api.request(Client::get, "orders").send().await?;
                report(res, "listing orders").await?;
            }
            OrderCmds::Show { id } => {
                let res = api.request(Client::get, &format!("orders/{id}")).send().await?;
                report(res, "fetching order").await?;
            }
            OrderCmds::Assign { id, crew } => {
                println!("assigning order={} to delivery crew={}", id, crew);
                let res = api
                    .request(Client::put, &format!("orders/{id}"))
                    .json(&serde_json::json!({ "delivery_crew": crew }))
                    .send()
                    .await?;
                report(res, "assigning crew").await?;
            }
            OrderCmds::Deliver { id } => {
                let res = api
                    .request(Client::patch, &format!("orders/{id}"))
                    .json(&serde_json::json!({ "status": "delivered" }))
                    .send()
                    .await?;
                report(res, "marking delivered").await?;
            }
        },
    };
    Ok(())
}
