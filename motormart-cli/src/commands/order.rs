//! Order command handlers
//!
//! Submits orders and shows their confirmation state.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use motormart_core::domain::order::{Order, OrderStatus};
use motormart_core::dto::order::OrderRequest;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::config::Config;

/// Order subcommands
#[derive(Subcommand)]
pub enum OrderCommands {
    /// Submit an order for a product in the user's cart
    Submit {
        /// Product ID
        product_id: Uuid,

        /// Ordering user
        #[arg(long, env = "MOTORMART_USER_ID")]
        user: Uuid,

        /// Rental start (RFC 3339), rent products only
        #[arg(long)]
        initial_time: Option<String>,

        /// Rental end (RFC 3339), rent products only
        #[arg(long)]
        end_time: Option<String>,
    },
    /// Get order details
    Get {
        /// Order ID
        id: Uuid,
    },
    /// List a user's orders
    List {
        #[arg(long, env = "MOTORMART_USER_ID")]
        user: Uuid,
    },
}

/// Handle order commands
pub async fn handle_order_command(command: OrderCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.api_url);

    match command {
        OrderCommands::Submit {
            product_id,
            user,
            initial_time,
            end_time,
        } => {
            let req = OrderRequest {
                initial_time,
                end_time,
                status: None,
            };
            submit_order(&client, user, product_id, req).await
        }
        OrderCommands::Get { id } => get_order(&client, id).await,
        OrderCommands::List { user } => list_orders(&client, user).await,
    }
}

async fn submit_order(
    client: &ApiClient,
    user_id: Uuid,
    product_id: Uuid,
    req: OrderRequest,
) -> Result<()> {
    let reply = client.submit_order(user_id, product_id, &req).await?;

    if !reply.is_success() {
        anyhow::bail!("{} ({})", reply.body.message, reply.status);
    }

    println!("{} {}", "✓".green(), reply.body.message.green());
    if let Some(order) = &reply.body.order {
        println!();
        print_order_details(order);
        println!();
        println!(
            "{}",
            "Confirmation is asynchronous; check again with `motormart order get`.".dimmed()
        );
    }

    Ok(())
}

async fn get_order(client: &ApiClient, id: Uuid) -> Result<()> {
    let reply = client.get_order(id).await?;

    match (reply.is_success(), &reply.body.order) {
        (true, Some(order)) => print_order_details(order),
        _ => anyhow::bail!("{} ({})", reply.body.message, reply.status),
    }

    Ok(())
}

async fn list_orders(client: &ApiClient, user_id: Uuid) -> Result<()> {
    let reply = client.list_orders(user_id).await?;
    if reply.status == 404 && reply.body.data.is_empty() {
        println!("{}", reply.body.message.yellow());
        return Ok(());
    }
    if !reply.is_success() {
        anyhow::bail!("{} ({})", reply.body.message, reply.status);
    }

    let orders = reply.body.data;
    if orders.is_empty() {
        println!("{}", "No orders found.".yellow());
    } else {
        println!("{}", format!("Found {} order(s):", orders.len()).bold());
        println!();
        for order in &orders {
            println!("  {} Order {}", "▸".cyan(), order.id.to_string().dimmed());
            println!("    Status:  {}", colorize_status(order.status));
            println!("    Product: {}", order.product_id.to_string().dimmed());
            println!("    Total:   {:.2}", order.total_amount);
            println!();
        }
    }

    Ok(())
}

fn print_order_details(order: &Order) {
    println!("{}", "Order Details:".bold());
    println!("  ID:          {}", order.id.to_string().cyan());
    println!("  Status:      {}", colorize_status(order.status));
    println!("  User:        {}", order.user_id);
    println!("  Product:     {}", order.product_id);
    println!("  Choice:      {}", order.choice);
    if let Some(rental) = &order.rental {
        println!(
            "  Rental:      {}h → {}h ({} hour(s))",
            rental.initial_time, rental.end_time, rental.rent_time
        );
    }
    println!("  Total:       {:.2}", order.total_amount);
    println!(
        "  Created:     {}",
        order.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn colorize_status(status: OrderStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        OrderStatus::Pending => status_str.yellow(),
        OrderStatus::Confirmed => status_str.green(),
        OrderStatus::Shipped | OrderStatus::Delivered => status_str.cyan(),
        OrderStatus::Cancelled => status_str.dimmed(),
    }
}
