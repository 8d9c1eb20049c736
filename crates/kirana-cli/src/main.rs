use clap::{Parser, Subcommand};
use serde::Serialize;

use kirana_api::HttpTransport;
use kirana_core::models::{Address, AddressLabel, PaymentMethod};
use kirana_engine::{OrderService, ProductRef};

#[derive(Debug, Parser)]
#[command(name = "kirana")]
#[command(about = "Order groceries from the storefront without opening it")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Request a login OTP for a phone number.
    Login { phone: String },
    /// Verify the OTP and persist the session.
    Verify { phone: String, otp: String },
    /// Print whether a saved session exists.
    Status,
    /// Drop the saved session.
    Logout,
    /// Search the catalog.
    Search { query: String },
    /// Autocomplete suggestions for a prefix.
    Suggest { prefix: String },
    /// Add a product to the cart, by id or by position in the last search.
    Add {
        /// Product id, or a number prefixed with `#` for a search position.
        item: String,
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Remove units of a product from the cart.
    Remove {
        product_id: String,
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Show the cart.
    Cart,
    /// Empty the cart.
    ClearCart,
    /// Set the delivery location by place name.
    Location { name: String },
    /// List saved addresses.
    Addresses,
    /// Save a new address.
    AddAddress {
        line1: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        line2: Option<String>,
        #[arg(long)]
        landmark: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
    },
    /// Pick a saved address by its position in the list.
    SelectAddress { index: usize },
    /// Proceed from the cart toward payment.
    Checkout,
    /// List available payment methods.
    Payments,
    /// Choose a payment method (cod, upi, card, wallet).
    SelectPayment { method: String },
    /// Enter the detail for the chosen method, e.g. a UPI handle.
    PaymentDetail { method: String, detail: String },
    /// Confirm the payment and place the order.
    Pay,
    /// Check the status of a placed order.
    Order { order_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = kirana_core::load_app_config()?;
    let transport = HttpTransport::new(&config)?;
    let service = OrderService::new(transport, &config);

    match cli.command {
        Commands::Login { phone } => print_json(&service.request_otp(&phone).await?)?,
        Commands::Verify { phone, otp } => {
            print_json(&service.verify_otp(&phone, &otp).await?)?;
        }
        Commands::Status => {
            let logged_in = service.is_logged_in()?;
            print_json(&serde_json::json!({ "logged_in": logged_in }))?;
        }
        Commands::Logout => {
            service.logout()?;
            println!("session cleared");
        }
        Commands::Search { query } => print_json(&service.search(&query).await?)?,
        Commands::Suggest { prefix } => print_json(&service.suggestions(&prefix).await?)?,
        Commands::Add { item, quantity } => {
            let item = parse_item(&item);
            print_json(&service.add_to_cart(&item, quantity).await?)?;
        }
        Commands::Remove {
            product_id,
            quantity,
        } => print_json(&service.remove_from_cart(&product_id, quantity).await?)?,
        Commands::Cart => print_json(&service.get_cart().await?)?,
        Commands::ClearCart => print_json(&service.clear_cart().await?)?,
        Commands::Location { name } => print_json(&service.set_location(&name).await?)?,
        Commands::Addresses => print_json(&service.get_addresses().await?)?,
        Commands::AddAddress {
            line1,
            label,
            line2,
            landmark,
            city,
            state,
            postal_code,
        } => {
            let address = Address {
                id: String::new(),
                label: label
                    .as_deref()
                    .map_or(AddressLabel::Unspecified, AddressLabel::from_raw),
                line1,
                line2,
                landmark,
                city,
                state,
                postal_code,
                is_default: false,
            };
            print_json(&service.add_address(address).await?)?;
        }
        Commands::SelectAddress { index } => print_json(&service.select_address(index).await?)?,
        Commands::Checkout => print_json(&service.checkout().await?)?,
        Commands::Payments => print_json(&service.payment_methods().await?)?,
        Commands::SelectPayment { method } => {
            print_json(&service.select_payment_method(parse_method(&method)?).await?)?;
        }
        Commands::PaymentDetail { method, detail } => {
            print_json(
                &service
                    .enter_payment_detail(parse_method(&method)?, &detail)
                    .await?,
            )?;
        }
        Commands::Pay => print_json(&service.confirm_payment().await?)?,
        Commands::Order { order_id } => print_json(&service.order_status(&order_id).await?)?,
    }

    Ok(())
}

fn parse_item(raw: &str) -> ProductRef {
    raw.strip_prefix('#')
        .and_then(|rest| rest.parse::<usize>().ok())
        .map_or_else(|| ProductRef::Id(raw.to_owned()), ProductRef::Index)
}

fn parse_method(raw: &str) -> anyhow::Result<PaymentMethod> {
    PaymentMethod::from_code(raw)
        .ok_or_else(|| anyhow::anyhow!("unknown payment method: {raw} (try cod, upi, card, wallet)"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
