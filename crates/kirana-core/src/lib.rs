pub mod app_config;
pub mod config;
pub mod models;
pub mod outcome;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use models::{
    Address, AddressLabel, Cart, CartItem, Order, OrderStatus, PaymentMethod, PaymentOption,
    Product, SearchResult,
};
pub use outcome::{AddOutcome, AuthStatus, CheckoutState};
