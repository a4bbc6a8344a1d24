pub mod client;

pub use client::{GatewayEnvironment, GatewaySettings, HostedCheckoutClient};
