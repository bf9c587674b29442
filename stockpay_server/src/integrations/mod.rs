mod json_rpc_node;
mod notifier;
mod price_oracle;

pub use json_rpc_node::JsonRpcNode;
pub use notifier::{LogNotifier, Notification, NotificationSink, Notifier, NotifierError, WebhookNotifier};
pub use price_oracle::CoinGeckoOracle;
