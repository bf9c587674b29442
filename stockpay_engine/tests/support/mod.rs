#![allow(dead_code)]
use std::sync::Arc;

use chrono::Duration;
use log::*;
use rust_decimal::Decimal;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use stockpay_engine::{
    catalog::Catalog,
    events::EventProducers,
    test_utils::{
        fakes::{FakeNode, FakeOracle},
        prepare_env::{prepare_test_env, random_db_path},
    },
    traits::FulfilmentDatabase,
    InventoryApi,
    OrderFlowApi,
    PriceQuoter,
    ReconciliationApi,
    RefundApi,
    SqliteDatabase,
};

pub const CATALOG: &str = r#"
    asset = "dash"

    [[regions]]
    id = "north"
    label = "North side"

    [[regions]]
    id = "south"
    label = "South side"

    [[products]]
    name = "Widget"
    aliases = ["w"]
    prices = { "0.5" = "17.50", "1.0" = "30" }

    [[products]]
    name = "Gadget"
    aliases = ["g"]
    prices = { "1.0" = "45", "2.0" = "80" }
"#;

pub const REFUND_ADDRESS: &str = "XrefundAddress0123456789abcdefghij";

pub struct Harness {
    pub db: SqliteDatabase,
    pub node: FakeNode,
    pub oracle: FakeOracle,
    pub catalog: Arc<Catalog>,
}

impl Harness {
    pub async fn new(rate: Decimal) -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let catalog = Arc::new(Catalog::from_toml_str(CATALOG).expect("Invalid test catalog"));
        Self { db, node: FakeNode::new(), oracle: FakeOracle::new(rate), catalog }
    }

    pub fn order_flow(&self) -> OrderFlowApi<SqliteDatabase, FakeNode, FakeOracle> {
        let quoter = PriceQuoter::new(self.oracle.clone(), Arc::clone(&self.catalog));
        OrderFlowApi::new(self.db.clone(), self.node.clone(), quoter)
    }

    pub fn inventory(&self) -> InventoryApi<SqliteDatabase> {
        InventoryApi::new(self.db.clone(), Arc::clone(&self.catalog), Duration::minutes(30))
    }

    pub fn reconciliation(&self, producers: EventProducers) -> ReconciliationApi<SqliteDatabase, FakeNode> {
        ReconciliationApi::new(self.db.clone(), self.node.clone(), producers)
    }

    pub fn refunds(&self, producers: EventProducers) -> RefundApi<SqliteDatabase, FakeNode> {
        RefundApi::new(self.db.clone(), self.node.clone(), producers, Duration::minutes(30))
    }

    pub async fn tear_down(self) {
        let url = self.db.url().to_string();
        self.db.pool().close().await;
        if let Err(e) = Sqlite::drop_database(&url).await {
            warn!("🚀️ Could not drop test database {url}: {e}");
        }
    }
}
