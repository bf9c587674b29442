use std::collections::HashSet;

use chrono::{Duration, Utc};
use log::*;
use rust_decimal_macros::dec;
use spg_common::CoinAmount;
use stockpay_engine::{
    db_types::{NewOrder, NewStockItem, Sku},
    traits::{FulfilmentDatabase, FulfilmentResult, InventoryManagement, OrderManagement},
    SqliteDatabase,
};
use support::Harness;
use tokio::runtime::Builder;

mod support;

async fn stock_up(db: &SqliteDatabase, sku: &Sku, count: usize) {
    for i in 0..count {
        db.add_stock(NewStockItem::new(sku.clone(), format!("payload-{i}"))).await.expect("Error adding stock");
    }
}

async fn claim_concurrently(items: usize, claims: usize) {
    let h = Harness::new(dec!(30)).await;
    let sku = Sku::new("north", "Widget", "1.0");
    stock_up(&h.db, &sku, items).await;
    let tasks = (0..claims)
        .map(|_| {
            let db = h.db.clone();
            let sku = sku.clone();
            tokio::spawn(async move { db.claim_one(&sku).await })
        })
        .collect::<Vec<_>>();
    let mut claimed = Vec::new();
    for task in tasks {
        if let Some(item) = task.await.expect("Claim task panicked").expect("Claim failed") {
            claimed.push(item.id);
        }
    }
    info!("🚀️ {items} items, {claims} claims: {} succeeded", claimed.len());
    assert_eq!(claimed.len(), items.min(claims));
    let unique = claimed.iter().collect::<HashSet<_>>();
    assert_eq!(unique.len(), claimed.len(), "an item was handed out twice");
    assert_eq!(h.db.available_count(&(&sku).into()).await.unwrap(), (items.saturating_sub(claims)) as i64);
    h.tear_down().await;
}

#[test]
fn concurrent_claims_never_share_an_item() {
    let rt = Builder::new_multi_thread().worker_threads(4).enable_all().build().unwrap();
    rt.block_on(async {
        claim_concurrently(1, 2).await;
        claim_concurrently(3, 8).await;
        claim_concurrently(5, 5).await;
        claim_concurrently(6, 2).await;
        claim_concurrently(0, 4).await;
    });
}

#[test]
fn claims_take_the_oldest_item_first() {
    let rt = Builder::new_multi_thread().worker_threads(2).enable_all().build().unwrap();
    rt.block_on(async {
        let h = Harness::new(dec!(30)).await;
        let sku = Sku::new("south", "Gadget", "2.0");
        stock_up(&h.db, &sku, 3).await;
        let first = h.db.claim_one(&sku).await.unwrap().unwrap();
        let second = h.db.claim_one(&sku).await.unwrap().unwrap();
        assert_eq!(first.payload_ref, "payload-0");
        assert_eq!(second.payload_ref, "payload-1");
        let stored = h.db.fetch_stock_item(first.id).await.unwrap().expect("Claimed item should still exist");
        assert!(stored.used);
        assert!(stored.claimed_at.is_some());
        assert_eq!(stored.order_id, None);
        assert!(h.db.claim_one(&Sku::new("north", "Gadget", "2.0")).await.unwrap().is_none());
        h.tear_down().await;
    });
}

#[test]
fn concurrent_fulfilment_delivers_an_order_once() {
    let rt = Builder::new_multi_thread().worker_threads(4).enable_all().build().unwrap();
    rt.block_on(async {
        let h = Harness::new(dec!(30)).await;
        let sku = Sku::new("north", "Widget", "1.0");
        stock_up(&h.db, &sku, 3).await;
        let now = Utc::now();
        let order = h
            .db
            .insert_order(NewOrder {
                owner: "alice".into(),
                sku: sku.clone(),
                usd_price: dec!(30),
                rate: dec!(30),
                crypto_amount: CoinAmount::from_coins(1),
                address: "XdepositAddressConcurrent".into(),
                created_at: now,
                expires_at: now + Duration::minutes(15),
            })
            .await
            .unwrap();
        let id = order.id;
        let tasks = (0..4)
            .map(|_| {
                let db = h.db.clone();
                tokio::spawn(async move { db.fulfil_order(id).await })
            })
            .collect::<Vec<_>>();
        // Not paid yet, so nobody can deliver
        for task in tasks {
            let result = task.await.unwrap().unwrap();
            assert!(matches!(result, FulfilmentResult::NotDeliverable(_)));
        }
        h.db.mark_paid(id).await.unwrap().expect("Order should have been unpaid");

        let tasks = (0..4)
            .map(|_| {
                let db = h.db.clone();
                tokio::spawn(async move { db.fulfil_order(id).await })
            })
            .collect::<Vec<_>>();
        let mut delivered = 0;
        for task in tasks {
            if task.await.unwrap().unwrap().is_delivered() {
                delivered += 1;
            }
        }
        assert_eq!(delivered, 1);
        assert_eq!(h.db.available_count(&(&sku).into()).await.unwrap(), 2);
        let item = h.db.fetch_item_for_order(id).await.unwrap().unwrap();
        assert_eq!(item.order_id, Some(id));
        h.tear_down().await;
    });
}
