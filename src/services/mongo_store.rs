use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::{FindOptions, IndexOptions},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use crate::models::{Leg, LegStatus, Order};

use super::order_store::{OrderStore, StoreError};

const ORDERS: &str = "orders";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrderDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    symbol: String,
    schedule_time: bson::DateTime,
    schedule_buy_time: bson::DateTime,
    schedule_sell_time: bson::DateTime,
    price: f64,
    timestamp: bson::DateTime,

    buy_status: LegStatus,
    sell_status: LegStatus,
    buy_executed_at: Option<bson::DateTime>,
    sell_executed_at: Option<bson::DateTime>,
}

impl OrderDocument {
    fn from_order(id: ObjectId, o: &Order) -> Self {
        OrderDocument {
            id,
            symbol: o.symbol.clone(),
            schedule_time: bson::DateTime::from_chrono(o.schedule_time),
            schedule_buy_time: bson::DateTime::from_chrono(o.schedule_buy_time),
            schedule_sell_time: bson::DateTime::from_chrono(o.schedule_sell_time),
            price: o.price,
            timestamp: bson::DateTime::from_chrono(o.timestamp),
            buy_status: o.buy_status,
            sell_status: o.sell_status,
            buy_executed_at: o.buy_executed_at.map(bson::DateTime::from_chrono),
            sell_executed_at: o.sell_executed_at.map(bson::DateTime::from_chrono),
        }
    }

    fn into_order(self) -> Order {
        Order {
            id: self.id.to_hex(),
            symbol: self.symbol,
            schedule_time: self.schedule_time.to_chrono(),
            schedule_buy_time: self.schedule_buy_time.to_chrono(),
            schedule_sell_time: self.schedule_sell_time.to_chrono(),
            price: self.price,
            timestamp: self.timestamp.to_chrono(),
            buy_status: self.buy_status,
            sell_status: self.sell_status,
            buy_executed_at: self.buy_executed_at.map(|d| d.to_chrono()),
            sell_executed_at: self.sell_executed_at.map(|d| d.to_chrono()),
        }
    }
}

fn leg_fields(leg: Leg) -> (&'static str, &'static str) {
    match leg {
        Leg::Buy => ("buy_status", "buy_executed_at"),
        Leg::Sell => ("sell_status", "sell_executed_at"),
    }
}

fn pending_filter() -> Document {
    let (buy_status, _) = leg_fields(Leg::Buy);
    let (sell_status, _) = leg_fields(Leg::Sell);
    doc! { "$or": [ { buy_status: "pending" }, { sell_status: "pending" } ] }
}

fn parse_id(id: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

pub struct MongoOrderStore {
    db: Database,
}

impl MongoOrderStore {
    pub fn new(db: Database) -> Self {
        MongoOrderStore { db }
    }

    fn orders(&self) -> Collection<OrderDocument> {
        self.db.collection::<OrderDocument>(ORDERS)
    }

    async fn collect(&self, filter: Document, opts: Option<FindOptions>) -> Result<Vec<Order>, StoreError> {
        let mut cursor = self.orders().find(filter, opts).await?;

        let mut items: Vec<Order> = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?.into_order());
        }
        Ok(items)
    }
}

#[async_trait]
impl OrderStore for MongoOrderStore {
    async fn create(&self, order: Order) -> Result<Order, StoreError> {
        let id = ObjectId::new();
        let document = OrderDocument::from_order(id, &order);
        self.orders().insert_one(&document, None).await?;
        Ok(document.into_order())
    }

    async fn list_by_timestamp_desc(&self) -> Result<Vec<Order>, StoreError> {
        let find_opts = FindOptions::builder().sort(doc! { "timestamp": -1 }).build();
        self.collect(doc! {}, Some(find_opts)).await
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let oid = parse_id(id)?;
        let found = self.orders().find_one(doc! { "_id": oid }, None).await?;
        Ok(found.map(OrderDocument::into_order))
    }

    async fn mark_leg_executed(&self, id: &str, leg: Leg, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let oid = parse_id(id)?;
        let (status, executed_at) = leg_fields(leg);

        // the status filter makes the transition happen at most once
        let res = self
            .orders()
            .update_one(
                doc! { "_id": oid, status: "pending" },
                doc! { "$set": { status: "executed", executed_at: bson::DateTime::from_chrono(at) } },
                None,
            )
            .await?;

        Ok(res.modified_count > 0)
    }

    async fn list_pending(&self) -> Result<Vec<Order>, StoreError> {
        self.collect(pending_filter(), None).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    let col = db.collection::<Document>(ORDERS);

    // listing sorts on timestamp desc
    let by_timestamp = IndexModel::builder()
        .keys(doc! { "timestamp": -1 })
        .options(IndexOptions::builder().name("timestamp_desc".to_string()).build())
        .build();
    col.create_index(by_timestamp, None).await?;

    // startup re-arm scan
    let by_status = IndexModel::builder()
        .keys(doc! { "buy_status": 1, "sell_status": 1 })
        .build();
    col.create_index(by_status, None).await?;

    Ok(())
}
