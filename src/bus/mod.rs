//! The topic exchange: routing keys, queues, payload shapes, and the
//! columnar `table_desc` wire encoding. Transport lives in `bus::redis_bus`;
//! reconnect pacing lives in `bus::backoff`.

pub mod backoff;
pub mod redis_bus;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One of the five routing keys in the topic exchange. Each maps to a
/// Redis stream used as its persistent queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    DatabaseSave,
    DatabaseRead,
    RequestedProfit,
    RequestedTrends,
    OrdersMake,
}

impl Topic {
    pub fn routing_key(self) -> &'static str {
        match self {
            Topic::DatabaseSave => "database.save",
            Topic::DatabaseRead => "database.read",
            Topic::RequestedProfit => "requested.profit",
            Topic::RequestedTrends => "requested.trends",
            Topic::OrdersMake => "orders.make",
        }
    }

    /// The Redis stream key backing this topic's persistent queue.
    pub fn queue(self) -> &'static str {
        match self {
            Topic::DatabaseSave => "database_save",
            Topic::DatabaseRead => "database_read",
            Topic::RequestedProfit => "requested_profit",
            Topic::RequestedTrends => "requested_trends",
            Topic::OrdersMake => "orders_make",
        }
    }
}

/// `database.save` payload: a table name plus a columnar row description,
/// `{column: {row_index: value}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSaveMessage {
    pub table_name: String,
    pub table_desc: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotRequestType {
    Profit,
    Trends,
}

/// `database.read` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseReadMessage {
    #[serde(rename = "type")]
    pub request_type: SnapshotRequestType,
    pub stamp: Option<i64>,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// `orders.make` payload.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OrdersMakeMessage {
    pub stamp: Option<i64>,
    pub lookahead: Option<i64>,
}

/// Encodes rows into the columnar `table_desc` shape: one key per
/// struct field, each holding a `{row_index: value}` object.
pub fn to_table_desc<T: Serialize>(rows: &[T]) -> Result<serde_json::Value, serde_json::Error> {
    let mut columns = serde_json::Map::new();

    for (row_idx, row) in rows.iter().enumerate() {
        let serde_json::Value::Object(fields) = serde_json::to_value(row)? else {
            continue;
        };
        for (column, value) in fields {
            let entry = columns
                .entry(column)
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if let serde_json::Value::Object(rows_by_index) = entry {
                rows_by_index.insert(row_idx.to_string(), value);
            }
        }
    }

    Ok(serde_json::Value::Object(columns))
}

/// Decodes a columnar `table_desc` back into typed rows, reassembling each
/// row index across every column before deserializing it as `T`.
pub fn from_table_desc<T: DeserializeOwned>(
    table_desc: &serde_json::Value,
) -> Result<Vec<T>, serde_json::Error> {
    let columns = table_desc.as_object().cloned().unwrap_or_default();

    let mut row_indices = std::collections::BTreeSet::new();
    for rows_by_index in columns.values() {
        if let Some(rows_by_index) = rows_by_index.as_object() {
            for key in rows_by_index.keys() {
                if let Ok(idx) = key.parse::<usize>() {
                    row_indices.insert(idx);
                }
            }
        }
    }

    let mut rows = Vec::with_capacity(row_indices.len());
    for idx in row_indices {
        let mut row = serde_json::Map::new();
        for (column, rows_by_index) in &columns {
            if let Some(value) = rows_by_index.as_object().and_then(|m| m.get(&idx.to_string())) {
                row.insert(column.clone(), value.clone());
            }
        }
        rows.push(serde_json::from_value(serde_json::Value::Object(row))?);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTransaction;

    #[test]
    fn table_desc_round_trips_through_columnar_shape() {
        let rows = vec![
            NewTransaction { price: 100.0, symbol: "AAA".into(), stamp: 0, volume: 10.0 },
            NewTransaction { price: 110.0, symbol: "AAA".into(), stamp: 1000, volume: 5.0 },
        ];

        let desc = to_table_desc(&rows).expect("encode");
        assert_eq!(desc["symbol"]["0"], "AAA");
        assert_eq!(desc["price"]["1"], 110.0);

        let decoded: Vec<NewTransaction> = from_table_desc(&desc).expect("decode");
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].price, 110.0);
        assert_eq!(decoded[0].symbol, "AAA");
    }

    #[test]
    fn topic_routing_keys_and_queue_names() {
        assert_eq!(Topic::DatabaseSave.routing_key(), "database.save");
        assert_eq!(Topic::RequestedTrends.queue(), "requested_trends");
        assert_eq!(Topic::OrdersMake.queue(), "orders_make");
    }
}
