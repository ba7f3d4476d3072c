use bukukami_shared::types::{PushSubscription, SubscriptionKeys};
use rusqlite::{params, Connection, Row};

use crate::collection::{Collection, Record};
use crate::database::Database;
use crate::error::Result;

impl Record for PushSubscription {
    type Key = String;

    const COLLECTION: Collection = Collection::Subscriptions;

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<String> {
        conn.execute(
            "INSERT OR REPLACE INTO subscriptions (endpoint, p256dh, auth) VALUES (?1, ?2, ?3)",
            params![self.endpoint, self.keys.p256dh, self.keys.auth],
        )?;
        Ok(self.endpoint.clone())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PushSubscription {
            endpoint: row.get("endpoint")?,
            keys: SubscriptionKeys {
                p256dh: row.get("p256dh")?,
                auth: row.get("auth")?,
            },
        })
    }
}

impl Database {
    pub fn save_subscription(&self, subscription: &PushSubscription) -> Result<()> {
        self.put(subscription)?;
        Ok(())
    }

    pub fn subscriptions(&self) -> Result<Vec<PushSubscription>> {
        self.get_all()
    }

    pub fn remove_subscription(&self, endpoint: &str) -> Result<bool> {
        self.delete::<PushSubscription>(&endpoint.to_string())
    }
}
