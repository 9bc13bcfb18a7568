//! Feed perubahan data. Setiap tulis yang sudah di-commit mengirim satu
//! event; klien yang berlangganan (SSE) cukup memuat ulang tabel terkait.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Classes,
    Students,
    Transactions,
    SchoolData,
    WaliKelas,
    Profiles,
    PendingTransactions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub action: ChangeAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, table: ChangeTable, action: ChangeAction, id: Option<Uuid>) {
        self.publish_raw(table, action, id.map(|id| id.to_string()));
    }

    pub fn publish_raw(&self, table: ChangeTable, action: ChangeAction, id: Option<String>) {
        // tanpa pelanggan send() gagal; itu normal
        let _ = self.sender.send(ChangeEvent { table, action, id });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();
        let id = Uuid::new_v4();
        feed.publish(ChangeTable::Transactions, ChangeAction::Insert, Some(id));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, ChangeTable::Transactions);
        assert_eq!(event.id, Some(id.to_string()));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"action\":\"INSERT\""));
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let feed = ChangeFeed::default();
        feed.publish(ChangeTable::Students, ChangeAction::Delete, None);
    }
}
