use tokio::sync::watch;

/// Status koneksi ke database utama. Dibagikan ke form transaksi,
/// sinkronisasi dan monitor latar belakang.
#[derive(Clone)]
pub struct Connectivity {
    sender: watch::Sender<bool>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self { sender }
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Mengembalikan `true` bila status berubah.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            if online {
                log::info!("Main database reachable again");
            } else {
                log::warn!("Main database unreachable, switching to offline queue");
            }
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_notify_subscribers() {
        let conn = Connectivity::default();
        let mut rx = conn.subscribe();
        assert!(conn.is_online());
        assert!(!conn.set_online(true));
        assert!(conn.set_online(false));
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
        assert!(conn.set_online(true));
        assert!(conn.is_online());
    }
}
