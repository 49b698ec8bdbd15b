use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::bot::db::UserId;

/// Conversation scoped state, lives only as long as the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// next free text message is a wallet address
    pub awaiting_wallet: bool,
    /// referrer from the start payload, cleared once credited
    pub referred_by: Option<UserId>,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self { sessions: RwLock::new(HashMap::new()) }
    }

    /// Snapshot of the session. Looking doesn't create one, only `update` does.
    pub async fn get(&self, user_id: UserId) -> SessionState {
        self.sessions.read().await.get(&user_id).cloned().unwrap_or_default()
    }

    pub async fn update<F, R>(&self, user_id: UserId, f: F) -> R where F: FnOnce(&mut SessionState) -> R {
        let mut sessions = self.sessions.write().await;
        f(sessions.entry(user_id).or_default())
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
