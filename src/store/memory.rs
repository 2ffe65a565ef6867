use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ChatRecord, HistoryStore, ProfileStore, ProfileUpdate, UserProfile};
use crate::{Error, Result};

#[derive(Default)]
struct Inner {
    /// id -> (insert sequence, record)
    history: HashMap<String, (u64, ChatRecord)>,
    profiles: HashMap<String, UserProfile>,
    seq: u64,
}

/// Process-local store. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| Error::Store("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| Error::Store("memory store lock poisoned".into()))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn add(&self, mut record: ChatRecord) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        record.id = id.clone();
        let mut inner = self.write()?;
        inner.seq += 1;
        let seq = inner.seq;
        inner.history.insert(id.clone(), (seq, record));
        Ok(id)
    }

    async fn list(&self, user_id: &str, limit: usize) -> Result<Vec<ChatRecord>> {
        let inner = self.read()?;
        let mut entries: Vec<&(u64, ChatRecord)> = inner
            .history
            .values()
            .filter(|(_, r)| r.user_id == user_id)
            .collect();
        entries.sort_by(|(sa, a), (sb, b)| b.timestamp.cmp(&a.timestamp).then(sb.cmp(sa)));
        Ok(entries
            .into_iter()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn clear(&self, user_id: &str) -> Result<usize> {
        let mut inner = self.write()?;
        let before = inner.history.len();
        inner.history.retain(|_, (_, r)| r.user_id != user_id);
        Ok(before - inner.history.len())
    }

    async fn get(&self, id: &str) -> Result<Option<ChatRecord>> {
        Ok(self.read()?.history.get(id).map(|(_, r)| r.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.write()?.history.remove(id).is_some())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        Ok(self.read()?.profiles.get(uid).cloned())
    }

    async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile> {
        let mut inner = self.write()?;
        inner
            .profiles
            .insert(profile.uid.clone(), profile.clone());
        Ok(profile)
    }

    async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<UserProfile> {
        let mut inner = self.write()?;
        let profile = inner
            .profiles
            .get_mut(uid)
            .ok_or_else(|| Error::NotFound(format!("profile {uid}")))?;
        if let Some(name) = update.display_name {
            profile.display_name = Some(name);
        }
        if let Some(prefs) = update.preferences.filter(|p| !p.is_empty()) {
            profile.preferences = prefs;
        }
        profile.last_active = Utc::now();
        Ok(profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn history_is_newest_first_and_scoped_to_user() {
        let store = MemoryStore::new();
        let first = store
            .add(ChatRecord::success("u1", "text", "one", "1"))
            .await
            .unwrap();
        store.add(ChatRecord::success("u2", "text", "other", "x")).await.unwrap();
        let second = store
            .add(ChatRecord::success("u1", "code", "two", "2"))
            .await
            .unwrap();

        let list = store.list("u1", 50).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second);
        assert_eq!(list[1].id, first);
        assert_eq!(store.list("u1", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_and_delete() {
        let store = MemoryStore::new();
        let id = store.add(ChatRecord::success("u1", "text", "a", "b")).await.unwrap();
        store.add(ChatRecord::failure("u1", "text", "c", "boom")).await.unwrap();
        store.add(ChatRecord::success("u2", "text", "d", "e")).await.unwrap();

        assert!(store.get(&id).await.unwrap().is_some());
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert_eq!(store.clear("u1").await.unwrap(), 1);
        assert_eq!(store.list("u2", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn profile_update_merges_fields() {
        let store = MemoryStore::new();
        store
            .create_profile(UserProfile::new("u1", Some("a@b.c".into()), Some("Ada".into())))
            .await
            .unwrap();

        let prefs = json!({"theme": "dark"}).as_object().cloned();
        let updated = store
            .update_profile(
                "u1",
                ProfileUpdate {
                    display_name: None,
                    preferences: prefs,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Ada"));
        assert_eq!(updated.preferences["theme"], "dark");

        assert!(matches!(
            store.update_profile("ghost", ProfileUpdate::default()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn failure_record_shape() {
        let record = ChatRecord::failure("u1", "code", "p", "quota exceeded");
        assert!(!record.success);
        assert_eq!(record.response, "Error: quota exceeded");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "code");
        assert_eq!(json["userId"], "u1");
        assert!(json.get("model").is_none());
    }
}
