use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use hyper::header::{HeaderMap, HeaderValue, COOKIE};
use leaf_serve::Crop;
use log::debug;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const COOKIE_NAME: &str = "session";

/// Sessions untouched for longer than this are forgotten.
pub const DEFAULT_IDLE_MINUTES: i64 = 24 * 60;

/// Most sessions held at once; the least recently seen go first.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// State kept for one browser between the options and predict pages.
#[derive(Clone, Debug)]
pub struct Session {
    pub crop: Option<Crop>,
    pub csrf_token: String,
    last_seen: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Session {
            crop: None,
            csrf_token: Uuid::new_v4().simple().to_string(),
            last_seen: now,
        }
    }
}

/// A session resolved for the current request.
pub struct Handle {
    pub id: String,
    pub session: Session,

    /// The browser does not know `id` yet and must be sent a cookie
    pub is_new: bool,
}

impl Handle {
    pub fn set_cookie(&self) -> Option<HeaderValue> {
        if !self.is_new {
            return None;
        }

        HeaderValue::from_str(&format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            COOKIE_NAME, self.id
        ))
        .ok()
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    idle: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::with_limits(Duration::minutes(DEFAULT_IDLE_MINUTES), DEFAULT_CAPACITY)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle: Duration, capacity: usize) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            idle,
            capacity: capacity.max(1),
        }
    }

    /// Live session named by `id`, marked as seen now.
    fn touch<'a>(
        &self,
        sessions: &'a mut HashMap<String, Session>,
        id: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a Session> {
        let idle = self.idle;
        let session = sessions.get_mut(id).filter(|s| now - s.last_seen <= idle)?;
        session.last_seen = now;
        Some(session)
    }

    /// Drops idle sessions, then the least recently seen ones until a new
    /// session fits.
    fn prune(&self, sessions: &mut HashMap<String, Session>, now: DateTime<Utc>) {
        let idle = self.idle;
        sessions.retain(|_, s| now - s.last_seen <= idle);

        while sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_seen)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }
    }

    /// Session named by the request cookie, if the server knows it.
    pub async fn get(&self, headers: &HeaderMap) -> Option<Session> {
        let id = session_id(headers)?;
        let mut sessions = self.sessions.write().await;
        let session = self.touch(&mut sessions, id, Utc::now()).cloned();
        session
    }

    /// Session named by the request cookie, or a fresh one.
    pub async fn resolve(&self, headers: &HeaderMap) -> Handle {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        if let Some(id) = session_id(headers) {
            if let Some(session) = self.touch(&mut sessions, id, now) {
                return Handle {
                    id: id.to_owned(),
                    session: session.clone(),
                    is_new: false,
                };
            }
        }

        self.prune(&mut sessions, now);

        let id = Uuid::new_v4().to_string();
        let session = Session::new(now);
        sessions.insert(id.clone(), session.clone());
        debug!("Created session {} ({} active)", id, sessions.len());

        Handle {
            id,
            session,
            is_new: true,
        }
    }

    pub async fn set_crop(&self, id: &str, crop: Crop) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.crop = Some(crop);
        }
    }
}

/// Value of the session cookie sent with the request.
pub fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn finds_session_among_other_cookies() {
        let headers = cookie("theme=dark; session=abc123; lang=en");
        assert_eq!(session_id(&headers), Some("abc123"));

        assert_eq!(session_id(&cookie("sessionx=1")), None);
        assert_eq!(session_id(&cookie("session=")), None);
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn unknown_cookie_gets_a_new_session() {
        let store = SessionStore::new();

        let handle = store.resolve(&cookie("session=forged")).await;

        assert!(handle.is_new);
        assert_ne!(handle.id, "forged");
        assert!(handle.session.crop.is_none());
        assert!(handle.set_cookie().is_some());
        let issued = cookie(&format!("session={}", handle.id));
        assert!(store.get(&issued).await.is_some());
        assert!(store.get(&cookie("session=forged")).await.is_none());
    }

    #[tokio::test]
    async fn crop_sticks_to_the_session() {
        let store = SessionStore::new();
        let handle = store.resolve(&HeaderMap::new()).await;

        store.set_crop(&handle.id, Crop::Potato).await;

        let headers = cookie(&format!("session={}", handle.id));
        let again = store.resolve(&headers).await;
        assert!(!again.is_new);
        assert!(again.set_cookie().is_none());
        assert_eq!(again.session.crop, Some(Crop::Potato));
        assert_eq!(again.session.csrf_token, handle.session.csrf_token);
        assert_eq!(store.get(&headers).await.unwrap().crop, Some(Crop::Potato));
    }

    async fn backdate(store: &SessionStore, id: &str, by: Duration) {
        let mut sessions = store.sessions.write().await;
        let session = sessions.get_mut(id).unwrap();
        session.last_seen = session.last_seen - by;
    }

    #[tokio::test]
    async fn idle_sessions_are_forgotten() {
        let store = SessionStore::with_limits(Duration::minutes(30), 100);
        let old = store.resolve(&HeaderMap::new()).await;
        store.set_crop(&old.id, Crop::Corn).await;
        backdate(&store, &old.id, Duration::minutes(31)).await;

        let headers = cookie(&format!("session={}", old.id));
        assert!(store.get(&headers).await.is_none());

        let fresh = store.resolve(&headers).await;
        assert!(fresh.is_new);
        assert_ne!(fresh.id, old.id);
        assert!(!store.sessions.read().await.contains_key(&old.id));
    }

    #[tokio::test]
    async fn cookieless_clients_cannot_grow_the_store() {
        let store = SessionStore::with_limits(Duration::minutes(30), 3);

        let mut ids = Vec::new();
        for i in 0..10 {
            let handle = store.resolve(&HeaderMap::new()).await;
            backdate(&store, &handle.id, Duration::seconds(100 - i)).await;
            ids.push(handle.id);
        }

        let sessions = store.sessions.read().await;
        assert_eq!(sessions.len(), 3);
        for id in &ids[7..] {
            assert!(sessions.contains_key(id));
        }
    }

    #[tokio::test]
    async fn recently_used_session_survives_eviction() {
        let store = SessionStore::with_limits(Duration::minutes(30), 2);
        let kept = store.resolve(&HeaderMap::new()).await;
        backdate(&store, &kept.id, Duration::seconds(10)).await;
        let other = store.resolve(&HeaderMap::new()).await;
        backdate(&store, &other.id, Duration::seconds(5)).await;

        // Seen again, so it is now the newest.
        let headers = cookie(&format!("session={}", kept.id));
        assert!(store.get(&headers).await.is_some());

        store.resolve(&HeaderMap::new()).await;

        let sessions = store.sessions.read().await;
        assert!(sessions.contains_key(&kept.id));
        assert!(!sessions.contains_key(&other.id));
    }
}
