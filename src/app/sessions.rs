// src/app/sessions.rs
// Chat session bookkeeping for the sidebar: persistence to sessions.json, date-labelled grouping, rename/delete/clear.

use crate::app::error::SessionError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const SESSIONS_FILE: &str = "sessions.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(title: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            created_at,
        }
    }
}

/// One labelled block of the sidebar, newest session first.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGroup<'a> {
    pub label: String,
    pub sessions: Vec<&'a ChatSession>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
struct SessionsFile {
    active_session_id: Option<String>,
    sessions: Vec<ChatSession>,
}

pub struct SessionStore {
    sessions: Vec<ChatSession>,
    active_session_id: Option<String>,
    path: PathBuf,
}

/// Sidebar label for a session created on `day`, seen on `today`.
pub fn date_label(day: NaiveDate, today: NaiveDate) -> String {
    let age = (today - day).num_days();
    if age <= 0 {
        "Today".to_string()
    } else if age == 1 {
        "Yesterday".to_string()
    } else if age < 7 {
        "This week".to_string()
    } else if day.year() == today.year() && day.month() == today.month() {
        "This month".to_string()
    } else {
        day.format("%B %Y").to_string()
    }
}

impl SessionStore {
    pub fn open(data_dir: &Path) -> Result<Self, SessionError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(SESSIONS_FILE);
        let file = if path.exists() {
            match serde_json::from_str::<SessionsFile>(&fs::read_to_string(&path)?) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Sessions file '{}' is unreadable ({}), starting empty.", path.display(), e);
                    SessionsFile::default()
                }
            }
        } else {
            SessionsFile::default()
        };
        debug!("Loaded {} chat sessions.", file.sessions.len());
        Ok(Self {
            sessions: file.sessions,
            active_session_id: file.active_session_id,
            path,
        })
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    pub fn create(&mut self, title: &str, now: DateTime<Utc>) -> Result<ChatSession, SessionError> {
        let session = ChatSession::new(title, now);
        self.active_session_id = Some(session.id.clone());
        self.sessions.push(session.clone());
        self.persist()?;
        Ok(session)
    }

    pub fn set_active(&mut self, id: Option<&str>) -> Result<(), SessionError> {
        if let Some(id) = id {
            if !self.sessions.iter().any(|s| s.id == id) {
                return Err(SessionError::NotFound(id.to_string()));
            }
        }
        self.active_session_id = id.map(str::to_string);
        self.persist()
    }

    /// Renames a session. Blank titles are rejected; the stored title is trimmed.
    pub fn rename(&mut self, id: &str, title: &str) -> Result<(), SessionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SessionError::EmptyTitle);
        }
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.title = title.to_string();
        info!("Renamed session {} to '{}'.", id, title);
        self.persist()
    }

    pub fn delete(&mut self, id: &str) -> Result<(), SessionError> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return Err(SessionError::NotFound(id.to_string()));
        }
        if self.active_session_id.as_deref() == Some(id) {
            self.active_session_id = None;
        }
        self.persist()
    }

    pub fn clear_all(&mut self) -> Result<(), SessionError> {
        info!("Clearing {} chat sessions.", self.sessions.len());
        self.sessions.clear();
        self.active_session_id = None;
        self.persist()
    }

    /// Sessions bucketed by creation date in `tz`, newest first.
    pub fn grouped_sessions(&self, now: DateTime<Utc>, tz: Tz) -> Vec<SessionGroup<'_>> {
        let today = now.with_timezone(&tz).date_naive();
        let mut sorted: Vec<&ChatSession> = self.sessions.iter().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut groups: Vec<SessionGroup<'_>> = Vec::new();
        for session in sorted {
            let label = date_label(session.created_at.with_timezone(&tz).date_naive(), today);
            match groups.last_mut() {
                Some(group) if group.label == label => group.sessions.push(session),
                _ => groups.push(SessionGroup {
                    label,
                    sessions: vec![session],
                }),
            }
        }
        groups
    }

    fn persist(&self) -> Result<(), SessionError> {
        let file = SessionsFile {
            active_session_id: self.active_session_id.clone(),
            sessions: self.sessions.clone(),
        };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&file)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn labels(groups: &[SessionGroup<'_>]) -> Vec<String> {
        groups.iter().map(|g| g.label.clone()).collect()
    }

    #[test]
    fn labels_by_age() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
        assert_eq!(date_label(today, today), "Today");
        assert_eq!(date_label(day(19), today), "Yesterday");
        assert_eq!(date_label(day(14), today), "This week");
        assert_eq!(date_label(day(2), today), "This month");
        assert_eq!(
            date_label(NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(), today),
            "April 2024"
        );
        assert_eq!(date_label(day(21), today), "Today");
    }

    #[test]
    fn groups_are_newest_first_and_contiguous() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::open(dir.path()).unwrap();
        store.create("old", at(2024, 3, 1, 12)).unwrap();
        store.create("today a", at(2024, 5, 20, 8)).unwrap();
        store.create("yesterday", at(2024, 5, 19, 8)).unwrap();
        store.create("today b", at(2024, 5, 20, 9)).unwrap();

        let groups = store.grouped_sessions(at(2024, 5, 20, 12), Tz::UTC);
        assert_eq!(labels(&groups), vec!["Today", "Yesterday", "March 2024"]);
        let today: Vec<&str> = groups[0].sessions.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(today, vec!["today b", "today a"]);
    }

    #[test]
    fn grouping_follows_the_timezone() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::open(dir.path()).unwrap();
        // 23:00 UTC on the 19th is already the 20th in Vienna (UTC+2 in May).
        store.create("late", at(2024, 5, 19, 23)).unwrap();
        let now = at(2024, 5, 20, 10);
        assert_eq!(labels(&store.grouped_sessions(now, Tz::UTC)), vec!["Yesterday"]);
        assert_eq!(
            labels(&store.grouped_sessions(now, chrono_tz::Europe::Vienna)),
            vec!["Today"]
        );
    }

    #[test]
    fn rename_rejects_blank_titles_and_trims() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::open(dir.path()).unwrap();
        let id = store.create("chat", Utc::now()).unwrap().id;
        assert!(matches!(store.rename(&id, "   "), Err(SessionError::EmptyTitle)));
        store.rename(&id, "  Trip plans ").unwrap();
        assert_eq!(store.sessions()[0].title, "Trip plans");
        assert!(matches!(store.rename("nope", "x"), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn delete_and_clear_reset_active_and_persist() {
        let dir = TempDir::new().unwrap();
        let (first, second) = {
            let mut store = SessionStore::open(dir.path()).unwrap();
            let first = store.create("one", Utc::now()).unwrap().id;
            let second = store.create("two", Utc::now()).unwrap().id;
            assert_eq!(store.active_session_id(), Some(second.as_str()));
            store.delete(&second).unwrap();
            assert!(store.active_session_id().is_none());
            store.set_active(Some(&first)).unwrap();
            (first, second)
        };

        let mut store = SessionStore::open(dir.path()).unwrap();
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.active_session_id(), Some(first.as_str()));
        assert!(matches!(store.set_active(Some(&second)), Err(SessionError::NotFound(_))));

        store.clear_all().unwrap();
        assert!(store.sessions().is_empty());
        assert!(store.active_session_id().is_none());
    }
}
