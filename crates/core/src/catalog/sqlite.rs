//! SQLite-backed title store implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{
    AppendOutcome, CatalogError, Episode, EpisodeAppend, NewTitle, Rating, RatingWrite,
    SearchHit, Title, TitleStore,
};
use crate::search::{rank, FuzzyQuery, SearchDocument};

/// SQLite-backed title store.
pub struct SqliteTitleStore {
    conn: Mutex<Connection>,
}

impl SqliteTitleStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS titles (
                id TEXT PRIMARY KEY,
                canonical_id INTEGER NOT NULL UNIQUE,
                title TEXT NOT NULL,
                year INTEGER,
                season TEXT,
                created_at TEXT NOT NULL
            );

            -- Alternate titles, in their original order
            CREATE TABLE IF NOT EXISTS title_aliases (
                title_id TEXT NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                alias TEXT NOT NULL,
                PRIMARY KEY (title_id, position)
            );

            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title_id TEXT NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
                label TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(title_id, label)
            );

            CREATE TABLE IF NOT EXISTS ratings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                episode_id INTEGER NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                score REAL NOT NULL CHECK (score >= 1 AND score <= 10),
                rated_at TEXT NOT NULL,
                UNIQUE(episode_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_ratings_episode ON ratings(episode_id);

            CREATE TABLE IF NOT EXISTS followers (
                title_id TEXT NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                followed_at TEXT NOT NULL,
                PRIMARY KEY (title_id, user_id)
            );
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("catalog connection lock poisoned".to_string()))
    }

    fn title_exists(conn: &Connection, title_id: &str) -> Result<bool, CatalogError> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM titles WHERE id = ?1",
                params![title_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(exists)
    }

    /// Resolve an episode row id, distinguishing a missing title from a missing episode.
    fn episode_id(conn: &Connection, title_id: &str, episode: &str) -> Result<i64, CatalogError> {
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM episodes WHERE title_id = ?1 AND label = ?2",
                params![title_id, episode],
                |row| row.get(0),
            )
            .optional()?;

        match id {
            Some(id) => Ok(id),
            None if Self::title_exists(conn, title_id)? => Err(CatalogError::EpisodeNotFound {
                title_id: title_id.to_string(),
                episode: episode.to_string(),
            }),
            None => Err(CatalogError::NotFound(title_id.to_string())),
        }
    }

    /// Convert a `titles` row to a Title (without aliases, episodes, followers).
    fn row_to_title(row: &rusqlite::Row) -> rusqlite::Result<Title> {
        let season: Option<String> = row.get(4)?;

        Ok(Title {
            id: row.get(0)?,
            canonical_id: row.get(1)?,
            title: row.get(2)?,
            extra_titles: Vec::new(),
            year: row.get(3)?,
            season: season.and_then(|s| s.parse().ok()),
            episodes: Vec::new(),
            followers: Vec::new(),
        })
    }

    fn load_title(conn: &Connection, id: &str) -> Result<Option<Title>, CatalogError> {
        let title = conn
            .query_row(
                "SELECT id, canonical_id, title, year, season FROM titles WHERE id = ?1",
                params![id],
                Self::row_to_title,
            )
            .optional()?;

        title.map(|t| Self::hydrate(conn, t)).transpose()
    }

    fn hydrate(conn: &Connection, mut title: Title) -> Result<Title, CatalogError> {
        title.extra_titles = Self::load_extra_titles(conn, &title.id)?;
        title.episodes = Self::load_episodes(conn, &title.id)?;
        title.followers = Self::load_followers(conn, &title.id)?;
        Ok(title)
    }

    fn load_extra_titles(conn: &Connection, title_id: &str) -> Result<Vec<String>, CatalogError> {
        let mut stmt =
            conn.prepare("SELECT alias FROM title_aliases WHERE title_id = ?1 ORDER BY position")?;
        let rows = stmt.query_map(params![title_id], |row| row.get(0))?;

        let mut aliases = Vec::new();
        for row in rows {
            aliases.push(row?);
        }
        Ok(aliases)
    }

    fn load_episodes(conn: &Connection, title_id: &str) -> Result<Vec<Episode>, CatalogError> {
        let mut stmt = conn.prepare(
            "SELECT e.id, e.label, r.user_id, r.score, r.rated_at
             FROM episodes e
             LEFT JOIN ratings r ON r.episode_id = e.id
             WHERE e.title_id = ?1
             ORDER BY e.id, r.id",
        )?;

        let rows = stmt.query_map(params![title_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut episodes: Vec<Episode> = Vec::new();
        let mut current: Option<i64> = None;

        for row in rows {
            let (episode_id, label, user, score, rated_at) = row?;

            if current != Some(episode_id) {
                episodes.push(Episode {
                    episode: label,
                    ratings: Vec::new(),
                });
                current = Some(episode_id);
            }

            if let (Some(user), Some(score), Some(rated_at), Some(episode)) =
                (user, score, rated_at, episodes.last_mut())
            {
                episode.ratings.push(Rating {
                    user,
                    score,
                    date: parse_timestamp(&rated_at),
                });
            }
        }

        Ok(episodes)
    }

    fn load_followers(conn: &Connection, title_id: &str) -> Result<Vec<String>, CatalogError> {
        let mut stmt =
            conn.prepare("SELECT user_id FROM followers WHERE title_id = ?1 ORDER BY rowid")?;
        let rows = stmt.query_map(params![title_id], |row| row.get(0))?;

        let mut followers = Vec::new();
        for row in rows {
            followers.push(row?);
        }
        Ok(followers)
    }

    fn load_search_documents(conn: &Connection) -> Result<Vec<SearchDocument>, CatalogError> {
        let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT title_id, alias FROM title_aliases ORDER BY title_id, position",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (title_id, alias) = row?;
                aliases.entry(title_id).or_default().push(alias);
            }
        }

        let mut stmt = conn.prepare("SELECT id, title FROM titles ORDER BY title, id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, title) = row?;
            let extra_titles = aliases.remove(&id).unwrap_or_default();
            documents.push(SearchDocument {
                id,
                title,
                extra_titles,
            });
        }
        Ok(documents)
    }

    fn append_one(
        conn: &Connection,
        append: &EpisodeAppend,
        now: &str,
    ) -> Result<AppendOutcome, CatalogError> {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO episodes (title_id, label, created_at)
             SELECT id, ?2, ?3 FROM titles WHERE id = ?1",
            params![append.title_id, append.episode, now],
        )?;

        if changed == 1 {
            Ok(AppendOutcome::Inserted)
        } else if Self::title_exists(conn, &append.title_id)? {
            Ok(AppendOutcome::AlreadyPresent)
        } else {
            Ok(AppendOutcome::TitleMissing)
        }
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl TitleStore for SqliteTitleStore {
    fn insert(&self, new: NewTitle) -> Result<Title, CatalogError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = Uuid::new_v4().to_string();

        let inserted = tx.execute(
            "INSERT INTO titles (id, canonical_id, title, year, season, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(canonical_id) DO NOTHING",
            params![
                id,
                new.canonical_id,
                new.title,
                new.year,
                new.season.map(|s| s.as_str()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        if inserted == 0 {
            return Err(CatalogError::Duplicate(new.canonical_id));
        }

        for (position, alias) in new.extra_titles.iter().enumerate() {
            tx.execute(
                "INSERT INTO title_aliases (title_id, position, alias) VALUES (?1, ?2, ?3)",
                params![id, position as i64, alias],
            )?;
        }
        tx.commit()?;

        Ok(Title {
            id,
            canonical_id: new.canonical_id,
            title: new.title,
            extra_titles: new.extra_titles,
            year: new.year,
            season: new.season,
            episodes: Vec::new(),
            followers: Vec::new(),
        })
    }

    fn get(&self, id: &str) -> Result<Title, CatalogError> {
        let conn = self.lock()?;
        Self::load_title(&conn, id)?.ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    fn find_by_canonical_id(&self, canonical_id: i64) -> Result<Option<Title>, CatalogError> {
        let conn = self.lock()?;
        let title = conn
            .query_row(
                "SELECT id, canonical_id, title, year, season FROM titles WHERE canonical_id = ?1",
                params![canonical_id],
                Self::row_to_title,
            )
            .optional()?;

        title.map(|t| Self::hydrate(&conn, t)).transpose()
    }

    fn append_episodes(&self, appends: &[EpisodeAppend]) -> Vec<AppendOutcome> {
        let conn = match self.lock() {
            Ok(conn) => conn,
            Err(e) => {
                return appends
                    .iter()
                    .map(|_| AppendOutcome::Failed(e.to_string()))
                    .collect()
            }
        };
        let now = Utc::now().to_rfc3339();

        // Each statement commits on its own: a failure is isolated to its item.
        appends
            .iter()
            .map(|append| {
                Self::append_one(&conn, append, &now)
                    .unwrap_or_else(|e| AppendOutcome::Failed(e.to_string()))
            })
            .collect()
    }

    fn upsert_rating(
        &self,
        title_id: &str,
        episode: &str,
        user: &str,
        score: f64,
        at: DateTime<Utc>,
    ) -> Result<RatingWrite, CatalogError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let episode_id = Self::episode_id(&tx, title_id, episode)?;
        let existed = tx
            .query_row(
                "SELECT 1 FROM ratings WHERE episode_id = ?1 AND user_id = ?2",
                params![episode_id, user],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        tx.execute(
            "INSERT INTO ratings (episode_id, user_id, score, rated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(episode_id, user_id) DO UPDATE SET score = excluded.score",
            params![episode_id, user, score, at.to_rfc3339()],
        )?;
        tx.commit()?;

        Ok(if existed {
            RatingWrite::Updated
        } else {
            RatingWrite::Inserted
        })
    }

    fn add_follower(&self, title_id: &str, user: &str) -> Result<bool, CatalogError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO followers (title_id, user_id, followed_at)
             SELECT id, ?2, ?3 FROM titles WHERE id = ?1",
            params![title_id, user, Utc::now().to_rfc3339()],
        )?;

        if changed == 1 {
            Ok(true)
        } else if Self::title_exists(&conn, title_id)? {
            Ok(false)
        } else {
            Err(CatalogError::NotFound(title_id.to_string()))
        }
    }

    fn remove_follower(&self, title_id: &str, user: &str) -> Result<bool, CatalogError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM followers WHERE title_id = ?1 AND user_id = ?2",
            params![title_id, user],
        )?;

        if changed == 1 {
            Ok(true)
        } else if Self::title_exists(&conn, title_id)? {
            Ok(false)
        } else {
            Err(CatalogError::NotFound(title_id.to_string()))
        }
    }

    fn search(&self, query: &FuzzyQuery) -> Result<Vec<SearchHit>, CatalogError> {
        let conn = self.lock()?;
        let documents = Self::load_search_documents(&conn)?;

        rank(query, &documents)
            .into_iter()
            .map(|ranked| {
                let title = Self::load_title(&conn, &ranked.id)?
                    .ok_or_else(|| CatalogError::NotFound(ranked.id.clone()))?;
                Ok(SearchHit {
                    title,
                    relevance: ranked.score,
                    highlights: ranked.highlights,
                })
            })
            .collect()
    }
}
