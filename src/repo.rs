use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("storage: {0}")] Internal(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => RepoError::Conflict, // unique_violation
            other => RepoError::Internal(other.to_string()),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Counter key bumped by every page view.
pub const PAGEVIEWS: &str = "pageviews";

use async_trait::async_trait;

/// Storage operations backing the bottle service. Every method is a single
/// statement; callers get no transactional grouping.
#[async_trait]
pub trait BottleRepo: Send + Sync {
    async fn insert_bottle(&self, content: &str, author: &str) -> RepoResult<Id>;
    /// Most recently created unread bottles, newest first.
    async fn select_unread_recent(&self, limit: usize) -> RepoResult<Vec<Bottle>>;
    /// Unknown ids are not an error.
    async fn mark_read(&self, id: Id) -> RepoResult<()>;
    /// Unknown ids are not an error.
    async fn mark_unread(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait MessageRepo: Send + Sync {
    async fn list_messages(&self) -> RepoResult<Vec<Message>>;
    async fn create_message(&self, new: NewMessage) -> RepoResult<Message>;
    async fn delete_message(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait SportsRepo: Send + Sync {
    async fn list_sport_types(&self) -> RepoResult<Vec<SportType>>;
    async fn list_sports_users(&self) -> RepoResult<Vec<SportsUser>>;
    async fn create_sports_user(&self, nickname: &str) -> RepoResult<SportsUser>;
    async fn list_sports_records(&self, user_id: Id) -> RepoResult<Vec<SportsRecord>>;
    async fn create_sports_record(&self, new: NewSportsRecord) -> RepoResult<SportsRecord>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// True when another user (not `except`) already uses `email`.
    async fn email_in_use(&self, email: &str, except: Option<Id>) -> RepoResult<bool>;
    async fn create_user(&self, new: NewUser) -> RepoResult<Id>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn touch_last_login(&self, id: Id) -> RepoResult<()>;
    async fn update_user(&self, id: Id, upd: UpdateUser) -> RepoResult<()>;
    async fn set_password(&self, id: Id, digest: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait GameRepo: Send + Sync {
    async fn list_scores(&self) -> RepoResult<Vec<GameScore>>;
    async fn save_score(&self, new: NewGameScore) -> RepoResult<GameScore>;
    async fn list_locations(&self) -> RepoResult<Vec<PlayerLocation>>;
    async fn save_location(&self, new: NewPlayerLocation) -> RepoResult<PlayerLocation>;
}

#[async_trait]
pub trait AnalyticsRepo: Send + Sync {
    /// Increments a counter and returns the new value; 0 when the counter row is missing.
    async fn increment_counter(&self, key: &str) -> RepoResult<i64>;
}

pub trait Repo: BottleRepo + MessageRepo + SportsRepo + UserRepo + GameRepo + AnalyticsRepo {}

impl<T> Repo for T where T: BottleRepo + MessageRepo + SportsRepo + UserRepo + GameRepo + AnalyticsRepo {}

/// Process-local backend, used when no database is configured and in tests.
pub mod inmem {
    use super::*;

    #[derive(Default)]
    struct State {
        bottles: HashMap<Id, Bottle>,
        messages: HashMap<Id, Message>,
        sport_types: HashMap<Id, SportType>,
        sports_users: HashMap<Id, SportsUser>,
        sports_records: HashMap<Id, SportsRecord>,
        users: HashMap<Id, User>,
        scores: HashMap<Id, GameScore>,
        locations: HashMap<Id, PlayerLocation>,
        counters: HashMap<String, i64>,
        next_id: Id,
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    // newest first; ids break ties between rows created within the same tick
    fn newest_first<T>(mut v: Vec<T>, key: impl Fn(&T) -> (chrono::DateTime<Utc>, Id)) -> Vec<T> {
        v.sort_by(|a, b| key(b).cmp(&key(a)));
        v
    }

    impl InMemRepo {
        pub fn new() -> Self {
            let mut state = State::default();
            // mirror the seed rows of migrations/0001_init.sql
            for (name, description) in [
                ("running", "Outdoor or treadmill running"),
                ("cycling", "Road or stationary cycling"),
                ("swimming", "Pool or open water swimming"),
                ("rope skipping", "Jump rope sessions"),
            ] {
                let id = Self::next_id(&mut state);
                state.sport_types.insert(id, SportType {
                    id,
                    name: name.into(),
                    description: Some(description.into()),
                    created_at: Utc::now(),
                });
            }
            state.counters.insert(PAGEVIEWS.into(), 0);
            Self { state: Arc::new(RwLock::new(state)) }
        }

        fn next_id(state: &mut State) -> Id {
            state.next_id += 1;
            state.next_id
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|e| RepoError::Internal(format!("state lock poisoned: {e}")))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|e| RepoError::Internal(format!("state lock poisoned: {e}")))
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::new() }
    }

    #[async_trait]
    impl BottleRepo for InMemRepo {
        async fn insert_bottle(&self, content: &str, author: &str) -> RepoResult<Id> {
            let mut s = self.write()?;
            let id = Self::next_id(&mut s);
            s.bottles.insert(id, Bottle {
                id,
                content: content.to_string(),
                user_id: author.to_string(),
                is_read: false,
                created_at: Utc::now(),
            });
            Ok(id)
        }
        async fn select_unread_recent(&self, limit: usize) -> RepoResult<Vec<Bottle>> {
            let s = self.read()?;
            let unread: Vec<_> = s.bottles.values().filter(|b| !b.is_read).cloned().collect();
            let mut v = newest_first(unread, |b| (b.created_at, b.id));
            v.truncate(limit);
            Ok(v)
        }
        async fn mark_read(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            if let Some(b) = s.bottles.get_mut(&id) { b.is_read = true; }
            Ok(())
        }
        async fn mark_unread(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            if let Some(b) = s.bottles.get_mut(&id) { b.is_read = false; }
            Ok(())
        }
    }

    #[async_trait]
    impl MessageRepo for InMemRepo {
        async fn list_messages(&self) -> RepoResult<Vec<Message>> {
            let s = self.read()?;
            Ok(newest_first(s.messages.values().cloned().collect(), |m| (m.created_at, m.id)))
        }
        async fn create_message(&self, new: NewMessage) -> RepoResult<Message> {
            let mut s = self.write()?;
            let id = Self::next_id(&mut s);
            let msg = Message { id, nickname: new.nickname, content: new.content, created_at: Utc::now() };
            s.messages.insert(id, msg.clone());
            Ok(msg)
        }
        async fn delete_message(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.messages.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
        }
    }

    #[async_trait]
    impl SportsRepo for InMemRepo {
        async fn list_sport_types(&self) -> RepoResult<Vec<SportType>> {
            let s = self.read()?;
            Ok(newest_first(s.sport_types.values().cloned().collect(), |t| (t.created_at, t.id)))
        }
        async fn list_sports_users(&self) -> RepoResult<Vec<SportsUser>> {
            let s = self.read()?;
            Ok(newest_first(s.sports_users.values().cloned().collect(), |u| (u.created_at, u.id)))
        }
        async fn create_sports_user(&self, nickname: &str) -> RepoResult<SportsUser> {
            let mut s = self.write()?;
            let id = Self::next_id(&mut s);
            let user = SportsUser { id, nickname: nickname.to_string(), created_at: Utc::now() };
            s.sports_users.insert(id, user.clone());
            Ok(user)
        }
        async fn list_sports_records(&self, user_id: Id) -> RepoResult<Vec<SportsRecord>> {
            let s = self.read()?;
            let v = s.sports_records.values().filter(|r| r.user_id == user_id).cloned().collect();
            Ok(newest_first(v, |r| (r.created_at, r.id)))
        }
        async fn create_sports_record(&self, new: NewSportsRecord) -> RepoResult<SportsRecord> {
            let mut s = self.write()?;
            let id = Self::next_id(&mut s);
            let rec = SportsRecord {
                id,
                user_id: new.user_id,
                sport_type: new.sport_type,
                duration: new.duration,
                count: new.count,
                created_at: Utc::now(),
            };
            s.sports_records.insert(id, rec.clone());
            Ok(rec)
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
            let s = self.read()?;
            Ok(s.users.values().find(|u| u.username == username).cloned())
        }
        async fn email_in_use(&self, email: &str, except: Option<Id>) -> RepoResult<bool> {
            let s = self.read()?;
            Ok(s.users.values().any(|u| u.email.as_deref() == Some(email) && Some(u.id) != except))
        }
        async fn create_user(&self, new: NewUser) -> RepoResult<Id> {
            let mut s = self.write()?;
            if s.users.values().any(|u| u.username == new.username) {
                return Err(RepoError::Conflict);
            }
            let id = Self::next_id(&mut s);
            s.users.insert(id, User {
                id,
                username: new.username,
                password: new.password,
                nickname: new.nickname,
                email: new.email,
                status: 1,
                created_at: Utc::now(),
                last_login: None,
            });
            Ok(id)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            let s = self.read()?;
            s.users.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn touch_last_login(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
            user.last_login = Some(Utc::now());
            Ok(())
        }
        async fn update_user(&self, id: Id, upd: UpdateUser) -> RepoResult<()> {
            let mut s = self.write()?;
            let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(nickname) = upd.nickname { user.nickname = Some(nickname); }
            if let Some(email) = upd.email { user.email = Some(email); }
            Ok(())
        }
        async fn set_password(&self, id: Id, digest: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
            user.password = digest.to_string();
            Ok(())
        }
    }

    #[async_trait]
    impl GameRepo for InMemRepo {
        async fn list_scores(&self) -> RepoResult<Vec<GameScore>> {
            let s = self.read()?;
            Ok(newest_first(s.scores.values().cloned().collect(), |g| (g.created_at, g.id)))
        }
        async fn save_score(&self, new: NewGameScore) -> RepoResult<GameScore> {
            let mut s = self.write()?;
            let id = Self::next_id(&mut s);
            let score = GameScore {
                id,
                game_name: new.game_name,
                player_name: new.player_name,
                score: new.score,
                play_count: new.play_count,
                play_date: new.play_date,
                play_time: new.play_time,
                user_id: new.user_id,
                created_at: Utc::now(),
            };
            s.scores.insert(id, score.clone());
            Ok(score)
        }
        async fn list_locations(&self) -> RepoResult<Vec<PlayerLocation>> {
            let s = self.read()?;
            Ok(newest_first(s.locations.values().cloned().collect(), |l| (l.created_at, l.id)))
        }
        async fn save_location(&self, new: NewPlayerLocation) -> RepoResult<PlayerLocation> {
            let mut s = self.write()?;
            let id = Self::next_id(&mut s);
            let loc = PlayerLocation {
                id,
                city: new.city,
                country: new.country,
                latitude: new.latitude,
                longitude: new.longitude,
                user_id: new.user_id,
                created_at: Utc::now(),
            };
            s.locations.insert(id, loc.clone());
            Ok(loc)
        }
    }

    #[async_trait]
    impl AnalyticsRepo for InMemRepo {
        async fn increment_counter(&self, key: &str) -> RepoResult<i64> {
            let mut s = self.write()?;
            Ok(match s.counters.get_mut(key) {
                Some(v) => { *v += 1; *v }
                None => 0,
            })
        }
    }
}

/// Postgres backend. Statements are plain parameterized queries; nothing here
/// opens a transaction.
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }
    }

    #[async_trait]
    impl BottleRepo for PgRepo {
        async fn insert_bottle(&self, content: &str, author: &str) -> RepoResult<Id> {
            let id = sqlx::query_scalar::<_, Id>(
                "INSERT INTO bottles (content, user_id, is_read) VALUES ($1,$2,FALSE) RETURNING id"
            )
            .bind(content)
            .bind(author)
            .fetch_one(&self.pool).await?;
            Ok(id)
        }
        async fn select_unread_recent(&self, limit: usize) -> RepoResult<Vec<Bottle>> {
            let recs = sqlx::query_as::<_, Bottle>(
                "SELECT id, content, user_id, is_read, created_at FROM bottles WHERE is_read = FALSE ORDER BY created_at DESC, id DESC LIMIT $1"
            )
            .bind(limit as i64)
            .fetch_all(&self.pool).await?;
            Ok(recs)
        }
        async fn mark_read(&self, id: Id) -> RepoResult<()> {
            sqlx::query("UPDATE bottles SET is_read = TRUE WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await?;
            Ok(())
        }
        async fn mark_unread(&self, id: Id) -> RepoResult<()> {
            sqlx::query("UPDATE bottles SET is_read = FALSE WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await?;
            Ok(())
        }
    }

    #[async_trait]
    impl MessageRepo for PgRepo {
        async fn list_messages(&self) -> RepoResult<Vec<Message>> {
            let recs = sqlx::query_as::<_, Message>(
                "SELECT id, nickname, content, created_at FROM messages ORDER BY created_at DESC, id DESC"
            )
            .fetch_all(&self.pool).await?;
            Ok(recs)
        }
        async fn create_message(&self, new: NewMessage) -> RepoResult<Message> {
            let rec = sqlx::query_as::<_, Message>(
                "INSERT INTO messages (nickname, content) VALUES ($1,$2) RETURNING id, nickname, content, created_at"
            )
            .bind(&new.nickname)
            .bind(&new.content)
            .fetch_one(&self.pool).await?;
            Ok(rec)
        }
        async fn delete_message(&self, id: Id) -> RepoResult<()> {
            let deleted = sqlx::query_scalar::<_, Id>("DELETE FROM messages WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool).await?;
            deleted.map(|_| ()).ok_or(RepoError::NotFound)
        }
    }

    #[async_trait]
    impl SportsRepo for PgRepo {
        async fn list_sport_types(&self) -> RepoResult<Vec<SportType>> {
            let recs = sqlx::query_as::<_, SportType>(
                "SELECT id, name, description, created_at FROM sport_types ORDER BY created_at DESC, id DESC"
            )
            .fetch_all(&self.pool).await?;
            Ok(recs)
        }
        async fn list_sports_users(&self) -> RepoResult<Vec<SportsUser>> {
            let recs = sqlx::query_as::<_, SportsUser>(
                "SELECT id, nickname, created_at FROM sports_users ORDER BY created_at DESC, id DESC"
            )
            .fetch_all(&self.pool).await?;
            Ok(recs)
        }
        async fn create_sports_user(&self, nickname: &str) -> RepoResult<SportsUser> {
            let rec = sqlx::query_as::<_, SportsUser>(
                "INSERT INTO sports_users (nickname) VALUES ($1) RETURNING id, nickname, created_at"
            )
            .bind(nickname)
            .fetch_one(&self.pool).await?;
            Ok(rec)
        }
        async fn list_sports_records(&self, user_id: Id) -> RepoResult<Vec<SportsRecord>> {
            let recs = sqlx::query_as::<_, SportsRecord>(
                "SELECT id, user_id, sport_type, duration, count, created_at FROM sports_records WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
            )
            .bind(user_id)
            .fetch_all(&self.pool).await?;
            Ok(recs)
        }
        async fn create_sports_record(&self, new: NewSportsRecord) -> RepoResult<SportsRecord> {
            let rec = sqlx::query_as::<_, SportsRecord>(
                "INSERT INTO sports_records (user_id, sport_type, duration, count) VALUES ($1,$2,$3,$4) RETURNING id, user_id, sport_type, duration, count, created_at"
            )
            .bind(new.user_id)
            .bind(&new.sport_type)
            .bind(new.duration)
            .bind(new.count)
            .fetch_one(&self.pool).await?;
            Ok(rec)
        }
    }

    const USER_COLUMNS: &str = "id, username, password, nickname, email, status, created_at, last_login";

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
            let rec = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool).await?;
            Ok(rec)
        }
        async fn email_in_use(&self, email: &str, except: Option<Id>) -> RepoResult<bool> {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2))"
            )
            .bind(email)
            .bind(except)
            .fetch_one(&self.pool).await?;
            Ok(taken)
        }
        async fn create_user(&self, new: NewUser) -> RepoResult<Id> {
            let id = sqlx::query_scalar::<_, Id>(
                "INSERT INTO users (username, password, nickname, email) VALUES ($1,$2,$3,$4) RETURNING id"
            )
            .bind(&new.username)
            .bind(&new.password)
            .bind(new.nickname.as_ref())
            .bind(new.email.as_ref())
            .fetch_one(&self.pool).await?;
            Ok(id)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            let rec = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await?;
            Ok(rec)
        }
        async fn touch_last_login(&self, id: Id) -> RepoResult<()> {
            sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await?;
            Ok(())
        }
        async fn update_user(&self, id: Id, upd: UpdateUser) -> RepoResult<()> {
            let res = sqlx::query(
                "UPDATE users SET nickname = COALESCE($2, nickname), email = COALESCE($3, email) WHERE id = $1"
            )
            .bind(id)
            .bind(upd.nickname.as_ref())
            .bind(upd.email.as_ref())
            .execute(&self.pool).await?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
        async fn set_password(&self, id: Id, digest: &str) -> RepoResult<()> {
            let res = sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
                .bind(id)
                .bind(digest)
                .execute(&self.pool).await?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

    #[async_trait]
    impl GameRepo for PgRepo {
        async fn list_scores(&self) -> RepoResult<Vec<GameScore>> {
            let recs = sqlx::query_as::<_, GameScore>(
                "SELECT id, game_name, player_name, score, play_count, play_date, play_time, user_id, created_at FROM game_scores ORDER BY created_at DESC, id DESC"
            )
            .fetch_all(&self.pool).await?;
            Ok(recs)
        }
        async fn save_score(&self, new: NewGameScore) -> RepoResult<GameScore> {
            let rec = sqlx::query_as::<_, GameScore>(r#"
                INSERT INTO game_scores (game_name, player_name, score, play_count, play_date, play_time, user_id)
                VALUES ($1,$2,$3,$4,$5,$6,$7)
                RETURNING id, game_name, player_name, score, play_count, play_date, play_time, user_id, created_at
            "#)
            .bind(&new.game_name)
            .bind(&new.player_name)
            .bind(new.score)
            .bind(new.play_count)
            .bind(&new.play_date)
            .bind(&new.play_time)
            .bind(new.user_id)
            .fetch_one(&self.pool).await?;
            Ok(rec)
        }
        async fn list_locations(&self) -> RepoResult<Vec<PlayerLocation>> {
            let recs = sqlx::query_as::<_, PlayerLocation>(
                "SELECT id, city, country, latitude, longitude, user_id, created_at FROM player_locations ORDER BY created_at DESC, id DESC"
            )
            .fetch_all(&self.pool).await?;
            Ok(recs)
        }
        async fn save_location(&self, new: NewPlayerLocation) -> RepoResult<PlayerLocation> {
            let rec = sqlx::query_as::<_, PlayerLocation>(r#"
                INSERT INTO player_locations (city, country, latitude, longitude, user_id)
                VALUES ($1,$2,$3,$4,$5)
                RETURNING id, city, country, latitude, longitude, user_id, created_at
            "#)
            .bind(&new.city)
            .bind(&new.country)
            .bind(new.latitude)
            .bind(new.longitude)
            .bind(new.user_id)
            .fetch_one(&self.pool).await?;
            Ok(rec)
        }
    }

    #[async_trait]
    impl AnalyticsRepo for PgRepo {
        async fn increment_counter(&self, key: &str) -> RepoResult<i64> {
            let value = sqlx::query_scalar::<_, i64>("UPDATE analytics SET value = value + 1 WHERE key = $1 RETURNING value")
                .bind(key)
                .fetch_optional(&self.pool).await?;
            Ok(value.unwrap_or(0))
        }
    }
}
