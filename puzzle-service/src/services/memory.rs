//! In-memory [`Store`] with the same semantics as the Postgres one:
//! unique email and display name, version compare-and-swap, token expiry,
//! windowed listings. Used by the integration tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use service_core::pagination::{Metadata, Page, PageRequest};

use super::error::StoreError;
use super::store::Store;
use crate::models::{
    Author, NewPuzzle, NewUser, PermissionCode, PermissionSet, PublishedFilter, Puzzle,
    PuzzleData, PuzzleSort, Token, TokenScope, User,
};

#[derive(Debug, Clone)]
struct StoredPuzzle {
    id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    title: String,
    description: String,
    content: PuzzleData,
    width: i32,
    height: i32,
    published: bool,
    author_id: i64,
    version: i32,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    puzzles: BTreeMap<i64, StoredPuzzle>,
    tokens: Vec<Token>,
    permissions: HashMap<i64, PermissionSet>,
    last_user_id: i64,
    last_puzzle_id: i64,
}

impl Tables {
    fn check_unique(&self, id: Option<i64>, email: &str, display_name: &str) -> Result<(), StoreError> {
        let others = self.users.values().filter(|u| Some(u.id) != id);
        for user in others {
            if user.email == email {
                return Err(StoreError::DuplicateEmail);
            }
            if user.display_name == display_name {
                return Err(StoreError::DuplicateDisplayName);
            }
        }
        Ok(())
    }

    fn materialize(&self, stored: &StoredPuzzle) -> Result<Puzzle, StoreError> {
        let author = self
            .users
            .get(&stored.author_id)
            .ok_or_else(|| anyhow::anyhow!("puzzle {} has no author", stored.id))?;

        Ok(Puzzle {
            id: stored.id,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            title: stored.title.clone(),
            description: stored.description.clone(),
            content: stored.content.clone(),
            width: stored.width,
            height: stored.height,
            published: stored.published,
            author: Author::from(author),
            version: stored.version,
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Internal(anyhow::anyhow!("memory store mutex poisoned: {}", e)))
    }
}

/// Strictly later than `previous`, matching the microsecond resolution of
/// `timestamptz`.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn compare(a: &StoredPuzzle, b: &StoredPuzzle, key: PuzzleSort) -> std::cmp::Ordering {
    match key {
        PuzzleSort::Id => a.id.cmp(&b.id),
        PuzzleSort::Title => a.title.cmp(&b.title),
        PuzzleSort::CreatedAt => a.created_at.cmp(&b.created_at),
        PuzzleSort::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut tables = self.lock()?;
        tables.check_unique(None, &user.email, &user.display_name)?;

        tables.last_user_id += 1;
        let stored = User {
            id: tables.last_user_id,
            created_at: Utc::now(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            display_name: user.display_name.clone(),
            credential: user.credential.clone(),
            activated: user.activated,
            version: 1,
        };
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, id: i64) -> Result<User, StoreError> {
        self.lock()?.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_user_for_token(&self, scope: TokenScope, hash: &[u8]) -> Result<User, StoreError> {
        let tables = self.lock()?;
        let now = Utc::now();
        let token = tables
            .tokens
            .iter()
            .find(|t| t.hash == hash && t.is_valid_at(scope, now))
            .ok_or(StoreError::NotFound)?;
        tables.users.get(&token.user_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, user: &mut User) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        match tables.users.get(&user.id) {
            Some(stored) if stored.version == user.version => {}
            _ => return Err(StoreError::EditConflict),
        }
        tables.check_unique(Some(user.id), &user.email, &user.display_name)?;

        user.version += 1;
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_permissions_for_user(&self, user_id: i64) -> Result<PermissionSet, StoreError> {
        Ok(self.lock()?.permissions.get(&user_id).cloned().unwrap_or_default())
    }

    async fn add_permissions_for_user(
        &self,
        user_id: i64,
        codes: &[PermissionCode],
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::Internal(anyhow::anyhow!(
                "no user {} to grant permissions to",
                user_id
            )));
        }
        let set = tables.permissions.entry(user_id).or_default();
        for code in codes {
            set.insert(*code);
        }
        Ok(())
    }

    async fn insert_token(&self, token: &Token) -> Result<(), StoreError> {
        self.lock()?.tokens.push(token.clone());
        Ok(())
    }

    async fn delete_token(&self, scope: TokenScope, hash: &[u8]) -> Result<(), StoreError> {
        self.lock()?
            .tokens
            .retain(|t| !(t.scope == scope && t.hash == hash));
        Ok(())
    }

    async fn delete_expired_tokens_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let now = Utc::now();
        let before = tables.tokens.len();
        tables
            .tokens
            .retain(|t| !(t.user_id == user_id && t.expiry <= now));
        Ok((before - tables.tokens.len()) as u64)
    }

    async fn insert_puzzle(&self, puzzle: &NewPuzzle) -> Result<Puzzle, StoreError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&puzzle.author.id) {
            return Err(StoreError::Internal(anyhow::anyhow!(
                "author {} does not exist",
                puzzle.author.id
            )));
        }

        tables.last_puzzle_id += 1;
        let now = Utc::now();
        let stored = StoredPuzzle {
            id: tables.last_puzzle_id,
            created_at: now,
            updated_at: now,
            title: puzzle.title.clone(),
            description: puzzle.description.clone(),
            content: puzzle.content.clone(),
            width: puzzle.width,
            height: puzzle.height,
            published: puzzle.published,
            author_id: puzzle.author.id,
            version: 1,
        };
        let created = tables.materialize(&stored)?;
        tables.puzzles.insert(stored.id, stored);
        Ok(created)
    }

    async fn get_puzzle(&self, id: i64) -> Result<Puzzle, StoreError> {
        let tables = self.lock()?;
        let stored = tables.puzzles.get(&id).ok_or(StoreError::NotFound)?;
        tables.materialize(stored)
    }

    async fn update_puzzle(&self, puzzle: &mut Puzzle) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let stored = match tables.puzzles.get_mut(&puzzle.id) {
            Some(stored) if stored.version == puzzle.version => stored,
            _ => return Err(StoreError::EditConflict),
        };

        stored.title = puzzle.title.clone();
        stored.description = puzzle.description.clone();
        stored.content = puzzle.content.clone();
        stored.width = puzzle.width;
        stored.height = puzzle.height;
        stored.published = puzzle.published;
        stored.version += 1;
        stored.updated_at = next_timestamp(stored.updated_at);

        puzzle.version = stored.version;
        puzzle.updated_at = stored.updated_at;
        Ok(())
    }

    async fn delete_puzzle(&self, id: i64) -> Result<(), StoreError> {
        self.lock()?
            .puzzles
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_puzzles(
        &self,
        filter: PublishedFilter,
        page: &PageRequest<PuzzleSort>,
    ) -> Result<Page<Puzzle>, StoreError> {
        let tables = self.lock()?;
        let mut matching: Vec<&StoredPuzzle> = tables
            .puzzles
            .values()
            .filter(|p| filter.admits(p.published))
            .collect();

        matching.sort_by(|a, b| {
            let primary = compare(a, b, page.sort.key);
            let primary = if page.sort.descending {
                primary.reverse()
            } else {
                primary
            };
            primary.then(a.id.cmp(&b.id))
        });

        let total_records = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(0);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|p| tables.materialize(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            metadata: Metadata::calculate(total_records, page.page, page.page_size),
        })
    }
}
