use async_trait::async_trait;
use service_core::pagination::{Page, PageRequest};

use super::error::StoreError;
use crate::models::{
    NewPuzzle, NewUser, PermissionCode, PermissionSet, PublishedFilter, Puzzle, PuzzleSort,
    Token, TokenScope, User,
};

/// Everything the handlers need from persistence.
///
/// `update_*` are compare-and-swap writes: they succeed only while the
/// stored version still equals the value's `version`, then write the new
/// version (and timestamp) back into the value. Otherwise they return
/// [`StoreError::EditConflict`] and leave the row untouched.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError>;
    async fn get_user(&self, id: i64) -> Result<User, StoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;
    /// The owner of an unexpired token with this hash and scope.
    async fn get_user_for_token(&self, scope: TokenScope, hash: &[u8]) -> Result<User, StoreError>;
    async fn update_user(&self, user: &mut User) -> Result<(), StoreError>;

    async fn get_permissions_for_user(&self, user_id: i64) -> Result<PermissionSet, StoreError>;
    async fn add_permissions_for_user(
        &self,
        user_id: i64,
        codes: &[PermissionCode],
    ) -> Result<(), StoreError>;

    async fn insert_token(&self, token: &Token) -> Result<(), StoreError>;
    async fn delete_token(&self, scope: TokenScope, hash: &[u8]) -> Result<(), StoreError>;
    /// Returns the number of tokens removed.
    async fn delete_expired_tokens_for_user(&self, user_id: i64) -> Result<u64, StoreError>;

    async fn insert_puzzle(&self, puzzle: &NewPuzzle) -> Result<Puzzle, StoreError>;
    async fn get_puzzle(&self, id: i64) -> Result<Puzzle, StoreError>;
    async fn update_puzzle(&self, puzzle: &mut Puzzle) -> Result<(), StoreError>;
    async fn delete_puzzle(&self, id: i64) -> Result<(), StoreError>;
    async fn list_puzzles(
        &self,
        filter: PublishedFilter,
        page: &PageRequest<PuzzleSort>,
    ) -> Result<Page<Puzzle>, StoreError>;
}
