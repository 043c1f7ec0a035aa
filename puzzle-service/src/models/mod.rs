pub mod identity;
pub mod permission;
pub mod puzzle;
pub mod token;
pub mod user;

pub use identity::Identity;
pub use permission::{PermissionCode, PermissionSet};
pub use puzzle::{
    Author, ClueData, NewPuzzle, PublishedFilter, Puzzle, PuzzleData, PuzzlePatch, PuzzleSort,
};
pub use token::{IssuedToken, Token, TokenScope};
pub use user::{NewUser, User, UserResponse};
