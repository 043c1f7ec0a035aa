pub mod auth;
pub mod permission;

pub use auth::{authenticate, CurrentIdentity, PresentedToken};
pub use permission::{
    require_activated_user, require_authenticated_user, require_permission, PermissionGuard,
};
