use service_core::error::AppError;

use super::user::User;

/// Who is making the current request.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated(User),
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(user) => Some(user),
        }
    }

    /// 401 for anonymous callers.
    pub fn require_authenticated(&self) -> Result<&User, AppError> {
        self.user().ok_or(AppError::AuthenticationRequired)
    }

    /// 401 for anonymous callers, then 403 for accounts not yet activated.
    pub fn require_activated(&self) -> Result<&User, AppError> {
        let user = self.require_authenticated()?;
        if !user.activated {
            return Err(AppError::NotActivated);
        }
        Ok(user)
    }
}
