pub mod json;
pub mod password;
pub mod patch;
pub mod token;

pub use json::StrictJson;
pub use password::Credential;
pub use patch::Patch;
