pub mod refresh_token;
pub mod user;

pub use refresh_token::{LogoutRequest, RefreshRequest, RefreshToken, TokenPair};
pub use user::{NewUser, RegisterRequest, User, UserResponse};
