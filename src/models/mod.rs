pub mod comments;
pub mod profiles;
pub mod roles;
