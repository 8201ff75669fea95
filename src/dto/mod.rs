pub mod access;
pub mod comments;
pub mod moderation;
