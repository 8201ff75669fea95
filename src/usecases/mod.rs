pub mod comment_tree;
pub mod comments;
pub mod moderation;
