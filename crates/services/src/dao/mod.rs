pub mod base;
pub mod meeting;
pub mod user;
