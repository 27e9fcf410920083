//! Application services layer.

pub mod accounts;
pub mod error;
pub mod feed;
pub mod follows;
pub mod guard;
pub mod pagination;
pub mod posts;
pub mod repos;
