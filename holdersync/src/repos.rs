#[cfg(feature = "postgres")]
mod postgres_repo;
mod repo;

#[cfg(feature = "postgres")]
pub use postgres_repo::PostgresRepo;
pub use repo::{HolderRow, Repo, RepoError, SQLikeMigrations};
