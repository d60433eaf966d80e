pub mod app_config;
pub mod assignment_repo;
pub mod booking_repo;
pub mod challenge_repo;
pub mod database;
pub mod identity_repo;
pub mod redis_repo;
pub mod trip_repo;

pub use database::DbClient;
pub use redis_repo::RedisClient;
