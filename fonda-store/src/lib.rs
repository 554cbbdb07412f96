pub mod app_config;
pub mod catalog_repo;
pub mod customer_repo;
pub mod database;
pub mod events;
pub mod memory;
pub mod order_repo;
pub mod redis_repo;

pub use catalog_repo::StoreProductRepository;
pub use customer_repo::StoreCustomerRepository;
pub use database::DbClient;
pub use events::ChangeFeed;
pub use memory::{InMemoryStore, MemoryCartStore};
pub use order_repo::StoreOrderRepository;
pub use redis_repo::{RedisCartStore, RedisClient};
