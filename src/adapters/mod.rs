pub mod in_memory_order_repository;
pub mod postgres_order_repository;

pub use in_memory_order_repository::InMemoryOrderRepository;
pub use postgres_order_repository::PostgresOrderRepository;
