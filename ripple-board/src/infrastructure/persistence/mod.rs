pub mod gateway_repository;

pub use gateway_repository::{GatewaySignalPublisher, GatewayTaskRepository};
