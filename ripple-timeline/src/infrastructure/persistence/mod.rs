pub mod gateway_repository;
pub mod profile_resolver;

pub use gateway_repository::{GatewayMessageRepository, GatewayReactionRepository};
pub use profile_resolver::GatewayProfileResolver;
