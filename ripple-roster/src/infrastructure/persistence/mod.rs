pub mod gateway_repository;

pub use gateway_repository::{
    GatewayChannelRepository, GatewayInvitationRepository, GatewayMemberRepository,
    GatewayProfileRepository, GatewaySignalPublisher,
};
