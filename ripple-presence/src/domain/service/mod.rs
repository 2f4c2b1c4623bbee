pub mod presence_service;
pub mod typing_service;

pub use presence_service::PresenceDomainService;
pub use typing_service::TypingDomainService;
