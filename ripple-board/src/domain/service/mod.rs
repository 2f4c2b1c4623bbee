pub mod board_domain_service;

pub use board_domain_service::BoardDomainService;
