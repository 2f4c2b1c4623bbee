pub mod scope_timeline;
pub mod timeline_domain_service;

pub use scope_timeline::{InsertOutcome, ScopeTimeline};
pub use timeline_domain_service::TimelineDomainService;
