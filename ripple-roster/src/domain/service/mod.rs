pub mod channel_directory_service;
pub mod invitation_service;
pub mod member_directory_service;
pub mod profile_directory;

pub use channel_directory_service::ChannelDirectoryService;
pub use invitation_service::InvitationService;
pub use member_directory_service::MemberDirectoryService;
pub use profile_directory::ProfileDirectory;
