mod wire;

pub use wire::{PresenceContext, initialize};
