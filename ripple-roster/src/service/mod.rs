mod wire;

pub use wire::{RosterContext, initialize};
