mod wire;

pub use wire::{TimelineContext, initialize};
