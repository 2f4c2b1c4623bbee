mod wire;

pub use wire::{BoardContext, initialize};
