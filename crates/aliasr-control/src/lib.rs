pub mod control;

pub use control::AsrControl;
