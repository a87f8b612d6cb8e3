pub mod display;
pub mod selector;
