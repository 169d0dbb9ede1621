pub mod command_utils;
pub mod progress;
