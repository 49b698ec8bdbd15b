pub mod commands;
pub mod logic;
