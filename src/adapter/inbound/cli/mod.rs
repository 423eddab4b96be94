//! CLI module graph.

pub mod check;
pub mod command;
pub mod cursor;
pub mod output;
pub mod paths;
pub mod run;
