// CLI front-end

pub mod commands;
pub mod completion;
pub mod output;
