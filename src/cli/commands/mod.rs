pub mod assemble;
pub mod config;
pub mod run;
pub mod validate;
