pub mod action;
pub mod commands;
pub mod complete;
pub mod delete;
pub mod edit;
pub mod get_then_make;
pub mod help;
pub mod make;
pub mod paste;
pub mod sequentially;
