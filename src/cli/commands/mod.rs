//! One module per tool action.

pub mod check;
pub mod encrypt;
pub mod list;
pub mod remove;
pub mod store;
