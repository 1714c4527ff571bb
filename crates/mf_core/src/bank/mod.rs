//! Template banks: stored templates and the collections searched against.

mod error;
mod template;
mod template_bank;

pub use error::{BankError, BankResult};
pub use template::{Template, TEMPLATE_EXTENSION};
pub use template_bank::TemplateBank;
