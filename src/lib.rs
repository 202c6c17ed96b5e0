// src/lib.rs
pub use ami_update::{AmiUpdateStack, build};
pub use config::StackConfig;
pub use error::StackError;
pub use stack::{Construct, Lint, Stack, StackContext};
pub use template::{ResourceDecl, Template, TemplateParameter};
pub use traits::CfnResource;

pub mod ami_update;
pub mod config;
mod error;
pub mod stack;
pub mod template;
pub mod timers;
mod traits;
pub mod types;
