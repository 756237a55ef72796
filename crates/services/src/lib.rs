pub mod auth;
pub mod dao;
pub mod notify;
pub mod support;

pub use auth::AuthService;
pub use dao::*;
pub use notify::{CaseNotifier, EmailNotifier};
pub use support::CaseLifecycle;
