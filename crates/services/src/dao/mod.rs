pub mod base;
pub mod property;
pub mod support_case;
pub mod user;

pub use base::BaseDao;
