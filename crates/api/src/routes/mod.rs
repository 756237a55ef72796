pub mod seen;
pub mod support_case;
