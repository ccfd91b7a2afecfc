pub mod pass;
pub mod supervisor;
