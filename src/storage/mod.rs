pub mod history;
pub mod workspace;
