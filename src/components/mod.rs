pub mod cell_tools;
pub mod history;
pub mod tools;
