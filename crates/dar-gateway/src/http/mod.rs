pub mod dar;
pub mod error;
pub mod health;
pub mod programs;
pub mod todos;
