pub mod social;
pub mod users;
