pub mod position;
pub mod request;
pub mod transaction;
