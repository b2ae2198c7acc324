mod create_request;
pub mod models;

pub use create_request::CreateRequest;
