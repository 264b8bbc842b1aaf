pub mod fetch_state;
pub mod file_validator;
pub mod gateway;
pub mod http_gateway;
pub mod memory_gateway;
pub mod navigation;
pub mod presenter;
pub mod state;
pub mod submission;
