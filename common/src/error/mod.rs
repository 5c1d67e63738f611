pub mod error_location;
pub mod token_error;
