// Integration test library
// Shared helpers plus cross-component tests driven against wiremock


pub mod test_cookies;
pub mod test_encodings;
pub mod test_redirects;
pub mod test_streaming;
pub mod test_uploads;

// Re-export commonly used types
pub use httpr::{AsyncClient, Client, Error, Method};
pub use url::Url;
