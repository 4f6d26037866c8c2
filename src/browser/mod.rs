pub mod chrome;
pub mod document;
pub mod js;

pub use chrome::{ChromeDriver, ConnectionMode};
pub use document::ChromeDocument;
