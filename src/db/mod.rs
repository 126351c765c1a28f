pub mod models;
pub mod store;

pub use models::{Sample, SamplePoint};
pub use store::{connect, SampleStore};
