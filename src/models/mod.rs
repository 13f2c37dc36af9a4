pub mod api;
pub mod features;
pub mod weather;
