pub mod data_api;
pub mod innertube;
pub mod publisher;
pub mod youtube;
