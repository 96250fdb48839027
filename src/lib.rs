pub mod config;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod hazards;
pub mod matcher;
pub mod output;
pub mod polyline;
pub mod request;
pub mod routing;
