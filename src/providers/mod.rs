pub mod advisor;
pub mod util;

pub use advisor::HttpAdvisor;
