mod http;

pub use http::HttpAnalyzer;
