pub mod bridge;
pub mod dom;
pub mod metrics;
pub mod output;
pub mod rewriter;
