pub mod analyse;
pub mod plan;
