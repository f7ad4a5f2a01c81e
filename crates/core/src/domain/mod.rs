pub mod recommendation;
pub mod series;
