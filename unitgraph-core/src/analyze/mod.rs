pub mod centrality;
pub mod structure;

pub use centrality::top_ranked;
pub use structure::{Bridge, Hub, StructuralReport, StructuralStats};
