pub mod history;
pub mod indicator;
pub mod metadata;
pub mod price;
pub mod score;

pub use history::*;
pub use indicator::*;
pub use metadata::*;
pub use price::*;
pub use score::*;
