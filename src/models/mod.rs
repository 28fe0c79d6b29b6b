pub mod stock;
pub mod indicator;
pub mod screen;
pub mod response;

pub use stock::*;
pub use indicator::*;
pub use screen::*;
pub use response::*;
