mod reading;
mod session;
mod system;
mod verdict;

pub use reading::*;
pub use session::*;
pub use system::*;
pub use verdict::*;
