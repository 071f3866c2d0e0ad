mod directory;
mod message;
mod page;

pub use directory::*;
pub use message::*;
pub use page::*;
