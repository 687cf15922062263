mod connection;
mod equipment;
mod node;
mod report;
mod splitter;

pub mod colors;

pub use connection::*;
pub use equipment::*;
pub use node::*;
pub use report::*;
pub use splitter::*;
