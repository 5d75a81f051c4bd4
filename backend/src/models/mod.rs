//! Domain models shared by the repository, services and HTTP layers.

pub mod opening_hours;
pub mod venue;

pub use opening_hours::*;
pub use venue::*;
