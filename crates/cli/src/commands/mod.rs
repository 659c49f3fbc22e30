mod chr;
mod inspect;
mod request;
mod verify;

#[cfg(test)]
mod fixtures;

pub use chr::*;
pub use inspect::*;
pub use request::*;
pub use verify::*;
