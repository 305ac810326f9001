//! Ordering primitives shared by the server's session and dispatch layers.

pub mod sequence;

pub use sequence::SequenceCounter;
