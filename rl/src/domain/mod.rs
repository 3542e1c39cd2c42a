//! Domain types shared by producers and the admission queue

mod priority;

pub use priority::Priority;
