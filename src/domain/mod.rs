// Domain layer: the lesson-count model and the repository port. No I/O here.

pub mod model;
pub mod ports;
