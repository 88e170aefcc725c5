pub mod changes;
pub mod topology;

pub use changes::{ChangeEvent, ChangeSchedule, EdgeChange};
pub use topology::Topology;
