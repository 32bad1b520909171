mod snapshot;

pub use snapshot::{FileSnapshotStore, SnapshotError, SnapshotStore};
