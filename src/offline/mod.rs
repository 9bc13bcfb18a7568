pub mod connectivity;
pub mod queue;

pub use connectivity::Connectivity;
pub use queue::OfflineQueue;
