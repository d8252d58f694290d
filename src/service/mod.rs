pub mod drive_gateway;
pub mod store;

pub use drive_gateway::DriveGateway;
pub use store::DriveStore;
