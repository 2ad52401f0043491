pub mod core;
pub mod documents;
pub mod inbox;
pub mod milestones;
pub mod payments;
pub mod reports;
pub mod sessions;
pub mod verify;
