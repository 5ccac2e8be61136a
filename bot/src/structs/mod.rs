pub mod correction;
pub mod incoming;
pub mod outcome;
pub mod reply;

pub use incoming::IncomingMessage;
pub use outcome::{Outcome, RejectReason};
pub use reply::{Reply, ReplyType};
