pub mod oracle;
pub mod orchestrator;
pub mod response;
pub mod routing;
pub mod session;
pub mod similarity;
pub mod tickets;

pub use orchestrator::Orchestrator;
pub use response::{ResponseEnvelope, ResponseType, TicketInfo};
pub use routing::RoutingDecision;
pub use session::{Session, SessionStore, TurnContext};
