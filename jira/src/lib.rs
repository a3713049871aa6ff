mod client;
mod models;

pub use client::JiraClient;
pub use client::JiraError;
pub use models::{NewTicket, Ticket, TicketUpdate};
