//! sea-orm entities for the accounts service database.

pub mod logins;
pub mod outbox_events;
pub mod users;
