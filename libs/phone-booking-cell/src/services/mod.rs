pub mod flow;
pub mod menus;
pub mod session;
pub mod telephony;
pub mod twiml;

pub use flow::PhoneBookingFlow;
pub use session::{spawn_session_sweeper, DynSessionStore, InMemorySessionStore, RedisSessionStore, SessionStore};
pub use telephony::{TelephonyGateway, TwilioGateway};
pub use twiml::{Gather, VoiceResponse};
