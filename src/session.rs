//! Protocol session adapter.
//!
//! One session is opened per collection pass and shared by every group in
//! that pass; dropping the session releases the transport. The
//! [`ProtocolSession`] and [`SessionFactory`] traits are the seam between
//! collection logic and the `snmp2` client, and the seam test doubles plug
//! into.

mod snmp;
mod types;

pub use snmp::{SnmpSessionFactory, parse_oid};
pub use types::{ProtocolSession, SessionError, SessionFactory, Varbind, VarbindError, WireValue};
