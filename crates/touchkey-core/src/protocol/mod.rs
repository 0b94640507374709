//! Protocol module containing the wire message types and the text codec.

pub mod codec;
pub mod messages;

pub use codec::{
    decode_client_message, decode_service_message, encode_client_message,
    encode_service_message, ProtocolError,
};
pub use messages::*;
