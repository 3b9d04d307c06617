//! Log Control Messages
//!
//! The log control characteristic carries a single small message in both
//! directions:
//!
//! ```text
//! message LogControl {
//!     enum Command { START = 0; STOP = 1; CLEAR = 2; NEXT = 3; GETLENGTH = 4; }
//!     Command command = 1;
//!     uint32  length  = 2;
//! }
//! ```
//!
//! Requests from the client only set `command`. Responses reuse the command
//! value of the request they answer and put the count in `length`:
//!
//! | Message                   | command   | length        |
//! |---------------------------|-----------|---------------|
//! | `GetLengthResponse(n)`    | GETLENGTH | n             |
//! | `StartAck(n)`             | START     | n (snapshot)  |
//!
//! Because the wire form is ambiguous on its own, decoding is directional:
//! [`ControlMessage::from_request`] on the beacon,
//! [`ControlMessage::from_response`] on a client.

use crate::codec::{self, varint_field_len, WireMessage, WireValue, WireWriter};
use crate::errors::{BeaconError, BeaconResult};

const FIELD_COMMAND: u32 = 1;
const FIELD_LENGTH: u32 = 2;

/// Wire-level command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Command {
    /// Begin a transfer
    #[default]
    Start = 0,
    /// Abandon the running transfer
    Stop = 1,
    /// Erase the log
    Clear = 2,
    /// Request one more packet (pull-mode clients)
    Next = 3,
    /// Ask for the number of stored records
    GetLength = 4,
}

impl Command {
    /// Map a wire value to a command
    pub fn from_wire(value: u64) -> BeaconResult<Self> {
        match value {
            0 => Ok(Self::Start),
            1 => Ok(Self::Stop),
            2 => Ok(Self::Clear),
            3 => Ok(Self::Next),
            4 => Ok(Self::GetLength),
            _ => Err(BeaconError::format("unknown log command")),
        }
    }

    /// Name used in logs and protocol errors
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Stop => "STOP",
            Self::Clear => "CLEAR",
            Self::Next => "NEXT",
            Self::GetLength => "GETLENGTH",
        }
    }
}

/// The raw `LogControl` message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFrame {
    /// Command code
    pub command: Command,
    /// Count carried by responses
    pub length: u32,
}

impl WireMessage for ControlFrame {
    const MAX_ENCODED_LEN: usize = 2 + 1 + 5;

    fn encoded_len(&self) -> usize {
        varint_field_len(self.command as u64) + varint_field_len(self.length as u64)
    }

    fn encode_fields(&self, out: &mut WireWriter<'_>) -> BeaconResult<()> {
        out.varint_field(FIELD_COMMAND, self.command as u64)?;
        out.varint_field(FIELD_LENGTH, self.length as u64)
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> BeaconResult<()> {
        match field {
            FIELD_COMMAND => self.command = Command::from_wire(value.as_u64()?)?,
            FIELD_LENGTH => self.length = value.as_u32()?,
            _ => {}
        }
        Ok(())
    }
}

/// Control-plane message, as seen by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Begin a transfer
    Start,
    /// Abandon the running transfer
    Stop,
    /// Erase the log
    Clear,
    /// Request one more packet
    Next,
    /// Ask for the record count
    GetLength,
    /// Reply to `GetLength`
    GetLengthResponse(u32),
    /// Reply to `Start` with the number of records the transfer will carry
    StartAck(u32),
}

impl ControlMessage {
    /// Interpret a frame written by a client
    pub fn from_request(frame: ControlFrame) -> Self {
        match frame.command {
            Command::Start => Self::Start,
            Command::Stop => Self::Stop,
            Command::Clear => Self::Clear,
            Command::Next => Self::Next,
            Command::GetLength => Self::GetLength,
        }
    }

    /// Interpret a frame notified by the beacon
    pub fn from_response(frame: ControlFrame) -> BeaconResult<Self> {
        match frame.command {
            Command::Start => Ok(Self::StartAck(frame.length)),
            Command::GetLength => Ok(Self::GetLengthResponse(frame.length)),
            _ => Err(BeaconError::format("not a response command")),
        }
    }

    /// Decode a client request
    pub fn decode_request(bytes: &[u8]) -> BeaconResult<Self> {
        codec::decode::<ControlFrame>(bytes).map(Self::from_request)
    }

    /// Decode a beacon response
    pub fn decode_response(bytes: &[u8]) -> BeaconResult<Self> {
        codec::decode::<ControlFrame>(bytes).and_then(Self::from_response)
    }

    /// Wire representation of this message
    pub fn to_frame(self) -> ControlFrame {
        let (command, length) = match self {
            Self::Start => (Command::Start, 0),
            Self::Stop => (Command::Stop, 0),
            Self::Clear => (Command::Clear, 0),
            Self::Next => (Command::Next, 0),
            Self::GetLength => (Command::GetLength, 0),
            Self::GetLengthResponse(n) => (Command::GetLength, n),
            Self::StartAck(n) => (Command::Start, n),
        };
        ControlFrame { command, length }
    }

    /// Command name for logs
    pub fn name(self) -> &'static str {
        match self {
            Self::GetLengthResponse(_) => "GETLENGTH_RESPONSE",
            Self::StartAck(_) => "START_ACK",
            other => other.to_frame().command.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;

    #[test]
    fn start_request_is_empty_on_the_wire() {
        let bytes = encode(&ControlMessage::Start.to_frame()).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(ControlMessage::decode_request(&bytes).unwrap(), ControlMessage::Start);
    }

    #[test]
    fn get_length_response_layout() {
        let bytes = encode(&ControlMessage::GetLengthResponse(100).to_frame()).unwrap();
        assert_eq!(bytes.as_slice(), &[0x08, 0x04, 0x10, 0x64]);
        assert_eq!(
            ControlMessage::decode_response(&bytes).unwrap(),
            ControlMessage::GetLengthResponse(100)
        );
    }

    #[test]
    fn requests_ignore_length() {
        let frame = ControlFrame { command: Command::Clear, length: 7 };
        assert_eq!(ControlMessage::from_request(frame), ControlMessage::Clear);
    }

    #[test]
    fn unknown_command_is_a_format_error() {
        assert!(matches!(
            ControlMessage::decode_request(&[0x08, 0x09]),
            Err(BeaconError::Format { .. })
        ));
    }

    #[test]
    fn stop_is_not_a_response() {
        let bytes = encode(&ControlMessage::Stop.to_frame()).unwrap();
        assert!(ControlMessage::decode_response(&bytes).is_err());
    }
}
