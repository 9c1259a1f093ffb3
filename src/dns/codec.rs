use crate::{
    dns::{Error, Message},
    parser, serializer,
};

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Frames DNS messages on a datagram socket.
///
/// The codec holds no state, every datagram is decoded and every message
/// encoded on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct Codec;

impl Decoder for Codec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }

        log::debug!("Unpacking DNS message of {} bytes.", buf.len());

        // a datagram carries exactly one message, so whatever is left in the
        // buffer after parsing (or after failing to) has to go
        let msg = parser::dns_message(&buf[..]);
        buf.clear();

        msg.map(Some)
    }
}

impl Encoder<Message> for Codec {
    type Error = Error;

    fn encode(&mut self, msg: Message, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let data = serializer::dns_message(&msg)?;
        buf.reserve(data.len());
        buf.put(data);
        Ok(())
    }
}
