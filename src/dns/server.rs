use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::BytesMut;
use futures::StreamExt;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::{codec::Encoder, udp::UdpFramed};

use crate::{
    dns::{
        request::Request,
        response::Response,
        Codec, Error, Message,
    },
    Lookup,
};

/// Answers a single request from `lookup`.
pub async fn handle_request(lookup: &dyn Lookup, request: Request) -> Response {
    let query = match request {
        Request::Query(query) => query,
        Request::Invalid { id, question } => {
            log::debug!("Rejecting message {} with FORMERR", id);
            return Response::format_error(id, question);
        }
    };

    let question = &query.question;
    match lookup
        .lookup(question.name.as_str(), &question.qtype.to_string())
        .await
    {
        Ok(records) => {
            log::debug!(
                "{} record(s) for {} {}",
                records.len(),
                question.name,
                question.qtype
            );
            Response::answer(query, records)
        }
        Err(err) => {
            log::warn!(
                "Lookup of {} {} failed: {}",
                question.name,
                question.qtype,
                err
            );
            Response::server_failure(query)
        }
    }
}

pub async fn handle_message(lookup: &dyn Lookup, msg: Message) -> Message {
    handle_request(lookup, Request::from(msg)).await.into()
}

pub struct Server {
    pub lookup: Arc<dyn Lookup>,
    pub listen_addr: IpAddr,
    pub listen_port: u16,
    /// Sets the AA bit on every reply.
    pub authoritative: bool,
}

impl Server {
    pub async fn run(self) -> Result<(), Error> {
        let socket = UdpSocket::bind((self.listen_addr, self.listen_port)).await?;
        log::info!("DNS server now listening on: {}", socket.local_addr()?);

        self.serve(socket).await
    }

    /// Serves requests arriving on `socket` until it fails.
    ///
    /// Every request is handled on a task of its own, replies go back
    /// through a single sender task in whatever order they complete. Each
    /// reply is a one-shot send, a failed one is logged and forgotten.
    pub async fn serve(self, socket: UdpSocket) -> Result<(), Error> {
        let socket = Arc::new(socket);
        let mut requests = UdpFramed::new(Arc::clone(&socket), Codec);

        let (tx, rx) = mpsc::unbounded_channel::<(Message, SocketAddr)>();

        let sender = tokio::spawn(send_replies(socket, rx));

        while let Some(frame) = requests.next().await {
            let (msg, peer) = match frame {
                Ok(frame) => frame,
                Err(Error::Io(err)) => {
                    log::warn!("Receiving datagram failed: {}", err);
                    continue;
                }
                Err(err) => {
                    log::warn!("Dropping undecodable datagram: {}", err);
                    continue;
                }
            };

            log::debug!("Message {} from {}", msg.id, peer);

            let lookup = Arc::clone(&self.lookup);
            let tx = tx.clone();
            let authoritative = self.authoritative;
            tokio::spawn(async move {
                let mut reply = handle_message(lookup.as_ref(), msg).await;
                reply.flags.authoritative = authoritative;

                if tx.send((reply, peer)).is_err() {
                    log::error!("Reply to {} dropped, sender is gone", peer);
                }
            });
        }

        drop(tx);
        sender.await.ok();

        Ok(())
    }
}

/// Sends every reply coming out of `replies` as a datagram of its own.
async fn send_replies(
    socket: Arc<UdpSocket>,
    mut replies: mpsc::UnboundedReceiver<(Message, SocketAddr)>,
) {
    let mut buf = BytesMut::new();
    while let Some((msg, peer)) = replies.recv().await {
        let id = msg.id;
        buf.clear();
        if let Err(err) = Codec.encode(msg, &mut buf) {
            log::error!("Failed to encode reply {} to {}: {}", id, peer, err);
            continue;
        }

        if let Err(err) = socket.send_to(&buf, peer).await {
            log::error!("Failed to send reply {} to {}: {}", id, peer, err);
        }
    }
}
