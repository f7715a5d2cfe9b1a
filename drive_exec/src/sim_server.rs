//! # Simulator Server Module
//!
//! This module abstracts over the networking side of the drive executable. The server accepts a
//! connection from the simulator link, which sends one telemetry message per tick and waits for
//! the demands in reply.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    sim::{self, DriveDems, FramingError, SimEvent},
};
use log::trace;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the drive executable.
///
/// The socket is a REP socket, so every message recieved must be answered with exactly one call to
/// [`SimServer::send_dems`] or [`SimServer::send_manual`] before the next one can be read. This
/// applies to messages which failed to decode as well.
pub struct SimServer {
    socket: MonitoredSocket,

    /// True between recieving a request and sending its reply
    awaiting_reply: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`SimServer`]
#[derive(thiserror::Error, Debug)]
pub enum SimServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not recieve from the simulator: {0}")]
    RecvError(zmq::Error),

    #[error("Could not send to the simulator: {0}")]
    SendError(zmq::Error),

    #[error("Recieved a message which is not valid UTF-8")]
    NonUtf8,

    #[error("Could not decode the message: {0}")]
    Framing(FramingError),

    #[error("Attempted to reply without a pending request")]
    NoRequest,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimServer {
    /// Create a new instance of the simulator server.
    ///
    /// This function will not wait for a connection before returning.
    pub fn new(params: &NetParams) -> Result<Self, SimServerError> {
        // Create the zmq context
        let ctx = zmq::Context::new();

        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            recv_timeout: params.sim_recv_timeout_ms,
            send_timeout: params.sim_send_timeout_ms,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(&ctx, zmq::REP, socket_options, &params.sim_endpoint)?;

        Ok(Self {
            socket,
            awaiting_reply: false,
        })
    }

    /// Returns true if a peer is connected.
    pub fn connected(&self) -> bool {
        self.socket.connected()
    }

    /// Returns true if a request has been recieved which has not yet been replied to.
    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Recieve the next event from the simulator.
    ///
    /// `Ok(None)` is returned if nothing arrived before the recieve timeout. If a message did
    /// arrive (including one which could not be decoded) the caller must reply to it.
    pub fn recieve_event(&mut self) -> Result<Option<SimEvent>, SimServerError> {
        let msg = match self.socket.recv_string(0) {
            Ok(Ok(m)) => m,
            Ok(Err(_)) => {
                self.awaiting_reply = true;
                return Err(SimServerError::NonUtf8);
            }
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(SimServerError::RecvError(e)),
        };

        self.awaiting_reply = true;
        trace!("Recieved: {}", msg);

        sim::parse_message(&msg)
            .map(Some)
            .map_err(SimServerError::Framing)
    }

    /// Reply to the pending request with a set of demands.
    pub fn send_dems(&mut self, dems: &DriveDems) -> Result<(), SimServerError> {
        self.reply(&sim::steer_message(dems))
    }

    /// Reply to the pending request handing control back to the simulator.
    pub fn send_manual(&mut self) -> Result<(), SimServerError> {
        self.reply(&sim::manual_message())
    }

    fn reply(&mut self, msg: &str) -> Result<(), SimServerError> {
        if !self.awaiting_reply {
            return Err(SimServerError::NoRequest);
        }

        trace!("Sending: {}", msg);

        let result = self.socket.send(msg, 0);
        self.awaiting_reply = reply_still_pending(&result);

        result.map_err(SimServerError::SendError)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Whether a REP socket still owes a reply after a send attempt.
///
/// A send which timed out leaves the socket waiting to send, so the reply must be retried before
/// anything else can be recieved. Any other failure drops the request.
fn reply_still_pending(result: &Result<(), zmq::Error>) -> bool {
    matches!(result, Err(zmq::Error::EAGAIN))
}

impl From<MonitoredSocketError> for SimServerError {
    fn from(e: MonitoredSocketError) -> Self {
        SimServerError::SocketError(e)
    }
}
