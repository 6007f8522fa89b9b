//! The peer session: connection ownership, the send mutex, the inbound
//! dispatch loop, and the request/response waiter table (spec.md §4.E,
//! §5, Component E).
//!
//! Generalized from the teacher's `Peer` (`overlay/peer.rs`): the teacher
//! owns one `TcpStream` directly and clones the whole struct (including a
//! `try_clone`d socket) whenever another owner is needed. Per the spec.md
//! §9 redesign notes ("global process state" / "ad-hoc waiter table"),
//! this version keeps the socket and mutable session state behind a
//! `Mutex` inside a shared `Arc`, so `PeerSession` itself is a cheap,
//! `Clone`-able handle — the caller's copy and the dispatcher thread's
//! copy refer to the same connection instead of duplicating its state.

use crate::config::OverlayConfig;
use crate::crypto::{self, SessionCrypto};
use crate::error::{OverlayError, Result};
use crate::framing;
use crate::handshake;
use crate::identity::NodeIdentity;
use crate::xdr::{self, AuthenticatedMessageV0, StellarMessage};
use log::{debug, error, info, trace, warn};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Connecting,
    AwaitingHelloResponse,
    AwaitingAuthResponse,
    Running,
    Closed,
}

type OnMessageCallback = dyn Fn(StellarMessage) + Send + Sync;

struct Waiters {
    /// One-shot waiters: a FIFO queue per message type, drained in order
    /// (spec.md §9: "request helpers must serialize their use" for a
    /// given type, which a FIFO queue does safely regardless).
    oneshot: HashMap<&'static str, VecDeque<Sender<StellarMessage>>>,
    /// Persistent subscribers, kept until the caller cancels.
    streams: HashMap<&'static str, Vec<Sender<StellarMessage>>>,
}

impl Waiters {
    fn new() -> Self {
        Waiters {
            oneshot: HashMap::new(),
            streams: HashMap::new(),
        }
    }
}

struct WriteHalf {
    stream: TcpStream,
    send_seq: u64,
}

struct Shared {
    write: Mutex<WriteHalf>,
    /// Clone of the socket used solely to arm/clear the dispatcher's read
    /// deadline from another thread (spec.md §4.D, §4.E `must_respond`).
    deadline_control: TcpStream,
    crypto: Mutex<SessionCrypto>,
    identity: NodeIdentity,
    config: OverlayConfig,
    state: Mutex<PeerState>,
    peer_info: Mutex<xdr::Hello>,
    waiters: Mutex<Waiters>,
    on_message: Mutex<Option<Box<OnMessageCallback>>>,
}

/// A single authenticated, MAC-protected connection to a Stellar Core node.
///
/// Cheap to `Clone`: clones share the same underlying connection (spec.md
/// §1 Non-goals: "multiplexing multiple concurrent peers through a single
/// object" refers to one `PeerSession` per TCP connection, not to how many
/// handles may refer to that one session).
#[derive(Clone)]
pub struct PeerSession {
    shared: Arc<Shared>,
}

impl PeerSession {
    /// Open a TCP connection to `address` with the configured dial
    /// timeout. Does not perform the handshake yet (spec.md §4.E).
    pub fn connect(identity: NodeIdentity, address: &str, config: OverlayConfig) -> Result<PeerSession> {
        let socket_addr = address
            .to_socket_addrs()
            .map_err(OverlayError::Io)?
            .next()
            .ok_or_else(|| OverlayError::Protocol(format!("unresolvable address: {}", address)))?;

        let stream = TcpStream::connect_timeout(&socket_addr, config.dial_timeout())?;
        debug!("connected to {}", address);

        let write_clone = stream.try_clone()?;
        let deadline_control = stream.try_clone()?;

        let shared = Shared {
            write: Mutex::new(WriteHalf {
                stream: write_clone,
                send_seq: 0,
            }),
            deadline_control,
            crypto: Mutex::new(SessionCrypto::new_ephemeral()),
            identity,
            config,
            state: Mutex::new(PeerState::Connecting),
            peer_info: Mutex::new(xdr::Hello::default()),
            waiters: Mutex::new(Waiters::new()),
            on_message: Mutex::new(None),
        };

        Ok(PeerSession {
            shared: Arc::new(shared),
        })
    }

    /// Run the handshake and, on success, spawn the inbound dispatch loop.
    pub fn start(&self) -> Result<()> {
        let mut dispatcher_stream = {
            let write = self.shared.write.lock().unwrap();
            write.stream.try_clone()?
        };

        self.set_state(PeerState::AwaitingHelloResponse);
        match handshake::perform(self, &mut dispatcher_stream) {
            Ok(()) => {
                self.set_state(PeerState::Running);
                info!("handshake complete, peer {} running", self.address_hint());
            }
            Err(e) => {
                error!("handshake failed: {}", e);
                self.close();
                return Err(e);
            }
        }

        let session = self.clone();
        std::thread::spawn(move || session.dispatch_loop(dispatcher_stream));
        Ok(())
    }

    fn address_hint(&self) -> String {
        self.shared
            .write
            .lock()
            .unwrap()
            .stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string())
    }

    pub fn state(&self) -> PeerState {
        *self.shared.state.lock().unwrap()
    }

    pub(crate) fn set_state(&self, state: PeerState) {
        *self.shared.state.lock().unwrap() = state;
    }

    pub fn peer_info(&self) -> xdr::Hello {
        self.shared.peer_info.lock().unwrap().clone()
    }

    pub(crate) fn config(&self) -> &OverlayConfig {
        &self.shared.config
    }

    pub(crate) fn identity(&self) -> &NodeIdentity {
        &self.shared.identity
    }

    /// Register the callback invoked for every inbound message once
    /// `Running`, for message types with no registered waiter (spec.md
    /// §4.E). The default is to drop unrouted messages.
    pub fn set_on_message<F>(&self, callback: F)
    where
        F: Fn(StellarMessage) + Send + Sync + 'static,
    {
        *self.shared.on_message.lock().unwrap() = Some(Box::new(callback));
    }

    pub(crate) fn build_hello(&self, local_nonce: [u8; 32], cert: xdr::AuthCert) -> xdr::Hello {
        let config = &self.shared.config;
        xdr::Hello {
            ledger_version: config.ledger_version,
            overlay_version: config.overlay_version,
            overlay_min_version: config.overlay_min_version,
            network_id: xdr::Uint256(*self.shared.identity.network_id()),
            version_str: config.version_string.clone(),
            listening_port: config.listening_port,
            peer_id: xdr::PublicKey::Ed25519(xdr::Uint256(self.shared.identity.public_key_bytes())),
            cert,
            nonce: xdr::Uint256(local_nonce),
        }
    }

    pub(crate) fn with_crypto<T>(&self, f: impl FnOnce(&mut SessionCrypto) -> T) -> T {
        let mut crypto = self.shared.crypto.lock().unwrap();
        f(&mut crypto)
    }

    pub(crate) fn set_peer_info(&self, hello: xdr::Hello) {
        *self.shared.peer_info.lock().unwrap() = hello;
    }

    /// Serialize, stamp, authenticate and write `message`. Holds the send
    /// mutex for the duration (spec.md §4.E, §5 ordering guarantees).
    pub fn send(&self, message: StellarMessage) -> Result<()> {
        let authenticated = message.is_authenticated();

        let mut write = self.shared.write.lock().unwrap();
        write
            .stream
            .set_write_timeout(Some(self.shared.config.request_timeout()))?;

        let sequence = write.send_seq;
        let mac = if authenticated {
            let sending_key = {
                let crypto = self.shared.crypto.lock().unwrap();
                *crypto.sending_mac_key()
            };
            let mut mac_input = Vec::new();
            serde_xdr::to_writer(&mut mac_input, &sequence)?;
            serde_xdr::to_writer(&mut mac_input, &message)?;
            xdr::HmacSha256Mac {
                mac: crypto::hmac_sha256(&sending_key, &mac_input),
            }
        } else {
            xdr::HmacSha256Mac { mac: [0u8; 32] }
        };

        let envelope = xdr::AuthenticatedMessage::V0(AuthenticatedMessageV0 {
            sequence,
            message,
            mac,
        });

        let bytes = framing::marshal(&envelope)?;
        trace!("writing frame of {} bytes", bytes.len());
        framing::write_frame(&mut write.stream, &bytes)?;

        if authenticated {
            write.send_seq = write
                .send_seq
                .checked_add(1)
                .ok_or_else(|| OverlayError::Protocol("send sequence counter overflowed".to_string()))?;
        }

        write.stream.set_write_timeout(None)?;
        Ok(())
    }

    /// Arm a read deadline on the dispatcher's next frame read, used by
    /// request helpers to bound request/response latency (spec.md §4.E).
    pub fn must_respond(&self) {
        let _ = self
            .shared
            .deadline_control
            .set_read_timeout(Some(self.shared.config.request_timeout()));
    }

    /// Register a one-shot waiter for the next inbound message of
    /// `type_name` and block the caller until it arrives or the
    /// application-level `wait_for` timeout expires.
    pub fn wait_for(&self, type_name: &'static str) -> Result<StellarMessage> {
        let (tx, rx) = mpsc::channel();
        self.shared
            .waiters
            .lock()
            .unwrap()
            .oneshot
            .entry(type_name)
            .or_insert_with(VecDeque::new)
            .push_back(tx.clone());

        match rx.recv_timeout(self.shared.config.wait_for_timeout()) {
            Ok(message) => Ok(message),
            Err(_) => {
                warn!("wait_for({}) timed out", type_name);
                self.remove_oneshot_waiter(type_name, &tx);
                Err(OverlayError::Timeout(type_name))
            }
        }
    }

    fn remove_oneshot_waiter(&self, type_name: &'static str, tx: &Sender<StellarMessage>) {
        if let Some(queue) = self.shared.waiters.lock().unwrap().oneshot.get_mut(type_name) {
            if let Some(pos) = queue.iter().position(|s| s.same_channel(tx)) {
                queue.remove(pos);
            }
        }
    }

    /// Like `wait_for`, but resolves on the first inbound message matching
    /// any of `type_names` — used by request helpers that may be answered
    /// either by their expected response type or by `DontHave` (spec.md
    /// §4.F).
    pub fn wait_for_any(&self, type_names: &[&'static str]) -> Result<StellarMessage> {
        let (tx, rx) = mpsc::channel();
        {
            let mut waiters = self.shared.waiters.lock().unwrap();
            for type_name in type_names {
                waiters
                    .oneshot
                    .entry(type_name)
                    .or_insert_with(VecDeque::new)
                    .push_back(tx.clone());
            }
        }

        let result = rx.recv_timeout(self.shared.config.wait_for_timeout());
        for type_name in type_names {
            self.remove_oneshot_waiter(type_name, &tx);
        }

        match result {
            Ok(message) => Ok(message),
            Err(_) => {
                warn!("wait_for_any({:?}) timed out", type_names);
                Err(OverlayError::Timeout(type_names.first().copied().unwrap_or("unknown")))
            }
        }
    }

    /// Subscribe to every inbound message of `type_name` until cancelled.
    pub fn wait_for_stream(&self, type_name: &'static str) -> (Receiver<StellarMessage>, StreamCancel) {
        let (tx, rx) = mpsc::channel();
        self.shared
            .waiters
            .lock()
            .unwrap()
            .streams
            .entry(type_name)
            .or_insert_with(Vec::new)
            .push(tx.clone());

        (
            rx,
            StreamCancel {
                session: self.clone(),
                type_name,
                sender: tx,
            },
        )
    }

    pub(crate) fn cancel_stream(&self, type_name: &'static str, sender: &Sender<StellarMessage>) {
        if let Some(subscribers) = self.shared.waiters.lock().unwrap().streams.get_mut(type_name) {
            subscribers.retain(|s| !s.same_channel(sender));
        }
    }

    /// Close the socket; the dispatch loop observes EOF or a read error
    /// and terminates.
    pub fn close(&self) {
        self.set_state(PeerState::Closed);
        let write = self.shared.write.lock().unwrap();
        let _ = write.stream.shutdown(std::net::Shutdown::Both);
    }

    fn dispatch_loop(&self, mut read_stream: TcpStream) {
        loop {
            if self.state() == PeerState::Closed {
                break;
            }

            match framing::read_frame(&mut read_stream) {
                Ok(bytes) => {
                    // The deadline, if armed by `must_respond`, applies to
                    // exactly one frame.
                    let _ = read_stream.set_read_timeout(None);

                    match framing::unmarshal::<xdr::AuthenticatedMessage>(&bytes) {
                        Ok(envelope) => self.route(envelope.into_v0().message),
                        Err(e) => {
                            error!("failed to decode inbound frame: {}", e);
                            break;
                        }
                    }
                }
                Err(e) => {
                    match &e {
                        OverlayError::Io(io_err) if is_timeout(io_err) => {
                            // `must_respond` deadline expired with nothing to
                            // read; steady-state reads resume unbounded.
                            let _ = read_stream.set_read_timeout(None);
                            continue;
                        }
                        _ => {
                            debug!("dispatch loop terminating: {}", e);
                            break;
                        }
                    }
                }
            }
        }

        self.set_state(PeerState::Closed);
    }

    fn route(&self, message: StellarMessage) {
        let type_name = message.type_name();

        let oneshot_waiter = {
            let mut waiters = self.shared.waiters.lock().unwrap();
            waiters
                .oneshot
                .get_mut(type_name)
                .and_then(|queue| queue.pop_front())
        };

        if let Some(tx) = oneshot_waiter {
            let _ = tx.send(message);
            return;
        }

        let stream_subscribers = {
            let waiters = self.shared.waiters.lock().unwrap();
            waiters.streams.get(type_name).cloned()
        };

        if let Some(subscribers) = stream_subscribers {
            if !subscribers.is_empty() {
                for tx in &subscribers {
                    let _ = tx.send(message.clone());
                }
                return;
            }
        }

        let callback = self.shared.on_message.lock().unwrap();
        if let Some(cb) = callback.as_ref() {
            cb(message);
        }
    }

    /// Read exactly one frame from `stream`, decode it as
    /// `AuthenticatedMessage::V0`, and return the inner envelope. Used
    /// only by the handshake driver, before the dispatch loop exists.
    pub(crate) fn read_one(&self, stream: &mut TcpStream, deadline: Option<Duration>) -> Result<AuthenticatedMessageV0> {
        stream.set_read_timeout(deadline)?;
        let bytes = framing::read_frame(stream);
        stream.set_read_timeout(None)?;
        let bytes = bytes?;
        let envelope: xdr::AuthenticatedMessage = framing::unmarshal(&bytes)?;
        Ok(envelope.into_v0())
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

pub struct StreamCancel {
    session: PeerSession,
    type_name: &'static str,
    sender: Sender<StellarMessage>,
}

impl StreamCancel {
    pub fn cancel(self) {
        self.session.cancel_stream(self.type_name, &self.sender);
    }
}
