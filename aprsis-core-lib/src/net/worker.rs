//! Per-client worker: login handshake, then the read/fan-out/write loop.
//!
//! Owns its socket and its [`crate::heard::ClientLists`] exclusively for
//! its whole lifetime (§3, §5) — no other task ever touches either. Cross-
//! client delivery happens by pushing `Arc<ParsedPacket>` into the other
//! client's registry-held inbox; this worker only ever reads its *own*
//! inbox to decide what to write to its *own* socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

use crate::filter::{self, FilterContext, FilterTerm};
use crate::heard::ClientLists;
use crate::parser::{self, message, ParsedPacket, Position, TypeFlags};
use crate::passcode::{self, LoginVerdict};
use crate::qconstruct::{self, QConstruct};

use super::login::{logresp_line, parse_login};
use super::registry::ClientSnapshot;
use super::Shared;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(15);
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

pub async fn serve(stream: TcpStream, addr: SocketAddr, shared: Shared) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let banner = format!("# aprsis-core {} {}\r\n", shared.config.server_id, shared.config.server_callsign);
    if write_half.write_all(banner.as_bytes()).await.is_err() {
        return;
    }

    let mut line = String::new();
    let login = match timeout(LOGIN_TIMEOUT, reader.read_line(&mut line)).await {
        Ok(Ok(0)) | Err(_) => return,
        Ok(Err(e)) => {
            warn!(%addr, error = %e, "error reading login line");
            return;
        }
        Ok(Ok(_)) => match parse_login(line.trim_end()) {
            Ok(req) => req,
            Err(_) => {
                let _ = write_half.write_all(b"# invalid login line\r\n").await;
                return;
            }
        },
    };

    let verdict = passcode::validate(&login.callsign, &login.pass);
    let resp = logresp_line(&login.callsign, verdict, &shared.config.server_id);
    if write_half.write_all(resp.as_bytes()).await.is_err() {
        return;
    }

    let qkind = match verdict {
        LoginVerdict::Verified => QConstruct::VerifiedClient,
        LoginVerdict::ReadOnly | LoginVerdict::Unverified => QConstruct::UnverifiedClient,
        LoginVerdict::Malformed => QConstruct::Malformed,
    };

    let terms: Vec<FilterTerm> = match login.filter.as_deref().map(filter::parse) {
        Some(Ok(terms)) => terms,
        Some(Err(e)) => {
            debug!(%addr, callsign = %login.callsign, error = %e, "rejecting unparseable filter, using empty filter");
            Vec::new()
        }
        None => Vec::new(),
    };

    info!(%addr, callsign = %login.callsign, verified = (verdict == LoginVerdict::Verified), "client logged in");

    let (handle, mut inbox) =
        shared.registry.register(addr, shared.config.max_write_queue_bytes, 1024);

    let mut lists = ClientLists::new();
    let mut own_pos: Option<Position> = None;
    let mut pkts_in: u64 = 0;
    let mut pkts_out: u64 = 0;
    let mut housekeeping = interval(HOUSEKEEPING_INTERVAL);
    housekeeping.tick().await; // first tick fires immediately; consume it

    loop {
        line.clear();
        tokio::select! {
            read = timeout(Duration::from_secs(shared.config.idle_timeout_secs), reader.read_line(&mut line)) => {
                match read {
                    Err(_) => {
                        info!(%addr, callsign = %login.callsign, "idle timeout, disconnecting");
                        break;
                    }
                    Ok(Ok(0)) => break,
                    Ok(Err(e)) => {
                        warn!(%addr, callsign = %login.callsign, error = %e, "read error, disconnecting");
                        break;
                    }
                    Ok(Ok(_)) => {
                        let trimmed = line.trim_end();
                        if trimmed.is_empty() || trimmed.starts_with('#') {
                            continue;
                        }
                        pkts_in += 1;
                        handle_inbound(trimmed.as_bytes(), &shared, &login.callsign, qkind, &mut lists, &mut own_pos, handle.id);
                    }
                }
            }
            received = inbox.recv() => {
                let Some(packet) = received else { break };
                handle.ack_dequeue(packet.raw.len());
                if deliver(&packet, &shared, &terms, own_pos, &mut lists) {
                    let mut out = packet.raw.clone();
                    out.extend_from_slice(b"\r\n");
                    if write_half.write_all(&out).await.is_err() {
                        break;
                    }
                    pkts_out += 1;
                }
            }
            _ = housekeeping.tick() => {
                let storetime = Duration::from_secs(shared.config.lastposition_storetime_secs);
                lists.expire(shared.clock.tick(), storetime);
                handle.update_snapshot(ClientSnapshot {
                    callsign: login.callsign.clone(),
                    verified: verdict == LoginVerdict::Verified,
                    addr: addr.to_string(),
                    connected_since_secs: shared.clock.wall().as_secs(),
                    pkts_in,
                    pkts_out,
                });
            }
        }

        if handle.should_disconnect() {
            info!(%addr, callsign = %login.callsign, "write queue exceeded cap, disconnecting");
            break;
        }
    }

    shared.registry.unregister(handle.id);
    lists.free_all();
}

/// Parse, dedupe, history-insert, Q-tag, and fan out one line this client
/// sent us. Errors are counted and the line dropped; the connection stays
/// open (§7's per-packet recovery policy).
fn handle_inbound(
    raw: &[u8],
    shared: &Shared,
    own_callsign: &str,
    qkind: QConstruct,
    lists: &mut ClientLists,
    own_pos: &mut Option<Position>,
    origin_id: u64,
) {
    let now = shared.clock.tick();
    let mut packet = match parser::parse(raw, shared.config.max_packet_len, &shared.clock) {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e.label(), "dropping packet that failed to parse");
            shared.rxerr.record(e);
            return;
        }
    };

    let dedup = shared.dedupe.check(packet.effective_src(), &packet.info, now);
    if dedup.is_duplicate {
        return;
    }

    qconstruct::tag(&mut packet.path, qkind, &shared.config.server_id);
    shared.history.insert(&packet);

    lists.update_heard(packet.effective_src(), now);
    if packet.flags.contains(TypeFlags::MESSAGE) {
        if let Some(recipient) = packet.dst_name.clone() {
            lists.update_courtesy(&recipient, now);
            if recipient.eq_ignore_ascii_case(&shared.config.server_callsign) {
                // Recipient field is 9 bytes plus the ':' separator right
                // after the leading ':' `message::classify` already
                // stripped off in `dispatch_body`.
                if let Some(payload) = packet.info.get(11..) {
                    let server_msg = message::parse_server_message(payload);
                    debug!(
                        src = %packet.effective_src(),
                        is_ack = server_msg.is_ack,
                        msg_id = ?server_msg.msg_id,
                        "message addressed to this server's callsign"
                    );
                }
            }
        }
    }
    if packet.has_pos() && packet.effective_src().eq_ignore_ascii_case(own_callsign) {
        *own_pos = packet.pos;
    }

    shared.registry.broadcast_except(origin_id, &Arc::new(packet));
}

/// Decide whether a fanned-out packet should be written to this client:
/// the client's own filter, OR a pending courtesy grant for its source
/// (consumed on use), OR the source being on this client's own heard list
/// (it recently sent us traffic from that station directly).
fn deliver(
    packet: &ParsedPacket,
    shared: &Shared,
    terms: &[FilterTerm],
    own_pos: Option<Position>,
    lists: &mut ClientLists,
) -> bool {
    let ctx = FilterContext {
        history: &shared.history,
        own_pos,
        now: shared.clock.tick(),
        lastposition_storetime: Duration::from_secs(shared.config.lastposition_storetime_secs),
    };
    if filter::evaluate(terms, packet, &ctx) {
        return true;
    }
    if lists.check_courtesy_needed(packet.effective_src()) {
        return true;
    }
    lists.check_heard(packet.effective_src())
}
