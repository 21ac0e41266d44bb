//! Security solver (§4.10).
//!
//! Offloads key expansion (`ExpandKey`) and arena checksum computation
//! (`Checksum`) to a remote helper service over a blocking TCP socket,
//! parallelized by a small worker pool so the main tick loop never blocks on
//! network I/O. Workers only ever touch their own slot; the main thread is
//! the sole reader of completed results (polled once per tick), so nothing
//! here races with simulation state per §5's threading model.
//!
//! The wire protocol is a fixed legacy format (raw struct layout, not a
//! serde encoding) — see the byte layouts in `SPEC_FULL.md` §4.10.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::warn;

use crate::error::CoreError;

/// Fixed size of the security-solver work pool (§3's "shared pool of 16").
pub const WORK_POOL_SIZE: usize = 16;

const REQUEST_KEYSTREAM: u8 = 1;
const REQUEST_CHECKSUM: u8 = 2;

/// A completed response from the helper service.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SecurityResponse {
    /// `ExpandKey` result: a 20-word keystream table.
    Keystream([u32; 20]),
    /// `Checksum` result.
    Checksum(u32),
}

/// Callback invoked on the main thread once a request completes or fails.
/// `None` signals an external-service outage (§7): connect failure, a
/// malformed response, or a socket forced closed by [`SecuritySolver::clear_work`].
pub type SecurityCallback = Box<dyn FnOnce(Option<SecurityResponse>) + Send>;

enum SlotState {
    Empty,
    Pending {
        socket: Arc<Mutex<Option<TcpStream>>>,
    },
    Done(Option<SecurityResponse>),
}

struct Slot {
    state: SlotState,
    callback: Option<SecurityCallback>,
}

impl Default for Slot {
    fn default() -> Self {
        Slot {
            state: SlotState::Empty,
            callback: None,
        }
    }
}

/// Thread-pooled client for the security-solver helper service.
pub struct SecuritySolver {
    address: SocketAddr,
    slots: Arc<Mutex<Vec<Slot>>>,
}

impl SecuritySolver {
    /// Point the solver at a helper service address. No connection is made
    /// until the first request.
    pub fn new(address: SocketAddr) -> Self {
        let mut slots = Vec::with_capacity(WORK_POOL_SIZE);
        slots.resize_with(WORK_POOL_SIZE, Slot::default);
        SecuritySolver {
            address,
            slots: Arc::new(Mutex::new(slots)),
        }
    }

    fn acquire_slot(&self) -> Option<usize> {
        let mut slots = self.slots.lock().unwrap();
        slots
            .iter()
            .position(|s| matches!(s.state, SlotState::Empty))
    }

    fn spawn_request(&self, slot_index: usize, request: Vec<u8>, expected_len: usize) {
        let address = self.address;
        let slots = self.slots.clone();

        let socket_cell: Arc<Mutex<Option<TcpStream>>> = Arc::new(Mutex::new(None));
        {
            let mut guard = self.slots.lock().unwrap();
            guard[slot_index].state = SlotState::Pending {
                socket: socket_cell.clone(),
            };
        }

        thread::spawn(move || {
            let result = run_request(address, &request, expected_len, &socket_cell);
            let mut guard = slots.lock().unwrap();
            guard[slot_index].state = SlotState::Done(result);
        });
    }

    /// Request a 20-word keystream table for `key2`.
    pub fn expand_key(&self, key2: u32, callback: SecurityCallback) -> Result<(), CoreError> {
        let Some(slot_index) = self.acquire_slot() else {
            return Err(CoreError::ResourceExhausted {
                resource: "security solver work pool",
                capacity: WORK_POOL_SIZE,
            });
        };

        {
            let mut guard = self.slots.lock().unwrap();
            guard[slot_index].callback = Some(callback);
        }

        let mut request = Vec::with_capacity(5);
        request.push(REQUEST_KEYSTREAM);
        request.extend_from_slice(&key2.to_le_bytes());

        // type(1) + key2(4) + table[20](80)
        self.spawn_request(slot_index, request, 85);
        Ok(())
    }

    /// Request the arena checksum for `key`.
    pub fn checksum(&self, key: u32, callback: SecurityCallback) -> Result<(), CoreError> {
        let Some(slot_index) = self.acquire_slot() else {
            return Err(CoreError::ResourceExhausted {
                resource: "security solver work pool",
                capacity: WORK_POOL_SIZE,
            });
        };

        {
            let mut guard = self.slots.lock().unwrap();
            guard[slot_index].callback = Some(callback);
        }

        let mut request = Vec::with_capacity(5);
        request.push(REQUEST_CHECKSUM);
        request.extend_from_slice(&key.to_le_bytes());

        // type(1) + key(4) + checksum(4)
        self.spawn_request(slot_index, request, 9);
        Ok(())
    }

    /// Drain completed slots, invoking each callback on the calling
    /// (main) thread and freeing the slot. Call once per tick.
    pub fn poll(&mut self) {
        let mut completed = Vec::new();
        {
            let mut guard = self.slots.lock().unwrap();
            for (i, slot) in guard.iter_mut().enumerate() {
                if matches!(slot.state, SlotState::Done(_)) {
                    if let SlotState::Done(result) =
                        std::mem::replace(&mut slot.state, SlotState::Empty)
                    {
                        if let Some(cb) = slot.callback.take() {
                            completed.push((i, result, cb));
                        }
                    }
                }
            }
        }

        for (_, result, cb) in completed {
            cb(result);
        }
    }

    /// Force-close every outstanding request's socket, collectively
    /// cancelling them. Their callbacks fire on the next [`poll`] with
    /// `None`.
    pub fn clear_work(&mut self) {
        let mut guard = self.slots.lock().unwrap();
        for slot in guard.iter_mut() {
            if let SlotState::Pending { socket } = &slot.state {
                if let Some(stream) = socket.lock().unwrap().as_ref() {
                    let _ = stream.shutdown(std::net::Shutdown::Both);
                }
            }
        }
    }
}

fn run_request(
    address: SocketAddr,
    request: &[u8],
    expected_len: usize,
    socket_cell: &Arc<Mutex<Option<TcpStream>>>,
) -> Option<SecurityResponse> {
    let mut stream = match TcpStream::connect(address) {
        Ok(s) => s,
        Err(e) => {
            warn!(%e, "security solver connect failed");
            return None;
        }
    };

    *socket_cell.lock().unwrap() = stream.try_clone().ok();

    if stream.write_all(request).is_err() {
        return None;
    }

    let mut response = vec![0u8; expected_len];
    if stream.read_exact(&mut response).is_err() {
        return None;
    }

    parse_response(&response)
}

fn parse_response(data: &[u8]) -> Option<SecurityResponse> {
    if data.is_empty() {
        return None;
    }
    match data[0] {
        REQUEST_KEYSTREAM if data.len() == 85 => {
            let mut table = [0u32; 20];
            for (i, word) in table.iter_mut().enumerate() {
                let off = 5 + i * 4;
                *word = u32::from_le_bytes([
                    data[off],
                    data[off + 1],
                    data[off + 2],
                    data[off + 3],
                ]);
            }
            Some(SecurityResponse::Keystream(table))
        }
        REQUEST_CHECKSUM if data.len() == 9 => {
            let checksum = u32::from_le_bytes([data[5], data[6], data[7], data[8]]);
            Some(SecurityResponse::Checksum(checksum))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keystream_response() {
        let mut data = vec![REQUEST_KEYSTREAM];
        data.extend_from_slice(&42u32.to_le_bytes());
        for i in 0..20u32 {
            data.extend_from_slice(&i.to_le_bytes());
        }
        match parse_response(&data) {
            Some(SecurityResponse::Keystream(table)) => {
                assert_eq!(table[0], 0);
                assert_eq!(table[19], 19);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_checksum_response() {
        let mut data = vec![REQUEST_CHECKSUM];
        data.extend_from_slice(&7u32.to_le_bytes());
        data.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());
        assert_eq!(
            parse_response(&data),
            Some(SecurityResponse::Checksum(0xDEADBEEF))
        );
    }

    #[test]
    fn rejects_truncated_response() {
        assert_eq!(parse_response(&[REQUEST_CHECKSUM, 1, 2]), None);
    }

    #[test]
    fn pool_exhaustion_is_reported() {
        let solver = SecuritySolver::new("127.0.0.1:1".parse().unwrap());
        for _ in 0..WORK_POOL_SIZE {
            solver.expand_key(0, Box::new(|_| {})).unwrap();
        }
        let err = solver.expand_key(0, Box::new(|_| {})).unwrap_err();
        assert!(matches!(err, CoreError::ResourceExhausted { .. }));
    }
}
