//! Binary payload encoding for contract operations.
//!
//! The contract distinguishes operations by a leading 32-bit op code followed
//! by a fixed field layout: big-endian integers, recipient identities as
//! u16-length-prefixed UTF-8, fee rates as parts-per-million.

use crate::types::{BatchEntry, DepositId, PoolId, WithdrawalCall};

pub const OP_DEPOSIT: u32 = 0x01;
pub const OP_WITHDRAW: u32 = 0x02;
pub const OP_BATCH_WITHDRAW: u32 = 0x03;

/// Convert a rational fee in [0, 1) into parts-per-million.
pub fn fee_rate_ppm(fee_rate: f64) -> u32 {
    (fee_rate * 1_000_000.0).round() as u32
}

struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    fn new(op: u32) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&op.to_be_bytes());
        Self { buf }
    }

    fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn put_str(&mut self, s: &str) {
        // Recipient identities are short addresses; u16 length is plenty.
        self.buf.extend_from_slice(&(s.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub fn encode_deposit(pool_id: PoolId, amount: u64) -> Vec<u8> {
    let mut w = PayloadWriter::new(OP_DEPOSIT);
    w.put_u32(pool_id);
    w.put_u64(amount);
    w.finish()
}

pub fn encode_withdrawal(call: &WithdrawalCall) -> Vec<u8> {
    let mut w = PayloadWriter::new(OP_WITHDRAW);
    w.put_u64(call.deposit_id);
    w.put_str(&call.recipient);
    w.put_u64(call.amount);
    w.put_u32(fee_rate_ppm(call.fee_rate));
    w.put_u64(call.delay_ms);
    w.finish()
}

pub fn encode_batch_withdrawal(deposit_id: DepositId, entries: &[BatchEntry]) -> Vec<u8> {
    let mut w = PayloadWriter::new(OP_BATCH_WITHDRAW);
    w.put_u64(deposit_id);
    w.put_u32(entries.len() as u32);

    for e in entries {
        w.put_str(&e.recipient);
        w.put_u64(e.amount);
        w.put_u32(fee_rate_ppm(e.fee_rate));
        w.put_u64(e.delay_ms);
    }

    w.finish()
}
