//! SpookyHash V2 - Bob Jenkins' 128-bit non-cryptographic hash.
//!
//! Alembic hashes property headers, sample digests and object
//! hierarchies with SpookyHash, so archives written with this crate
//! carry the same hashes the C++ library produces on little-endian
//! hosts.
//!
//! # Example
//! ```
//! use spooky_hash::SpookyHash;
//!
//! let one_shot = SpookyHash::hash128(b"hello world", 0, 0);
//!
//! let mut hasher = SpookyHash::new(0, 0);
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//! assert_eq!(hasher.finalize(), one_shot);
//! ```

#![cfg_attr(not(test), no_std)]

const SC_CONST: u64 = 0xdead_beef_dead_beef;
const SC_NUM_VARS: usize = 12;
/// Bytes consumed per `mix` call.
const SC_BLOCK_SIZE: usize = SC_NUM_VARS * 8;
/// Messages shorter than this take the short path.
const SC_BUF_SIZE: usize = 2 * SC_BLOCK_SIZE;

type State = [u64; SC_NUM_VARS];

const MIX_ROTATIONS: [u32; SC_NUM_VARS] = [11, 32, 43, 31, 17, 28, 39, 57, 55, 54, 22, 46];
const END_ROTATIONS: [u32; SC_NUM_VARS] = [44, 15, 34, 21, 38, 33, 10, 13, 38, 53, 42, 54];
const SHORT_MIX_STEPS: [(usize, u32); 12] = [
    (2, 50), (3, 52), (0, 30), (1, 41),
    (2, 54), (3, 48), (0, 38), (1, 37),
    (2, 62), (3, 34), (0, 5), (1, 36),
];
const SHORT_END_ROTATIONS: [u32; 11] = [15, 52, 26, 51, 28, 9, 47, 54, 32, 25, 63];

/// Little-endian load of up to 8 bytes, zero extended.
#[inline(always)]
fn read_partial(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);
    u64::from_le_bytes(buf)
}

#[inline(always)]
fn read_block(bytes: &[u8]) -> State {
    let mut block = [0u64; SC_NUM_VARS];
    for (word, chunk) in block.iter_mut().zip(bytes.chunks_exact(8)) {
        *word = read_partial(chunk);
    }
    block
}

#[inline(always)]
fn seeded_state(seed1: u64, seed2: u64) -> State {
    let mut h = [0u64; SC_NUM_VARS];
    for i in (0..SC_NUM_VARS).step_by(3) {
        h[i] = seed1;
        h[i + 1] = seed2;
        h[i + 2] = SC_CONST;
    }
    h
}

/// Mix one 96-byte block into the state.
#[inline(always)]
fn mix(data: &State, s: &mut State) {
    for i in 0..SC_NUM_VARS {
        let prev = (i + 11) % SC_NUM_VARS;
        s[i] = s[i].wrapping_add(data[i]);
        s[(i + 2) % SC_NUM_VARS] ^= s[(i + 10) % SC_NUM_VARS];
        s[prev] ^= s[i];
        s[i] = s[i].rotate_left(MIX_ROTATIONS[i]);
        s[prev] = s[prev].wrapping_add(s[(i + 1) % SC_NUM_VARS]);
    }
}

#[inline(always)]
fn end_partial(h: &mut State) {
    for (i, &rot) in END_ROTATIONS.iter().enumerate() {
        let next = (i + 1) % SC_NUM_VARS;
        let prev = (i + 11) % SC_NUM_VARS;
        h[prev] = h[prev].wrapping_add(h[next]);
        h[(i + 2) % SC_NUM_VARS] ^= h[prev];
        h[next] = h[next].rotate_left(rot);
    }
}

#[inline(always)]
fn end(data: &State, h: &mut State) {
    for (word, d) in h.iter_mut().zip(data) {
        *word = word.wrapping_add(*d);
    }
    end_partial(h);
    end_partial(h);
    end_partial(h);
}

#[inline(always)]
fn short_mix(v: &mut [u64; 4]) {
    for &(k, rot) in &SHORT_MIX_STEPS {
        v[k] = v[k].rotate_left(rot).wrapping_add(v[(k + 1) % 4]);
        v[(k + 2) % 4] ^= v[k];
    }
}

#[inline(always)]
fn short_end(v: &mut [u64; 4]) {
    // Targets cycle d, a, b, c; each is fed by the word before it.
    for (step, &rot) in SHORT_END_ROTATIONS.iter().enumerate() {
        let t = (step + 3) % 4;
        let s = (t + 3) % 4;
        v[t] ^= v[s];
        v[s] = v[s].rotate_left(rot);
        v[t] = v[t].wrapping_add(v[s]);
    }
}

/// Hash of a message shorter than `SC_BUF_SIZE` bytes.
fn hash_short(message: &[u8], seed1: u64, seed2: u64) -> (u64, u64) {
    let length = message.len();
    let mut v = [seed1, seed2, SC_CONST, SC_CONST];

    let mut rest = message;
    if length > 15 {
        let mut blocks = rest.chunks_exact(32);
        for block in &mut blocks {
            v[2] = v[2].wrapping_add(read_partial(&block[0..8]));
            v[3] = v[3].wrapping_add(read_partial(&block[8..16]));
            short_mix(&mut v);
            v[0] = v[0].wrapping_add(read_partial(&block[16..24]));
            v[1] = v[1].wrapping_add(read_partial(&block[24..32]));
        }
        rest = blocks.remainder();
        if rest.len() >= 16 {
            v[2] = v[2].wrapping_add(read_partial(&rest[0..8]));
            v[3] = v[3].wrapping_add(read_partial(&rest[8..16]));
            short_mix(&mut v);
            rest = &rest[16..];
        }
    }

    v[3] = v[3].wrapping_add((length as u64) << 56);
    match rest.len() {
        0 => {
            v[2] = v[2].wrapping_add(SC_CONST);
            v[3] = v[3].wrapping_add(SC_CONST);
        }
        1..=7 => v[2] = v[2].wrapping_add(read_partial(rest)),
        _ => {
            v[2] = v[2].wrapping_add(read_partial(&rest[..8]));
            v[3] = v[3].wrapping_add(read_partial(&rest[8..]));
        }
    }

    short_end(&mut v);
    (v[0], v[1])
}

/// Mix the trailing partial block (with its length in the last byte).
fn finish_long(tail: &[u8], h: &mut State) {
    let mut last = [0u8; SC_BLOCK_SIZE];
    last[..tail.len()].copy_from_slice(tail);
    last[SC_BLOCK_SIZE - 1] = tail.len() as u8;
    end(&read_block(&last), h);
}

/// Incremental SpookyHash V2 hasher.
#[derive(Clone)]
pub struct SpookyHash {
    /// Bytes not yet mixed in.
    data: [u8; SC_BUF_SIZE],
    state: State,
    /// Total bytes seen.
    length: usize,
    /// Bytes buffered in `data`.
    remainder: usize,
}

impl SpookyHash {
    /// Create a hasher with the given seeds.
    pub fn new(seed1: u64, seed2: u64) -> Self {
        let mut state = [0u64; SC_NUM_VARS];
        state[0] = seed1;
        state[1] = seed2;
        Self {
            data: [0u8; SC_BUF_SIZE],
            state,
            length: 0,
            remainder: 0,
        }
    }

    /// Add bytes to the hash.
    pub fn update(&mut self, message: &[u8]) {
        let new_length = self.remainder + message.len();
        if new_length < SC_BUF_SIZE {
            self.data[self.remainder..new_length].copy_from_slice(message);
            self.length += message.len();
            self.remainder = new_length;
            return;
        }

        let mut h = if self.length < SC_BUF_SIZE {
            seeded_state(self.state[0], self.state[1])
        } else {
            self.state
        };
        self.length += message.len();

        let mut rest = message;
        if self.remainder > 0 {
            let prefix = SC_BUF_SIZE - self.remainder;
            self.data[self.remainder..].copy_from_slice(&message[..prefix]);
            mix(&read_block(&self.data[..SC_BLOCK_SIZE]), &mut h);
            mix(&read_block(&self.data[SC_BLOCK_SIZE..]), &mut h);
            rest = &message[prefix..];
        }

        let mut blocks = rest.chunks_exact(SC_BLOCK_SIZE);
        for block in &mut blocks {
            mix(&read_block(block), &mut h);
        }
        let tail = blocks.remainder();
        self.data[..tail.len()].copy_from_slice(tail);
        self.remainder = tail.len();
        self.state = h;
    }

    /// Return the 128-bit hash of everything added so far.
    pub fn finalize(&self) -> (u64, u64) {
        if self.length < SC_BUF_SIZE {
            return hash_short(&self.data[..self.length], self.state[0], self.state[1]);
        }

        let mut h = self.state;
        let mut buffered = &self.data[..self.remainder];
        if buffered.len() >= SC_BLOCK_SIZE {
            mix(&read_block(&buffered[..SC_BLOCK_SIZE]), &mut h);
            buffered = &buffered[SC_BLOCK_SIZE..];
        }
        finish_long(buffered, &mut h);
        (h[0], h[1])
    }

    /// Hash a message in one call.
    pub fn hash128(message: &[u8], seed1: u64, seed2: u64) -> (u64, u64) {
        if message.len() < SC_BUF_SIZE {
            return hash_short(message, seed1, seed2);
        }

        let mut h = seeded_state(seed1, seed2);
        let mut blocks = message.chunks_exact(SC_BLOCK_SIZE);
        for block in &mut blocks {
            mix(&read_block(block), &mut h);
        }
        finish_long(blocks.remainder(), &mut h);
        (h[0], h[1])
    }

    /// Fold a 128-bit digest into a running 128-bit hash with the short
    /// end mix. Alembic chains per-sample digests this way.
    pub fn short_end_mix(h0: u64, h1: u64, d0: u64, d1: u64) -> (u64, u64) {
        let mut v = [h0, h1, d0, d1];
        short_end(&mut v);
        (v[0], v[1])
    }
}

impl Default for SpookyHash {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
