//! AEZ v5 authenticated encryption.
//!
//! AEZ is a tweakable, arbitrary-input-length enciphering scheme. Appending
//! `tau` zero bytes to the message before enciphering and checking them after
//! deciphering turns it into authenticated encryption with a ciphertext
//! expansion of exactly `tau` bytes. The cipher seed uses a four byte
//! expansion so that the whole record still fits in 24 mnemonic words.
//!
//! Messages shorter than 32 bytes go through AEZ-tiny (a Feistel network over
//! two half blocks), longer ones through AEZ-core, and an empty message is
//! answered by AEZ-prf.
//!
//! The block cipher `E(j,i)` is built from AES round functions keyed by the
//! three 16-byte subkeys `I`, `J` and `L` extracted from the user key:
//!
//! * `j >= 0`: four rounds keyed `J, I, L, 0` over
//!   `X ^ jJ ^ 2^ceil(i/8) I ^ (i mod 8) L`
//! * `j == -1`: ten rounds keyed `I, J, L, I, J, L, I, J, L, I` over `X ^ iL`

use aes::Block;
use aes::hazmat::cipher_round;
use blake2::digest::consts::U48;
use blake2::{Blake2b, Digest};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const BLOCK_SIZE: usize = 16;
const EXTRACTED_KEY_SIZE: usize = 48;

type Blk = [u8; BLOCK_SIZE];

const ZERO: Blk = [0u8; BLOCK_SIZE];

/// Encrypt `plaintext`, returning `plaintext.len() + tau` bytes.
///
/// `nonce` and every element of `additional_data` are authenticated but not
/// encrypted.
pub fn encrypt(
    key: &[u8],
    nonce: &[u8],
    additional_data: &[&[u8]],
    tau: usize,
    plaintext: &[u8],
) -> Vec<u8> {
    let state = State::new(key);
    let delta = state.hash(nonce, additional_data, tau_bits(tau));

    if plaintext.is_empty() {
        return state.prf(&delta, tau);
    }

    let mut x = Zeroizing::new(Vec::with_capacity(plaintext.len() + tau));
    x.extend_from_slice(plaintext);
    x.resize(plaintext.len() + tau, 0);
    state.encipher(&delta, &x, false)
}

/// Decrypt and authenticate `ciphertext`.
///
/// Returns `None` when the ciphertext, nonce, associated data or key do not
/// match what was used to encrypt.
pub fn decrypt(
    key: &[u8],
    nonce: &[u8],
    additional_data: &[&[u8]],
    tau: usize,
    ciphertext: &[u8],
) -> Option<Zeroizing<Vec<u8>>> {
    if ciphertext.len() < tau {
        return None;
    }

    let state = State::new(key);
    let delta = state.hash(nonce, additional_data, tau_bits(tau));

    if ciphertext.len() == tau {
        let expected = state.prf(&delta, tau);
        let ok: bool = expected.ct_eq(ciphertext).into();
        return ok.then(|| Zeroizing::new(Vec::new()));
    }

    let x = Zeroizing::new(state.encipher(&delta, ciphertext, true));
    let (message, authenticator) = x.split_at(ciphertext.len() - tau);
    let residue = authenticator.iter().fold(0u8, |acc, b| acc | b);
    if residue != 0 {
        return None;
    }
    Some(Zeroizing::new(message.to_vec()))
}

fn tau_bits(tau: usize) -> u32 {
    u32::try_from(tau * 8).unwrap_or(u32::MAX)
}

/// Expanded key material: `I`, `J` and the multiples of `L` that the
/// algorithms index into.
#[derive(Zeroize, ZeroizeOnDrop)]
struct State {
    /// `I`, `2I`
    i: [Blk; 2],
    /// `J`, `2J`, `4J`
    j: [Blk; 3],
    /// `0`, `L`, `2L`, ..., `7L`
    l: [Blk; 8],
}

impl State {
    fn new(key: &[u8]) -> Self {
        let extracted = extract(key);
        let mut state = Self {
            i: [ZERO; 2],
            j: [ZERO; 3],
            l: [ZERO; 8],
        };

        state.i[0].copy_from_slice(&extracted[0..16]);
        state.i[1] = double(&state.i[0]);

        state.j[0].copy_from_slice(&extracted[16..32]);
        state.j[1] = double(&state.j[0]);
        state.j[2] = double(&state.j[1]);

        state.l[1].copy_from_slice(&extracted[32..48]);
        state.l[2] = double(&state.l[1]);
        state.l[3] = xor(&state.l[2], &state.l[1]);
        state.l[4] = double(&state.l[2]);
        state.l[5] = xor(&state.l[4], &state.l[1]);
        state.l[6] = double(&state.l[3]);
        state.l[7] = xor(&state.l[6], &state.l[1]);

        state
    }

    /// Four AES rounds over `src ^ j ^ i ^ l`.
    fn aes4(&self, j: &Blk, i: &Blk, l: &Blk, src: &Blk) -> Blk {
        let mut x = xor(&xor(src, j), &xor(i, l));
        aes_round(&mut x, &self.j[0]);
        aes_round(&mut x, &self.i[0]);
        aes_round(&mut x, &self.l[1]);
        aes_round(&mut x, &ZERO);
        x
    }

    /// Ten AES rounds over `src ^ l`.
    fn aes10(&self, l: &Blk, src: &Blk) -> Blk {
        let mut x = xor(src, l);
        for round in 0..10 {
            let key = match round % 3 {
                0 => &self.i[0],
                1 => &self.j[0],
                _ => &self.l[1],
            };
            aes_round(&mut x, key);
        }
        x
    }

    /// The tweakable block cipher `E(j,i)`.
    fn e(&self, j: i32, i: u32, src: &Blk) -> Blk {
        let Ok(j) = u32::try_from(j) else {
            return self.aes10(&mult(i, &self.l[1]), src);
        };

        let jj = mult(j, &self.j[0]);
        let mut ii = self.i[0];
        for _ in 0..i.div_ceil(8) {
            ii = double(&ii);
        }
        self.aes4(&jj, &ii, &self.l[(i % 8) as usize], src)
    }

    /// AEZ-hash over the tag length, the nonce and each associated data string.
    fn hash(&self, nonce: &[u8], additional_data: &[&[u8]], tau_bits: u32) -> Blk {
        let mut buf = ZERO;
        buf[12..].copy_from_slice(&tau_bits.to_be_bytes());

        let three_j = xor(&self.j[0], &self.j[1]);
        let mut sum = self.aes4(&three_j, &self.i[1], &self.l[1], &buf);

        sum = xor(&sum, &self.hash_string(&self.j[2], nonce));
        for (k, data) in (5u32..).zip(additional_data) {
            let jj = mult(k, &self.j[0]);
            sum = xor(&sum, &self.hash_string(&jj, data));
        }
        sum
    }

    fn hash_string(&self, jj: &Blk, data: &[u8]) -> Blk {
        let mut sum = ZERO;
        let mut ii = self.i[1];

        let mut chunks = data.chunks_exact(BLOCK_SIZE);
        for (n, chunk) in (1u32..).zip(&mut chunks) {
            let out = self.aes4(jj, &ii, &self.l[(n % 8) as usize], &to_block(chunk));
            sum = xor(&sum, &out);
            if n % 8 == 0 {
                ii = double(&ii);
            }
        }

        let rest = chunks.remainder();
        if !rest.is_empty() || data.is_empty() {
            let out = self.aes4(jj, &self.i[0], &self.l[0], &pad(rest));
            sum = xor(&sum, &out);
        }
        sum
    }

    /// AEZ-prf: a keystream of `len` bytes bound to `delta`.
    fn prf(&self, delta: &Blk, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        let mut ctr = ZERO;
        while out.len() < len {
            let block = self.e(-1, 3, &xor(delta, &ctr));
            let take = (len - out.len()).min(BLOCK_SIZE);
            out.extend_from_slice(&block[..take]);
            increment(&mut ctr);
        }
        out
    }

    fn encipher(&self, delta: &Blk, input: &[u8], decrypt: bool) -> Vec<u8> {
        if input.len() < 2 * BLOCK_SIZE {
            self.tiny(delta, input, decrypt)
        } else {
            self.core(delta, input, decrypt)
        }
    }

    fn tiny(&self, delta: &Blk, input: &[u8], decrypt: bool) -> Vec<u8> {
        let n = input.len();
        let (rounds, i): (i32, usize) = match n {
            1 => (24, 7),
            2 => (16, 7),
            3..=15 => (10, 7),
            _ => (8, 6),
        };
        let half = n.div_ceil(2);

        // Split n*8/2 bits into left and right; odd lengths end in a nibble.
        let mut left = ZERO;
        let mut right = ZERO;
        left[..half].copy_from_slice(&input[..half]);
        right[..half].copy_from_slice(&input[n / 2..n / 2 + half]);

        let (mut mask, mut pad) = (0x00u8, 0x80u8);
        if n % 2 == 1 {
            for k in 0..n / 2 {
                right[k] = (right[k] << 4) | (right[k + 1] >> 4);
            }
            right[n / 2] <<= 4;
            mask = 0xf0;
            pad = 0x08;
        }

        let (mut j, step) = if decrypt {
            if n < BLOCK_SIZE {
                let mut buf = ZERO;
                buf[..n].copy_from_slice(input);
                buf[0] |= 0x80;
                let tmp = self.aes4(&ZERO, &self.i[1], &self.l[3], &xor(&buf, delta));
                left[0] ^= tmp[0] & 0x80;
            }
            (rounds - 1, -1)
        } else {
            (0, 1)
        };

        let round = |half_block: &Blk, tweak: i32| -> Blk {
            let mut buf = ZERO;
            buf[..half].copy_from_slice(&half_block[..half]);
            buf[n / 2] = (buf[n / 2] & mask) | pad;
            let mut buf = xor(&buf, delta);
            buf[15] ^= tweak as u8;
            self.aes4(&ZERO, &self.i[1], &self.l[i], &buf)
        };

        for _ in 0..rounds / 2 {
            left = xor(&left, &round(&right, j));
            right = xor(&right, &round(&left, j + step));
            j += 2 * step;
        }

        let mut buf = [0u8; 2 * BLOCK_SIZE];
        buf[..n / 2].copy_from_slice(&right[..n / 2]);
        buf[n / 2..n / 2 + half].copy_from_slice(&left[..half]);
        if n % 2 == 1 {
            for k in (n / 2 + 1..n).rev() {
                buf[k] = (buf[k] >> 4) | (buf[k - 1] << 4);
            }
            buf[n / 2] = (left[0] >> 4) | (right[n / 2] & 0xf0);
        }

        let mut out = buf[..n].to_vec();
        if n < BLOCK_SIZE && !decrypt {
            let mut tail = ZERO;
            tail[..n].copy_from_slice(&buf[..n]);
            tail[0] |= 0x80;
            let tmp = self.aes4(&ZERO, &self.i[1], &self.l[3], &xor(&tail, delta));
            out[0] ^= tmp[0] & 0x80;
        }

        left.zeroize();
        right.zeroize();
        buf.zeroize();
        out
    }

    fn core(&self, delta: &Blk, input: &[u8], decrypt: bool) -> Vec<u8> {
        let d = u32::from(decrypt);
        let n = input.len();
        let pairs = (n - 2 * BLOCK_SIZE) / (2 * BLOCK_SIZE);
        let frag_start = pairs * 2 * BLOCK_SIZE;
        let frag_len = n - 2 * BLOCK_SIZE - frag_start;
        let tail = n - 2 * BLOCK_SIZE;

        let mut out = input.to_vec();

        // Pass 1: whiten each pair and accumulate X.
        let mut x = ZERO;
        for p in 0..pairs {
            let idx = (p + 1) as u32;
            let off = p * 2 * BLOCK_SIZE;
            let m = to_block(&input[off..off + BLOCK_SIZE]);
            let m2 = to_block(&input[off + BLOCK_SIZE..off + 2 * BLOCK_SIZE]);
            let w = xor(&m, &self.e(1, idx, &m2));
            let xi = xor(&m2, &self.e(0, 0, &w));
            out[off..off + BLOCK_SIZE].copy_from_slice(&w);
            out[off + BLOCK_SIZE..off + 2 * BLOCK_SIZE].copy_from_slice(&xi);
            x = xor(&x, &xi);
        }

        let frag = &input[frag_start..frag_start + frag_len];
        if frag_len >= BLOCK_SIZE {
            x = xor(&x, &self.e(0, 4, &to_block(&frag[..BLOCK_SIZE])));
            x = xor(&x, &self.e(0, 5, &pad(&frag[BLOCK_SIZE..])));
        } else if frag_len > 0 {
            x = xor(&x, &self.e(0, 4, &pad(frag)));
        }

        let mx = to_block(&input[tail..tail + BLOCK_SIZE]);
        let my = to_block(&input[tail + BLOCK_SIZE..]);
        let sx = xor(&xor(&x, &mx), &xor(delta, &self.e(0, 1 + d, &my)));
        let sy = xor(&my, &self.e(-1, 1 + d, &sx));
        let s = xor(&sx, &sy);

        // Pass 2: mask with S, accumulate Y and finish each pair.
        let mut y = ZERO;
        for p in 0..pairs {
            let idx = (p + 1) as u32;
            let off = p * 2 * BLOCK_SIZE;
            let tmp = self.e(2, idx, &s);
            let mut a = xor(&to_block(&out[off..off + BLOCK_SIZE]), &tmp);
            let mut b = xor(&to_block(&out[off + BLOCK_SIZE..off + 2 * BLOCK_SIZE]), &tmp);
            y = xor(&y, &a);
            a = xor(&a, &self.e(0, 0, &b));
            b = xor(&b, &self.e(1, idx, &a));
            out[off..off + BLOCK_SIZE].copy_from_slice(&b);
            out[off + BLOCK_SIZE..off + 2 * BLOCK_SIZE].copy_from_slice(&a);
        }

        if frag_len >= BLOCK_SIZE {
            let c = xor(&to_block(&frag[..BLOCK_SIZE]), &self.e(-1, 4, &s));
            out[frag_start..frag_start + BLOCK_SIZE].copy_from_slice(&c);
            y = xor(&y, &self.e(0, 4, &c));

            let rest = &frag[BLOCK_SIZE..];
            let keystream = self.e(-1, 5, &s);
            let mut t = ZERO;
            for (k, byte) in rest.iter().enumerate() {
                t[k] = byte ^ keystream[k];
            }
            let rest_start = frag_start + BLOCK_SIZE;
            out[rest_start..rest_start + rest.len()].copy_from_slice(&t[..rest.len()]);
            t[rest.len()] = 0x80;
            y = xor(&y, &self.e(0, 5, &t));
        } else if frag_len > 0 {
            let keystream = self.e(-1, 4, &s);
            let mut t = ZERO;
            for (k, byte) in frag.iter().enumerate() {
                t[k] = byte ^ keystream[k];
            }
            out[frag_start..frag_start + frag_len].copy_from_slice(&t[..frag_len]);
            t[frag_len] = 0x80;
            y = xor(&y, &self.e(0, 4, &t));
        }

        let cy = xor(&sx, &self.e(-1, 2 - d, &sy));
        let cx = xor(&xor(&sy, &self.e(0, 2 - d, &cy)), &xor(delta, &y));
        out[tail..tail + BLOCK_SIZE].copy_from_slice(&cx);
        out[tail + BLOCK_SIZE..].copy_from_slice(&cy);
        out
    }
}

/// Reduce an arbitrary key to the 48 bytes `I || J || L`.
fn extract(key: &[u8]) -> Zeroizing<[u8; EXTRACTED_KEY_SIZE]> {
    let mut out = Zeroizing::new([0u8; EXTRACTED_KEY_SIZE]);
    if key.len() == EXTRACTED_KEY_SIZE {
        out.copy_from_slice(key);
    } else {
        let mut digest = Blake2b::<U48>::digest(key);
        out.copy_from_slice(&digest);
        digest.as_mut_slice().zeroize();
    }
    out
}

fn aes_round(block: &mut Blk, round_key: &Blk) {
    cipher_round(
        Block::from_mut_slice(&mut block[..]),
        Block::from_slice(&round_key[..]),
    );
}

/// Multiply by `x` in GF(2^128).
fn double(p: &Blk) -> Blk {
    let mut out = ZERO;
    for k in 0..BLOCK_SIZE - 1 {
        out[k] = (p[k] << 1) | (p[k + 1] >> 7);
    }
    out[BLOCK_SIZE - 1] = (p[BLOCK_SIZE - 1] << 1) ^ (0x87 & 0u8.wrapping_sub(p[0] >> 7));
    out
}

/// Multiply `src` by the small public constant `x`.
fn mult(mut x: u32, src: &Blk) -> Blk {
    let mut t = *src;
    let mut r = ZERO;
    while x != 0 {
        if x & 1 != 0 {
            r = xor(&r, &t);
        }
        t = double(&t);
        x >>= 1;
    }
    r
}

fn xor(a: &Blk, b: &Blk) -> Blk {
    let mut out = ZERO;
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b)) {
        *o = x ^ y;
    }
    out
}

fn to_block(bytes: &[u8]) -> Blk {
    let mut out = ZERO;
    out.copy_from_slice(bytes);
    out
}

/// `bytes || 1 || 0*`, for inputs shorter than a block.
fn pad(bytes: &[u8]) -> Blk {
    let mut out = ZERO;
    out[..bytes.len()].copy_from_slice(bytes);
    out[bytes.len()] = 0x80;
    out
}

fn increment(ctr: &mut Blk) {
    for byte in ctr.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"aezkit test key material";
    const AD: &[u8] = b"\x00salty";

    fn message(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn roundtrip_all_code_paths() {
        // 0 is the prf path, under 32 bytes (with tau) is AEZ-tiny, the rest AEZ-core.
        for len in [0, 1, 2, 3, 11, 12, 15, 16, 19, 27, 28, 29, 31, 45, 60, 61, 64, 77, 100] {
            let msg = message(len);
            let ct = encrypt(KEY, b"", &[AD], 4, &msg);
            assert_eq!(ct.len(), len + 4, "length {len}");

            let pt = decrypt(KEY, b"", &[AD], 4, &ct).unwrap();
            assert_eq!(pt.as_slice(), msg.as_slice(), "length {len}");
        }
    }

    #[test]
    fn roundtrip_without_expansion() {
        for len in [7, 16, 31, 32, 33, 48, 90] {
            let msg = message(len);
            let ct = encrypt(KEY, b"nonce", &[], 0, &msg);
            assert_eq!(ct.len(), len);
            assert_ne!(ct, msg);
            let pt = decrypt(KEY, b"nonce", &[], 0, &ct).unwrap();
            assert_eq!(pt.as_slice(), msg.as_slice());
        }
    }

    #[test]
    fn deterministic() {
        let msg = message(19);
        assert_eq!(
            encrypt(KEY, b"", &[AD], 4, &msg),
            encrypt(KEY, b"", &[AD], 4, &msg)
        );
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        for len in [19, 50] {
            let ct = encrypt(KEY, b"", &[AD], 4, &message(len));
            for pos in [0, len / 2, len + 3] {
                let mut bad = ct.clone();
                bad[pos] ^= 0x01;
                assert!(decrypt(KEY, b"", &[AD], 4, &bad).is_none(), "len {len} pos {pos}");
            }
        }
    }

    #[test]
    fn wrong_key_rejected() {
        let ct = encrypt(KEY, b"", &[AD], 4, &message(19));
        assert!(decrypt(b"another key", b"", &[AD], 4, &ct).is_none());
    }

    #[test]
    fn wrong_associated_data_rejected() {
        let ct = encrypt(KEY, b"", &[AD], 4, &message(19));
        assert!(decrypt(KEY, b"", &[&b"\x00pepper"[..]], 4, &ct).is_none());
        assert!(decrypt(KEY, b"", &[], 4, &ct).is_none());
        assert!(decrypt(KEY, b"n", &[AD], 4, &ct).is_none());
    }

    #[test]
    fn empty_message_authenticates_tag_only() {
        let tag = encrypt(KEY, b"", &[AD], 16, b"");
        assert_eq!(tag.len(), 16);
        assert!(decrypt(KEY, b"", &[AD], 16, &tag).unwrap().is_empty());

        let mut bad = tag;
        bad[15] ^= 0x80;
        assert!(decrypt(KEY, b"", &[AD], 16, &bad).is_none());
    }

    #[test]
    fn short_ciphertext_rejected() {
        assert!(decrypt(KEY, b"", &[AD], 4, &[1, 2, 3]).is_none());
    }

    #[test]
    fn extracted_key_used_verbatim_at_48_bytes() {
        let key = [7u8; EXTRACTED_KEY_SIZE];
        assert_eq!(*extract(&key), key);
        assert_ne!(*extract(&key[..32]), key);
    }

    #[test]
    fn doubling_reduces_modulo_polynomial() {
        let mut top = ZERO;
        top[0] = 0x80;
        let mut expected = ZERO;
        expected[15] = 0x87;
        assert_eq!(double(&top), expected);
        assert_eq!(mult(3, &top), xor(&top, &expected));
    }
}
