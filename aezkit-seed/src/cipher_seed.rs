//! The cipher seed record and its enciphered form.
//!
//! A [`CipherSeed`] carries 16 bytes of wallet entropy together with an
//! internal version, a birthday and a random salt. Enciphering it under a
//! passphrase yields 33 bytes:
//!
//! ```text
//! +---------+------------------------+--------+-------------+
//! | version | AEZ ciphertext (23)    | salt 5 | CRC-32C (4) |
//! +---------+------------------------+--------+-------------+
//! ```
//!
//! The ciphertext covers `internal_version || birthday (u16 BE) || entropy`
//! with four bytes of expansion, and the associated data is
//! `version || salt`. The AEZ key is `scrypt(passphrase, salt)` with
//! `N = 2^15, r = 8, p = 1`. The checksum is computed over the first 29
//! bytes and stored big-endian.

use core::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use rand_core::{OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::aez;
use crate::error::{AuthFailure, Error};
use crate::mnemonic::Mnemonic;

/// Version byte of the enciphered encoding produced by this library.
pub const CIPHER_SEED_VERSION: u8 = 0;

/// Size of the wallet entropy in bytes.
pub const ENTROPY_SIZE: usize = 16;

/// Size of the per-seed salt in bytes.
pub const SALT_SIZE: usize = 5;

/// Size of the plaintext that is fed to AEZ.
pub const DECIPHERED_SIZE: usize = 1 + 2 + ENTROPY_SIZE;

/// AEZ ciphertext expansion in bytes.
pub const CIPHERTEXT_EXPANSION: usize = 4;

/// Size of the fully enciphered seed.
pub const ENCIPHERED_SIZE: usize = 1 + DECIPHERED_SIZE + CIPHERTEXT_EXPANSION + SALT_SIZE + 4;

/// Passphrase used when the caller supplies none.
pub const DEFAULT_PASSPHRASE: &str = "aezeed";

/// Unix timestamp of the Bitcoin genesis block, the zero point of birthdays.
pub const GENESIS_TIMESTAMP: i64 = 1_231_006_505;

const SALT_OFFSET: usize = 1 + DECIPHERED_SIZE + CIPHERTEXT_EXPANSION;
const CHECKSUM_OFFSET: usize = SALT_OFFSET + SALT_SIZE;

/// Base-two logarithm of the scrypt cost parameter `N`.
pub(crate) const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const KEY_SIZE: usize = 32;

/// Decrypted seed material.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CipherSeed {
    internal_version: u8,
    birthday: u16,
    entropy: [u8; ENTROPY_SIZE],
    salt: [u8; SALT_SIZE],
}

impl CipherSeed {
    /// Create a seed with fresh random entropy and salt, stamped with the
    /// birthday of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Entropy`] if the operating system random source fails.
    pub fn generate(internal_version: u8, now: DateTime<Utc>) -> Result<Self, Error> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_SIZE]);
        OsRng.try_fill_bytes(&mut entropy[..])?;
        Self::new(internal_version, *entropy, now)
    }

    /// Create a seed from caller supplied entropy. The salt is still random.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Entropy`] if the operating system random source fails.
    pub fn new(
        internal_version: u8,
        entropy: [u8; ENTROPY_SIZE],
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.try_fill_bytes(&mut salt)?;
        Ok(Self::from_parts(
            internal_version,
            birthday_from(now),
            entropy,
            salt,
        ))
    }

    /// Assemble a seed from every field. Nothing is random, which makes this
    /// the constructor to use when reproducing a known encoding.
    #[must_use]
    pub const fn from_parts(
        internal_version: u8,
        birthday: u16,
        entropy: [u8; ENTROPY_SIZE],
        salt: [u8; SALT_SIZE],
    ) -> Self {
        Self {
            internal_version,
            birthday,
            entropy,
            salt,
        }
    }

    /// Internal version chosen by the wallet that created the seed.
    #[inline]
    #[must_use]
    pub const fn internal_version(&self) -> u8 {
        self.internal_version
    }

    /// Days between the genesis block and seed creation.
    #[inline]
    #[must_use]
    pub const fn birthday(&self) -> u16 {
        self.birthday
    }

    /// The birthday as a calendar timestamp.
    #[must_use]
    pub fn birthday_time(&self) -> DateTime<Utc> {
        genesis() + TimeDelta::days(i64::from(self.birthday))
    }

    /// The 16 bytes of wallet entropy.
    #[inline]
    #[must_use]
    pub const fn entropy(&self) -> &[u8; ENTROPY_SIZE] {
        &self.entropy
    }

    /// The salt used for key stretching.
    #[inline]
    #[must_use]
    pub const fn salt(&self) -> &[u8; SALT_SIZE] {
        &self.salt
    }

    /// Encipher the seed under `passphrase` and render it as 24 words.
    ///
    /// `None` and the empty string both select [`DEFAULT_PASSPHRASE`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyDerivation`] if scrypt fails.
    pub fn to_mnemonic(&self, passphrase: Option<&str>) -> Result<Mnemonic, Error> {
        let enciphered = self.encipher(passphrase)?;
        Ok(Mnemonic::from_enciphered(&enciphered))
    }

    /// Produce the 33-byte enciphered form.
    pub(crate) fn encipher(&self, passphrase: Option<&str>) -> Result<[u8; ENCIPHERED_SIZE], Error> {
        self.encipher_with_cost(passphrase, SCRYPT_LOG_N)
    }

    /// Like [`CipherSeed::encipher`] with an explicit scrypt `log_n`.
    pub(crate) fn encipher_with_cost(
        &self,
        passphrase: Option<&str>,
        log_n: u8,
    ) -> Result<[u8; ENCIPHERED_SIZE], Error> {
        let key = derive_key(passphrase, &self.salt, log_n)?;
        let plaintext = self.to_plaintext();
        let ad = associated_data(CIPHER_SEED_VERSION, &self.salt);
        let ciphertext = aez::encrypt(&key[..], &[], &[&ad[..]], CIPHERTEXT_EXPANSION, &plaintext[..]);
        debug_assert_eq!(ciphertext.len(), SALT_OFFSET - 1);

        let mut out = [0u8; ENCIPHERED_SIZE];
        out[0] = CIPHER_SEED_VERSION;
        out[1..SALT_OFFSET].copy_from_slice(&ciphertext);
        out[SALT_OFFSET..CHECKSUM_OFFSET].copy_from_slice(&self.salt);
        let checksum = crc32c::crc32c(&out[..CHECKSUM_OFFSET]);
        out[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_be_bytes());
        Ok(out)
    }

    /// Recover a seed from its enciphered form.
    ///
    /// The version byte is checked first, then the checksum, and only then is
    /// the expensive key stretching performed.
    pub(crate) fn decipher(
        enciphered: &[u8; ENCIPHERED_SIZE],
        passphrase: Option<&str>,
    ) -> Result<Self, Error> {
        Self::decipher_with_cost(enciphered, passphrase, SCRYPT_LOG_N)
    }

    pub(crate) fn decipher_with_cost(
        enciphered: &[u8; ENCIPHERED_SIZE],
        passphrase: Option<&str>,
        log_n: u8,
    ) -> Result<Self, Error> {
        let version = enciphered[0];
        if version != CIPHER_SEED_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let mut stored = [0u8; 4];
        stored.copy_from_slice(&enciphered[CHECKSUM_OFFSET..]);
        if crc32c::crc32c(&enciphered[..CHECKSUM_OFFSET]) != u32::from_be_bytes(stored) {
            return Err(Error::Authentication(AuthFailure::Checksum));
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&enciphered[SALT_OFFSET..CHECKSUM_OFFSET]);

        let key = derive_key(passphrase, &salt, log_n)?;
        let ad = associated_data(version, &salt);
        let plaintext = aez::decrypt(
            &key[..],
            &[],
            &[&ad[..]],
            CIPHERTEXT_EXPANSION,
            &enciphered[1..SALT_OFFSET],
        )
        .ok_or(Error::Authentication(AuthFailure::Passphrase))?;

        Ok(Self::from_plaintext(&plaintext, salt))
    }

    fn to_plaintext(&self) -> Zeroizing<[u8; DECIPHERED_SIZE]> {
        let mut out = Zeroizing::new([0u8; DECIPHERED_SIZE]);
        out[0] = self.internal_version;
        out[1..3].copy_from_slice(&self.birthday.to_be_bytes());
        out[3..].copy_from_slice(&self.entropy);
        out
    }

    fn from_plaintext(plaintext: &[u8], salt: [u8; SALT_SIZE]) -> Self {
        let mut entropy = [0u8; ENTROPY_SIZE];
        entropy.copy_from_slice(&plaintext[3..DECIPHERED_SIZE]);
        Self {
            internal_version: plaintext[0],
            birthday: u16::from_be_bytes([plaintext[1], plaintext[2]]),
            entropy,
            salt,
        }
    }
}

impl fmt::Debug for CipherSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherSeed")
            .field("internal_version", &self.internal_version)
            .field("birthday", &self.birthday)
            .field("entropy", &"<redacted>")
            .field("salt", &self.salt)
            .finish()
    }
}

/// Days elapsed since the genesis block, clamped to the `u16` range.
#[must_use]
pub fn birthday_from(now: DateTime<Utc>) -> u16 {
    let days = (now - genesis()).num_days().max(0);
    u16::try_from(days).unwrap_or(u16::MAX)
}

fn genesis() -> DateTime<Utc> {
    DateTime::from_timestamp(GENESIS_TIMESTAMP, 0).unwrap_or_default()
}

fn associated_data(version: u8, salt: &[u8; SALT_SIZE]) -> [u8; 1 + SALT_SIZE] {
    let mut ad = [0u8; 1 + SALT_SIZE];
    ad[0] = version;
    ad[1..].copy_from_slice(salt);
    ad
}

/// Stretch the passphrase into the AEZ key.
fn derive_key(
    passphrase: Option<&str>,
    salt: &[u8; SALT_SIZE],
    log_n: u8,
) -> Result<Zeroizing<[u8; KEY_SIZE]>, Error> {
    let passphrase = match passphrase {
        Some(p) if !p.is_empty() => p,
        _ => DEFAULT_PASSPHRASE,
    };

    let params = scrypt::Params::new(log_n, SCRYPT_R, SCRYPT_P, KEY_SIZE)
        .map_err(|_| Error::KeyDerivation)?;
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    scrypt::scrypt(passphrase.as_bytes(), salt, &params, &mut key[..])
        .map_err(|_| Error::KeyDerivation)?;
    Ok(key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ENTROPY: [u8; ENTROPY_SIZE] = [
        0x81, 0xb6, 0x37, 0xd8, 0x63, 0x59, 0xe6, 0x96, 0x0d, 0xe7, 0x95, 0xe4, 0x1e, 0x0b, 0x4c,
        0xfd,
    ];
    const SALT: [u8; SALT_SIZE] = [0x73, 0x61, 0x6c, 0x74, 0x31];

    // lnd's aezeed test suite lowers scrypt to N = 16 when producing its
    // published vectors; the cipher itself is unchanged.
    const LND_VECTOR_LOG_N: u8 = 4;

    const LND_MNEMONIC_DEFAULT: &str = "ability liquid travel stem barely drastic pact \
        cupboard apple thrive morning oak feature tissue couch old math inform success suggest \
        drink motion know royal";
    const LND_PASSPHRASE: &str = "!very_safe_55345_password*";
    const LND_MNEMONIC_PASSPHRASE: &str = "able tree stool crush transfer cloud cross \
        three profit outside hen citizen plate ride require leg siren drum success suggest drink \
        require fiscal upgrade";

    fn fixed_seed() -> CipherSeed {
        CipherSeed::from_parts(0, 3012, ENTROPY, SALT)
    }

    #[test]
    fn layout_sizes() {
        assert_eq!(DECIPHERED_SIZE, 19);
        assert_eq!(ENCIPHERED_SIZE, 33);
        assert_eq!(SALT_OFFSET, 24);
        assert_eq!(CHECKSUM_OFFSET, 29);
    }

    #[test]
    fn encipher_layout() {
        let seed = fixed_seed();
        let enciphered = seed.encipher(None).unwrap();

        assert_eq!(enciphered[0], CIPHER_SEED_VERSION);
        assert_eq!(&enciphered[SALT_OFFSET..CHECKSUM_OFFSET], &SALT);
        let checksum = crc32c::crc32c(&enciphered[..CHECKSUM_OFFSET]);
        assert_eq!(&enciphered[CHECKSUM_OFFSET..], &checksum.to_be_bytes());
    }

    #[test]
    fn encipher_is_deterministic_for_fixed_salt() {
        let seed = fixed_seed();
        assert_eq!(seed.encipher(Some("hunter2")).unwrap(), seed.encipher(Some("hunter2")).unwrap());
        assert_ne!(seed.encipher(Some("hunter2")).unwrap(), seed.encipher(None).unwrap());
    }

    #[test]
    fn empty_passphrase_is_default() {
        let seed = fixed_seed();
        let a = seed.encipher(None).unwrap();
        let b = seed.encipher(Some("")).unwrap();
        let c = seed.encipher(Some(DEFAULT_PASSPHRASE)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn decipher_roundtrip() {
        let seed = fixed_seed();
        let enciphered = seed.encipher(Some("correct horse")).unwrap();
        let recovered = CipherSeed::decipher(&enciphered, Some("correct horse")).unwrap();
        assert_eq!(recovered, seed);
        assert_eq!(recovered.birthday(), 3012);
        assert_eq!(recovered.entropy(), &ENTROPY);
    }

    #[test]
    fn wrong_passphrase_fails_authentication() {
        let enciphered = fixed_seed().encipher(Some("correct horse")).unwrap();
        let err = CipherSeed::decipher(&enciphered, Some("battery staple")).unwrap_err();
        assert!(matches!(err, Error::Authentication(AuthFailure::Passphrase)));
    }

    #[test]
    fn unknown_version_rejected_before_checksum() {
        let mut enciphered = fixed_seed().encipher(None).unwrap();
        enciphered[0] = 1;
        let err = CipherSeed::decipher(&enciphered, None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(1)));
        assert!(err.is_format());
    }

    #[test]
    fn corrupted_bytes_fail_checksum() {
        let mut enciphered = fixed_seed().encipher(None).unwrap();
        enciphered[10] ^= 0x40;
        let err = CipherSeed::decipher(&enciphered, None).unwrap_err();
        assert!(matches!(err, Error::Authentication(AuthFailure::Checksum)));
    }

    #[test]
    fn corruption_with_fixed_checksum_fails_authenticator() {
        let mut enciphered = fixed_seed().encipher(None).unwrap();
        enciphered[10] ^= 0x40;
        let checksum = crc32c::crc32c(&enciphered[..CHECKSUM_OFFSET]);
        enciphered[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_be_bytes());
        let err = CipherSeed::decipher(&enciphered, None).unwrap_err();
        assert!(matches!(err, Error::Authentication(AuthFailure::Passphrase)));
    }

    #[test]
    fn generated_seeds_differ() {
        let now = Utc::now();
        let a = CipherSeed::generate(0, now).unwrap();
        let b = CipherSeed::generate(0, now).unwrap();
        assert_ne!(a.entropy(), b.entropy());
        assert_eq!(a.birthday(), b.birthday());
    }

    #[test]
    fn birthday_counts_days_since_genesis() {
        let genesis = DateTime::from_timestamp(GENESIS_TIMESTAMP, 0).unwrap();
        assert_eq!(birthday_from(genesis), 0);
        assert_eq!(birthday_from(genesis + TimeDelta::days(1)), 1);
        assert_eq!(birthday_from(genesis + TimeDelta::hours(47)), 1);
        assert_eq!(birthday_from(genesis - TimeDelta::days(3)), 0);
        assert_eq!(birthday_from(genesis + TimeDelta::days(70_000)), u16::MAX);
    }

    #[test]
    fn birthday_time_inverts_birthday() {
        let seed = fixed_seed();
        assert_eq!(birthday_from(seed.birthday_time()), seed.birthday());
    }

    fn lnd_encode(birthday: u16, passphrase: Option<&str>) -> String {
        let seed = CipherSeed::from_parts(0, birthday, ENTROPY, SALT);
        let enciphered = seed.encipher_with_cost(passphrase, LND_VECTOR_LOG_N).unwrap();
        Mnemonic::from_enciphered(&enciphered).to_string()
    }

    fn lnd_decode(phrase: &str, passphrase: Option<&str>) -> Result<CipherSeed, Error> {
        let mnemonic = Mnemonic::parse(phrase).unwrap();
        CipherSeed::decipher_with_cost(&mnemonic.to_enciphered(), passphrase, LND_VECTOR_LOG_N)
    }

    #[test]
    fn lnd_vector_default_passphrase_encodes() {
        assert_eq!(lnd_encode(0, None), LND_MNEMONIC_DEFAULT);
    }

    #[test]
    fn lnd_vector_custom_passphrase_encodes() {
        assert_eq!(lnd_encode(3365, Some(LND_PASSPHRASE)), LND_MNEMONIC_PASSPHRASE);
    }

    #[test]
    fn lnd_vectors_decode() {
        let seed = lnd_decode(LND_MNEMONIC_DEFAULT, None).unwrap();
        assert_eq!(seed.internal_version(), 0);
        assert_eq!(seed.birthday(), 0);
        assert_eq!(seed.entropy(), &ENTROPY);
        assert_eq!(seed.salt(), &SALT);

        let seed = lnd_decode(LND_MNEMONIC_PASSPHRASE, Some(LND_PASSPHRASE)).unwrap();
        assert_eq!(seed.birthday(), 3365);
        assert_eq!(seed.entropy(), &ENTROPY);
        assert_eq!(seed.salt(), &SALT);
    }

    #[test]
    fn lnd_vector_wrong_passphrase_rejected() {
        let err = lnd_decode(LND_MNEMONIC_PASSPHRASE, None).unwrap_err();
        assert!(matches!(err, Error::Authentication(AuthFailure::Passphrase)));

        let err = lnd_decode(LND_MNEMONIC_DEFAULT, Some(LND_PASSPHRASE)).unwrap_err();
        assert!(matches!(err, Error::Authentication(AuthFailure::Passphrase)));
    }

    #[test]
    fn production_cost_differs_from_vector_cost() {
        let seed = CipherSeed::from_parts(0, 0, ENTROPY, SALT);
        assert_ne!(
            seed.encipher(None).unwrap(),
            seed.encipher_with_cost(None, LND_VECTOR_LOG_N).unwrap()
        );
    }

    #[test]
    fn debug_redacts_entropy() {
        let rendered = format!("{:?}", fixed_seed());
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("129"));
    }
}
