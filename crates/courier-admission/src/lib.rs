//! Proof-of-work admission gate for Courier.
//!
//! Before a client may deposit a message in someone's mailbox it must
//! find an admission token: a number `n` such that
//!
//! ```text
//! hex(SHA-256(ciphertext || decimal(n)))  starts with  "00000"
//! ```
//!
//! where `decimal(n)` is the ASCII base-10 rendering of `n` with no
//! padding. Each hex zero is four bits of work, so the default difficulty
//! of five zeros costs about 2^20 hashes to find and a single hash to
//! check.
//!
//! # Determinism
//!
//! [`AdmissionGate::solve`] tries `n = 0, 1, 2, …` in order and returns the
//! first hit, so the same ciphertext always yields the same (minimal)
//! token. No state is kept between calls on either side.
//!
//! # Integration
//!
//! The search is CPU-bound and can take seconds. Callers on an async
//! runtime should run it on a blocking worker:
//!
//! ```ignore
//! let token = tokio::task::spawn_blocking(move || gate.solve(&ciphertext)).await??;
//! ```

use sha2::{Digest, Sha256};

/// Number of leading hex zeros required by default (≈20 bits of work).
pub const DEFAULT_DIFFICULTY: u8 = 5;

/// Highest accepted difficulty.
///
/// The token is a 32-bit field, so anything past seven hex zeros (28 bits)
/// is likely to exhaust the search space before finding a solution.
pub const MAX_DIFFICULTY: u8 = 7;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by the admission gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// The token does not satisfy the difficulty for this ciphertext.
    #[error("admission token {token} rejected")]
    Rejected { token: u32 },

    /// Every 32-bit token was tried without success.
    #[error("no admission token exists for this ciphertext at difficulty {0}")]
    Exhausted(u8),

    /// The requested difficulty is out of range.
    #[error("difficulty {0} exceeds the maximum of {MAX_DIFFICULTY}")]
    InvalidDifficulty(u8),
}

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// How many leading hex zeros a digest must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Difficulty(u8);

impl Difficulty {
    /// Creates a difficulty of `zeros` leading hex characters.
    ///
    /// # Errors
    /// Returns [`AdmissionError::InvalidDifficulty`] above [`MAX_DIFFICULTY`].
    pub fn new(zeros: u8) -> Result<Self, AdmissionError> {
        if zeros > MAX_DIFFICULTY {
            return Err(AdmissionError::InvalidDifficulty(zeros));
        }
        Ok(Self(zeros))
    }

    /// The number of leading hex zeros.
    pub fn zeros(self) -> u8 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(DEFAULT_DIFFICULTY)
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// Renders `n` as ASCII decimal into `buf`, returning the used tail.
fn decimal(mut n: u32, buf: &mut [u8; 10]) -> &[u8] {
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    &buf[start..]
}

/// SHA-256 of the ciphertext followed by the token's decimal digits.
pub fn digest(ciphertext: &[u8], token: u32) -> [u8; 32] {
    let mut digits = [0u8; 10];
    let mut hasher = Sha256::new();
    hasher.update(ciphertext);
    hasher.update(decimal(token, &mut digits));
    hasher.finalize().into()
}

/// The lowercase hex rendering of [`digest`].
pub fn hex_digest(ciphertext: &[u8], token: u32) -> String {
    hex::encode(digest(ciphertext, token))
}

/// Counts leading zero nibbles, i.e. leading `'0'` characters in hex.
fn leading_hex_zeros(digest: &[u8; 32]) -> u8 {
    let mut zeros = 0;
    for byte in digest {
        if *byte == 0 {
            zeros += 2;
            continue;
        }
        if byte >> 4 == 0 {
            zeros += 1;
        }
        break;
    }
    zeros
}

// ---------------------------------------------------------------------------
// AdmissionGate
// ---------------------------------------------------------------------------

/// Computes and checks admission tokens at a fixed difficulty.
///
/// The same gate type runs on both ends: clients call [`solve`], the relay
/// calls [`verify`]. Both sides must agree on the difficulty.
///
/// [`solve`]: AdmissionGate::solve
/// [`verify`]: AdmissionGate::verify
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionGate {
    difficulty: Difficulty,
}

impl AdmissionGate {
    /// Creates a gate requiring `difficulty` leading hex zeros.
    pub fn new(difficulty: Difficulty) -> Self {
        Self { difficulty }
    }

    /// The gate's difficulty.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Returns `true` if `token` is admissible for `ciphertext`.
    pub fn is_admissible(&self, ciphertext: &[u8], token: u32) -> bool {
        leading_hex_zeros(&digest(ciphertext, token)) >= self.difficulty.0
    }

    /// Checks a claimed `(ciphertext, token)` pair.
    ///
    /// # Errors
    /// Returns [`AdmissionError::Rejected`] if the digest lacks the prefix.
    pub fn verify(
        &self,
        ciphertext: &[u8],
        token: u32,
    ) -> Result<(), AdmissionError> {
        if self.is_admissible(ciphertext, token) {
            Ok(())
        } else {
            Err(AdmissionError::Rejected { token })
        }
    }

    /// Finds the smallest admissible token for `ciphertext`.
    ///
    /// Blocks the calling thread for the duration of the search.
    ///
    /// # Errors
    /// Returns [`AdmissionError::Exhausted`] if no 32-bit token works.
    pub fn solve(&self, ciphertext: &[u8]) -> Result<u32, AdmissionError> {
        // The ciphertext prefix is hashed once; each attempt clones the
        // midstate and appends only the digits.
        let mut base = Sha256::new();
        base.update(ciphertext);

        let mut digits = [0u8; 10];
        for token in 0..=u32::MAX {
            let mut hasher = base.clone();
            hasher.update(decimal(token, &mut digits));
            let hash: [u8; 32] = hasher.finalize().into();

            if leading_hex_zeros(&hash) >= self.difficulty.0 {
                tracing::debug!(
                    token,
                    difficulty = self.difficulty.0,
                    digest = %hex::encode(hash),
                    "admission token found"
                );
                return Ok(token);
            }
        }

        Err(AdmissionError::Exhausted(self.difficulty.0))
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(zeros: u8) -> AdmissionGate {
        AdmissionGate::new(Difficulty::new(zeros).expect("valid difficulty"))
    }

    #[test]
    fn test_decimal_renders_without_padding() {
        let mut buf = [0u8; 10];
        assert_eq!(decimal(0, &mut buf), b"0");
        assert_eq!(decimal(42, &mut buf), b"42");
        assert_eq!(decimal(u32::MAX, &mut buf), b"4294967295");
    }

    #[test]
    fn test_digest_hashes_ciphertext_then_decimal_token() {
        // sha256("AB0")
        assert_eq!(
            hex_digest(b"AB", 0),
            "652528305021c6ac0a8ceaece36b520c97503f956a8e01cfd0e0904e29423ab7"
        );
    }

    #[test]
    fn test_leading_hex_zeros_counts_nibbles() {
        let mut d = [0xFFu8; 32];
        assert_eq!(leading_hex_zeros(&d), 0);
        d[0] = 0x0F;
        assert_eq!(leading_hex_zeros(&d), 1);
        d[0] = 0x00;
        d[1] = 0x00;
        d[2] = 0x0A;
        assert_eq!(leading_hex_zeros(&d), 5);
        assert_eq!(leading_hex_zeros(&[0u8; 32]), 64);
    }

    #[test]
    fn test_difficulty_bounds() {
        assert_eq!(Difficulty::default().zeros(), 5);
        assert!(Difficulty::new(MAX_DIFFICULTY).is_ok());
        assert_eq!(
            Difficulty::new(MAX_DIFFICULTY + 1),
            Err(AdmissionError::InvalidDifficulty(MAX_DIFFICULTY + 1))
        );
    }

    #[test]
    fn test_zero_difficulty_admits_everything() {
        let g = gate(0);
        assert_eq!(g.solve(b"anything").unwrap(), 0);
        assert!(g.verify(b"anything", 12345).is_ok());
    }

    #[test]
    fn test_solve_returns_minimal_token() {
        let g = gate(2);
        let token = g.solve(b"AB").unwrap();
        assert_eq!(token, 1214);
        assert!(hex_digest(b"AB", token).starts_with("00"));
        for smaller in 0..token {
            assert!(!g.is_admissible(b"AB", smaller), "token {smaller}");
        }
    }

    #[test]
    fn test_solve_is_deterministic() {
        let g = gate(3);
        assert_eq!(g.solve(b"hello").unwrap(), g.solve(b"hello").unwrap());
        assert_eq!(g.solve(b"hello").unwrap(), 10284);
    }

    #[test]
    fn test_verify_rejects_wrong_token() {
        let g = gate(1);
        let token = g.solve(b"").unwrap();
        assert_eq!(token, 39);
        assert_eq!(g.verify(b"", token), Ok(()));
        assert_eq!(
            g.verify(b"", token - 1),
            Err(AdmissionError::Rejected { token: token - 1 })
        );
    }

    #[test]
    fn test_token_is_bound_to_ciphertext() {
        let g = gate(3);
        let token = g.solve(b"hello").unwrap();
        assert!(g.is_admissible(b"hello", token));
        // Hashes are independent; this particular pair is known to fail.
        assert!(!g.is_admissible(b"hellp", token));
    }
}
