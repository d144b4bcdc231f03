use hmac::{Hmac, Mac};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha2::Sha256;

pub type HmacSha256 = Hmac<Sha256>;

/// Source of uniform rolls in `[0, 1)` consumed by the reel spinner.
pub trait RollSource {
    fn next_roll(&mut self) -> f64;
}

impl<R: RollSource + ?Sized> RollSource for Box<R> {
    fn next_roll(&mut self) -> f64 {
        (**self).next_roll()
    }
}

/// Convert successive 4-byte chunks into floats in `[0, 1)`.
pub fn derive_floats(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let v = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            (v as f64) / (u32::MAX as f64 + 1.0)
        })
        .collect()
}

/// Production rolls from an entropy-seeded `StdRng`.
pub struct EntropyRolls {
    rng: StdRng,
}

impl EntropyRolls {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for EntropyRolls {
    fn default() -> Self {
        Self::new()
    }
}

impl RollSource for EntropyRolls {
    fn next_roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Deterministic roll stream: HMAC-SHA256 keyed by the server seed over
/// `client_seed:nonce:round`, eight rolls per round.
pub struct SeededRolls {
    server_seed: String,
    client_seed: String,
    nonce: u64,
    round: u64,
    buffer: Vec<f64>,
    cursor: usize,
}

impl SeededRolls {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
            round: 0,
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    pub fn hmac_bytes(&self, round: u64) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(self.server_seed.as_bytes()).expect("HMAC key of any size");
        let msg = format!("{}:{}:{}", self.client_seed, self.nonce, round);
        mac.update(msg.as_bytes());
        let res = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&res);
        out
    }

    fn refill(&mut self) {
        self.buffer = derive_floats(&self.hmac_bytes(self.round));
        self.round += 1;
        self.cursor = 0;
    }
}

impl RollSource for SeededRolls {
    fn next_roll(&mut self) -> f64 {
        if self.cursor >= self.buffer.len() {
            self.refill();
        }
        let roll = self.buffer[self.cursor];
        self.cursor += 1;
        roll
    }
}

/// Replays a fixed sequence of rolls, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct CycleRolls {
    rolls: Vec<f64>,
    cursor: usize,
}

impl CycleRolls {
    /// An empty sequence behaves like a constant `0.0` roll.
    pub fn new(rolls: Vec<f64>) -> Self {
        Self { rolls, cursor: 0 }
    }

    pub fn constant(roll: f64) -> Self {
        Self::new(vec![roll])
    }
}

impl RollSource for CycleRolls {
    fn next_roll(&mut self) -> f64 {
        if self.rolls.is_empty() {
            return 0.0;
        }
        let roll = self.rolls[self.cursor % self.rolls.len()];
        self.cursor = (self.cursor + 1) % self.rolls.len();
        roll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take<R: RollSource>(rolls: &mut R, n: usize) -> Vec<f64> {
        (0..n).map(|_| rolls.next_roll()).collect()
    }

    #[test]
    fn test_determinism() {
        let mut rng1 = SeededRolls::new("server", "client", 1);
        let mut rng2 = SeededRolls::new("server", "client", 1);
        assert_eq!(rng1.hmac_bytes(0), rng2.hmac_bytes(0));
        assert_eq!(take(&mut rng1, 30), take(&mut rng2, 30));
    }

    #[test]
    fn seeded_rounds_differ() {
        let rng = SeededRolls::new("server", "client", 1);
        assert_ne!(rng.hmac_bytes(0), rng.hmac_bytes(1));
        let mut other = SeededRolls::new("server", "client", 2);
        let mut rng = rng;
        assert_ne!(take(&mut rng, 8), take(&mut other, 8));
    }

    #[test]
    fn rolls_stay_in_unit_interval() {
        let mut seeded = SeededRolls::new("s", "c", 9);
        let mut entropy = EntropyRolls::new();
        for _ in 0..1000 {
            let a = seeded.next_roll();
            let b = entropy.next_roll();
            assert!((0.0..1.0).contains(&a));
            assert!((0.0..1.0).contains(&b));
        }
    }

    #[test]
    fn cycle_wraps() {
        let mut rolls = CycleRolls::new(vec![0.1, 0.2]);
        assert_eq!(take(&mut rolls, 5), vec![0.1, 0.2, 0.1, 0.2, 0.1]);
        assert_eq!(CycleRolls::new(vec![]).next_roll(), 0.0);
    }

    #[test]
    fn derive_floats_maps_bytes() {
        let floats = derive_floats(&[0, 0, 0, 0, 0x80, 0, 0, 0, 0xff]);
        assert_eq!(floats, vec![0.0, 0.5]);
    }
}
