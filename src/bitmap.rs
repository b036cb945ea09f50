use bitvec::vec::BitVec;
use log::warn;

/// An allocation bitmap. A value of `true` represents "occupied".
///
/// Persisted as one byte per slot (`0` free, `1` occupied).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap(BitVec);

impl Bitmap {
    /// An all-free bitmap with `len` slots.
    pub fn new(len: usize) -> Self {
        let mut bits = BitVec::new();
        bits.resize(len, false);

        Bitmap(bits)
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().any(|b| *b > 1) {
            warn!("bitmap contains bytes other than 0 and 1; treating them as occupied");
        }

        Bitmap(bytes.iter().map(|b| *b != 0).collect())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().map(|bit| u8::from(*bit)).collect()
    }

    /// First-fit scan from index 0.
    pub fn find_free(&self) -> Option<usize> {
        self.0.first_zero()
    }

    pub fn mark(&mut self, index: usize, used: bool) {
        self.0.set(index, used);
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.0.get(index).is_some_and(|bit| *bit)
    }

    pub fn num_free(&self) -> usize {
        self.0.count_zeros()
    }
}
