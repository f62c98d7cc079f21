use super::memory::{Word, NIL};
use super::program::{MethodId, StackMethod};

/// One method activation.
///
/// `mem[0]` holds the receiver (`NIL` for functions); locals follow at
/// [`StackMethod::local_offset`].
#[derive(Debug, Clone)]
pub struct Frame {
    pub method: MethodId,
    pub ip: usize,
    pub mem: Vec<Word>,
}

impl Frame {
    pub fn new(method: &StackMethod, receiver: Word) -> Self {
        let mut mem = vec![NIL; method.frame_size().max(1)];
        mem[0] = receiver;
        Self {
            method: method.id,
            ip: 0,
            mem,
        }
    }

    pub fn receiver(&self) -> Word {
        self.mem.first().copied().unwrap_or(NIL)
    }
}
