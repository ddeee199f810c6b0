//! Call frames of the invocation stack.

use neo_core::UInt160;
use std::rc::Rc;

/// A single call frame: a script, an instruction pointer into it and the
/// memoized script hash. The evaluation and alternative stacks are shared
/// across frames and live on the VM itself.
#[derive(Clone)]
pub struct ExecutionContext {
    script: Rc<Vec<u8>>,
    /// Next byte to execute.
    pub ip: usize,
    /// Whether the script carries the dynamic-invoke property, for
    /// `APPCALL` with a stack-supplied target.
    pub dynamic_invoke: bool,
    script_hash: Option<UInt160>,
}

impl ExecutionContext {
    /// Creates a frame at the start of `script`.
    pub fn new(script: Rc<Vec<u8>>, dynamic_invoke: bool) -> Self {
        Self {
            script,
            ip: 0,
            dynamic_invoke,
            script_hash: None,
        }
    }

    /// The raw script bytes.
    pub fn script(&self) -> &[u8] {
        &self.script
    }

    /// A shared handle to the script, for frames created by `CALL`.
    pub fn script_rc(&self) -> Rc<Vec<u8>> {
        Rc::clone(&self.script)
    }

    /// The script hash of this frame, computed on first use.
    pub fn script_hash(&mut self) -> UInt160 {
        *self
            .script_hash
            .get_or_insert_with(|| UInt160::from_script(&self.script))
    }

    /// Reads the next byte and advances.
    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = self.script.get(self.ip).copied()?;
        self.ip += 1;
        Some(byte)
    }

    /// Reads `count` bytes and advances.
    pub fn read_bytes(&mut self, count: usize) -> Option<Vec<u8>> {
        let end = self.ip.checked_add(count)?;
        let slice = self.script.get(self.ip..end)?;
        self.ip = end;
        Some(slice.to_vec())
    }

    /// Reads a little-endian u16 and advances.
    pub fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.read_bytes(2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a little-endian u32 and advances.
    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_the_pointer() {
        let mut ctx = ExecutionContext::new(Rc::new(vec![0x01, 0x02, 0x03, 0x04]), false);
        assert_eq!(ctx.read_byte(), Some(0x01));
        assert_eq!(ctx.read_u16(), Some(0x0302));
        assert_eq!(ctx.read_byte(), Some(0x04));
        assert_eq!(ctx.read_byte(), None);
    }

    #[test]
    fn script_hash_is_memoized() {
        let mut ctx = ExecutionContext::new(Rc::new(vec![0x51]), false);
        assert_eq!(ctx.script_hash(), UInt160::from_script(&[0x51]));
    }
}
