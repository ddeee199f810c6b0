//! Emission of VM scripts.

use crate::{bigint_to_bytes, interop_name_to_id, OpCode, VmError, VmResult};
use neo_core::UInt160;
use num_bigint::BigInt;

/// Builds VM scripts opcode by opcode. Used by tests, by the native
/// contract framework and by the standard verification scripts.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the script built so far.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.script.clone()
    }

    /// Consumes the builder, returning the script.
    pub fn into_bytes(self) -> Vec<u8> {
        self.script
    }

    /// Emits a bare opcode.
    pub fn emit(&mut self, op: OpCode) -> &mut Self {
        self.script.push(op as u8);
        self
    }

    /// Emits an opcode followed by raw operand bytes.
    pub fn emit_with_operand(&mut self, op: OpCode, operand: &[u8]) -> &mut Self {
        self.script.push(op as u8);
        self.script.extend_from_slice(operand);
        self
    }

    /// Emits the shortest push for the given integer.
    pub fn emit_int(&mut self, value: i64) -> &mut Self {
        match value {
            -1 => self.emit(OpCode::PushM1),
            0 => self.emit(OpCode::Push0),
            1..=16 => {
                self.script.push(OpCode::Push1 as u8 + (value as u8 - 1));
                self
            }
            _ => {
                let bytes = bigint_to_bytes(&BigInt::from(value));
                self.emit_bytes(&bytes)
            }
        }
    }

    /// Emits a boolean push.
    pub fn emit_bool(&mut self, value: bool) -> &mut Self {
        if value {
            self.emit(OpCode::Push1)
        } else {
            self.emit(OpCode::Push0)
        }
    }

    /// Emits a data push, choosing between `PUSHBYTESn` and `PUSHDATAn`.
    pub fn emit_bytes(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len == 0 {
            return self.emit(OpCode::Push0);
        }
        if len <= 75 {
            self.script.push(len as u8);
        } else if len < 0x100 {
            self.script.push(OpCode::PushData1 as u8);
            self.script.push(len as u8);
        } else if len < 0x1_0000 {
            self.script.push(OpCode::PushData2 as u8);
            self.script.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.script.push(OpCode::PushData4 as u8);
            self.script.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.script.extend_from_slice(data);
        self
    }

    /// Emits a UTF-8 string push.
    pub fn emit_string(&mut self, value: &str) -> &mut Self {
        self.emit_bytes(value.as_bytes())
    }

    /// Emits a syscall by name.
    pub fn emit_syscall(&mut self, name: &str) -> &mut Self {
        debug_assert!(name.len() <= 252);
        self.script.push(OpCode::Syscall as u8);
        self.script.push(name.len() as u8);
        self.script.extend_from_slice(name.as_bytes());
        self
    }

    /// Emits a syscall by 32-bit identifier.
    pub fn emit_syscall_id(&mut self, id: u32) -> &mut Self {
        self.script.push(OpCode::Syscall as u8);
        self.script.push(4);
        self.script.extend_from_slice(&id.to_le_bytes());
        self
    }

    /// Emits a static or tail call to the script identified by `hash`.
    pub fn emit_appcall(&mut self, hash: UInt160, tail: bool) -> &mut Self {
        let op = if tail { OpCode::TailCall } else { OpCode::AppCall };
        let operand = hash.to_array();
        self.emit_with_operand(op, &operand)
    }

    /// Emits a jump-family opcode with a relative 16-bit offset.
    pub fn emit_jump(&mut self, op: OpCode, offset: i16) -> VmResult<&mut Self> {
        match op {
            OpCode::Jmp | OpCode::JmpIf | OpCode::JmpIfNot | OpCode::Call => {
                Ok(self.emit_with_operand(op, &offset.to_le_bytes()))
            }
            _ => Err(VmError::InvalidOperation(format!(
                "{op:?} is not a jump opcode"
            ))),
        }
    }
}

/// The dispatch identifier of `name`, as emitted by [`ScriptBuilder::emit_syscall`].
pub fn syscall_id(name: &str) -> u32 {
    interop_name_to_id(name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_use_dedicated_opcodes() {
        let mut b = ScriptBuilder::new();
        b.emit_int(-1).emit_int(0).emit_int(5).emit_int(16);
        assert_eq!(b.to_bytes(), vec![0x4f, 0x00, 0x55, 0x60]);
    }

    #[test]
    fn large_ints_are_pushed_as_bytes() {
        let mut b = ScriptBuilder::new();
        b.emit_int(100);
        assert_eq!(b.to_bytes(), vec![0x01, 100]);

        let mut b = ScriptBuilder::new();
        b.emit_int(0x1234);
        assert_eq!(b.to_bytes(), vec![0x02, 0x34, 0x12]);
    }

    #[test]
    fn pushdata_thresholds() {
        let mut b = ScriptBuilder::new();
        b.emit_bytes(&[0xaa; 75]);
        assert_eq!(b.to_bytes()[0], 75);

        let mut b = ScriptBuilder::new();
        b.emit_bytes(&[0xaa; 76]);
        assert_eq!(b.to_bytes()[0], OpCode::PushData1 as u8);
        assert_eq!(b.to_bytes()[1], 76);

        let mut b = ScriptBuilder::new();
        b.emit_bytes(&[0xaa; 0x100]);
        assert_eq!(b.to_bytes()[0], OpCode::PushData2 as u8);
    }

    #[test]
    fn syscall_encodes_name_length() {
        let mut b = ScriptBuilder::new();
        b.emit_syscall("Neo.Runtime.Log");
        let script = b.to_bytes();
        assert_eq!(script[0], OpCode::Syscall as u8);
        assert_eq!(script[1] as usize, "Neo.Runtime.Log".len());
        assert_eq!(&script[2..], b"Neo.Runtime.Log");
    }

    #[test]
    fn appcall_carries_the_hash_operand() {
        let hash = UInt160::from_script(b"target");
        let mut b = ScriptBuilder::new();
        b.emit_appcall(hash, false);
        let script = b.to_bytes();
        assert_eq!(script[0], OpCode::AppCall as u8);
        assert_eq!(&script[1..], hash.to_array());
    }
}
