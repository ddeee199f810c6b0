//! The execution engine.

use crate::context::ExecutionContext;
use crate::multisig::check_multisig;
use crate::opcode::OpCode;
use crate::stack_item::{bigint_width, MapKey, StackItem};
use crate::{
    interop_name_to_id, VmError, VmResult, GAS_RATIO, MAX_ARRAY_SIZE, MAX_BIGINT_BYTES,
    MAX_INVOCATION_STACK_SIZE, MAX_ITEM_SIZE, MAX_STACK_SIZE,
};
use neo_core::UInt160;
use neo_cryptography::{hash160, hash256, sha256, PublicKey};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Terminal and intermediate machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    /// Ready to execute.
    None,
    /// Ran to completion; the evaluation stack holds the results.
    Halt,
    /// Aborted; partial effects must be discarded by the host.
    Fault,
    /// Paused by a debugger.
    Break,
}

impl VmState {
    /// The conventional textual form recorded in execution results.
    pub fn as_str(self) -> &'static str {
        match self {
            VmState::None => "NONE",
            VmState::Halt => "HALT",
            VmState::Fault => "FAULT",
            VmState::Break => "BREAK",
        }
    }
}

/// An interop handler resolved by a getter: the function plus its price in
/// VM price units.
pub struct InteropFuncPrice {
    pub func: Rc<dyn Fn(&mut Vm) -> VmResult<()>>,
    pub price: i64,
}

/// Resolves a 32-bit syscall identifier to a handler. Getters are consulted
/// in registration order; the first hit wins.
pub type InteropGetter = Box<dyn Fn(u32) -> Option<InteropFuncPrice>>;

/// Resolves a script hash to `(script, has_dynamic_invoke)` for `APPCALL`.
pub type ScriptGetter = Box<dyn Fn(UInt160) -> Option<(Vec<u8>, bool)>>;

/// The Neo 2 virtual machine.
///
/// One instance executes one invocation; instances are never shared across
/// threads. Faults raised by scripts or interop handlers are contained:
/// [`Vm::execute`] always returns with the machine in `HALT` or `FAULT`.
pub struct Vm {
    estack: Vec<StackItem>,
    astack: Vec<StackItem>,
    istack: Vec<ExecutionContext>,
    state: VmState,
    gas_consumed: i64,
    gas_limit: Option<i64>,
    checked_hash: Option<[u8; 32]>,
    getters: Vec<InteropGetter>,
    script_getter: Option<ScriptGetter>,
    fault_reason: Option<VmError>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Creates an idle machine with no gas limit.
    pub fn new() -> Self {
        Self {
            estack: Vec::new(),
            astack: Vec::new(),
            istack: Vec::new(),
            state: VmState::None,
            gas_consumed: 0,
            gas_limit: None,
            checked_hash: None,
            getters: Vec::new(),
            script_getter: None,
            fault_reason: None,
        }
    }

    /// Loads `script` as a new top frame. The entry script of an invocation
    /// is loaded with `dynamic_invoke` set, deployed scripts carry the flag
    /// from their contract state.
    pub fn load_script(&mut self, script: Vec<u8>, dynamic_invoke: bool) {
        self.istack
            .push(ExecutionContext::new(Rc::new(script), dynamic_invoke));
    }

    /// Registers an interop getter; getters are consulted in registration
    /// order.
    pub fn register_interop_getter(&mut self, getter: InteropGetter) {
        self.getters.push(getter);
    }

    /// Sets the resolver used by `APPCALL`/`TAILCALL`.
    pub fn set_script_getter(&mut self, getter: ScriptGetter) {
        self.script_getter = Some(getter);
    }

    /// Sets the gas limit, in fixed-point units.
    pub fn set_gas_limit(&mut self, limit: Option<i64>) {
        self.gas_limit = limit;
    }

    /// Gas consumed so far, in fixed-point units. Preserved across faults.
    pub fn gas_consumed(&self) -> i64 {
        self.gas_consumed
    }

    /// Sets the message hash checked by `CHECKSIG`/`CHECKMULTISIG`.
    pub fn set_checked_hash(&mut self, hash: [u8; 32]) {
        self.checked_hash = Some(hash);
    }

    /// The current machine state.
    pub fn state(&self) -> VmState {
        self.state
    }

    /// The error that faulted the machine, if any.
    pub fn fault_reason(&self) -> Option<&VmError> {
        self.fault_reason.as_ref()
    }

    /// The evaluation stack, bottom to top.
    pub fn estack(&self) -> &[StackItem] {
        &self.estack
    }

    /// The script hash of the executing frame.
    pub fn current_script_hash(&mut self) -> Option<UInt160> {
        self.istack.last_mut().map(ExecutionContext::script_hash)
    }

    /// The script hash of the frame `depth` levels below the executing one.
    pub fn script_hash_at(&mut self, depth: usize) -> Option<UInt160> {
        let len = self.istack.len();
        let index = len.checked_sub(1 + depth)?;
        self.istack.get_mut(index).map(ExecutionContext::script_hash)
    }

    /// The script hash of the bottom (entry) frame.
    pub fn entry_script_hash(&mut self) -> Option<UInt160> {
        self.istack.first_mut().map(ExecutionContext::script_hash)
    }

    /// Pushes onto the evaluation stack, enforcing the depth limit.
    pub fn push(&mut self, item: StackItem) -> VmResult<()> {
        if self.estack.len() + self.astack.len() >= MAX_STACK_SIZE {
            return Err(VmError::StackOverflow {
                limit: MAX_STACK_SIZE,
            });
        }
        self.estack.push(item);
        Ok(())
    }

    /// Pops from the evaluation stack.
    pub fn pop(&mut self) -> VmResult<StackItem> {
        self.estack.pop().ok_or(VmError::StackUnderflow)
    }

    /// Peeks `depth` items below the top without removing.
    pub fn peek(&self, depth: usize) -> VmResult<&StackItem> {
        let len = self.estack.len();
        len.checked_sub(1 + depth)
            .and_then(|i| self.estack.get(i))
            .ok_or(VmError::StackUnderflow)
    }

    /// Pops and converts to an integer.
    pub fn pop_bigint(&mut self) -> VmResult<BigInt> {
        self.pop()?.to_bigint()
    }

    /// Pops and converts to an index-sized integer.
    pub fn pop_index(&mut self) -> VmResult<i64> {
        self.pop_bigint()?
            .to_i64()
            .ok_or_else(|| VmError::InvalidConversion("index does not fit in 64 bits".into()))
    }

    /// Pops and converts to bytes.
    pub fn pop_bytes(&mut self) -> VmResult<Vec<u8>> {
        self.pop()?.to_bytes()
    }

    /// Pops and converts to a boolean.
    pub fn pop_bool(&mut self) -> VmResult<bool> {
        Ok(self.pop()?.to_bool())
    }

    /// Pops signature-like elements: either a single array of byte strings
    /// or a count followed by that many byte strings.
    pub fn pop_sig_elements(&mut self) -> VmResult<Vec<Vec<u8>>> {
        let top = self.pop()?;
        match &top {
            StackItem::Array(_) | StackItem::Struct(_) => top
                .to_vec()?
                .iter()
                .map(StackItem::to_bytes)
                .collect::<VmResult<Vec<_>>>(),
            _ => {
                let count = top
                    .to_bigint()?
                    .to_usize()
                    .ok_or_else(|| VmError::InvalidConversion("bad element count".into()))?;
                if count > self.estack.len() {
                    return Err(VmError::StackUnderflow);
                }
                let mut elements = Vec::with_capacity(count);
                for _ in 0..count {
                    elements.push(self.pop_bytes()?);
                }
                Ok(elements)
            }
        }
    }

    fn add_gas(&mut self, price_units: i64) -> VmResult<()> {
        self.gas_consumed = self
            .gas_consumed
            .checked_add(price_units.saturating_mul(GAS_RATIO))
            .ok_or(VmError::GasLimitExceeded)?;
        if let Some(limit) = self.gas_limit {
            if self.gas_consumed > limit {
                return Err(VmError::GasLimitExceeded);
            }
        }
        Ok(())
    }

    fn check_integer(value: &BigInt) -> VmResult<()> {
        if bigint_width(value) > MAX_BIGINT_BYTES {
            return Err(VmError::IntegerTooWide);
        }
        Ok(())
    }

    /// Runs until the machine halts or faults. Never panics: script and
    /// handler failures of any kind end in `FAULT` with gas preserved.
    pub fn execute(&mut self) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            while self.state == VmState::None {
                if let Err(err) = self.step() {
                    self.fault_reason = Some(err);
                    self.state = VmState::Fault;
                }
            }
        }));
        if outcome.is_err() {
            self.fault_reason = Some(VmError::InteropFault("panic in handler".into()));
            self.state = VmState::Fault;
        }
    }

    /// Executes a single instruction.
    fn step(&mut self) -> VmResult<()> {
        let Some(context) = self.istack.last_mut() else {
            self.state = VmState::Halt;
            return Ok(());
        };
        // Running off the end of a script is an implicit RET.
        let instruction_start = context.ip;
        let Some(opcode_byte) = context.read_byte() else {
            return self.op_ret();
        };

        // PUSHBYTES1..=PUSHBYTES75 carry their length in the opcode byte.
        if (0x01..=0x4b).contains(&opcode_byte) {
            let data = self
                .istack
                .last_mut()
                .and_then(|c| c.read_bytes(opcode_byte as usize))
                .ok_or(VmError::BadOffset(instruction_start as isize))?;
            self.add_gas(0)?;
            return self.push(StackItem::ByteArray(data));
        }

        let op = OpCode::from_byte(opcode_byte).ok_or(VmError::InvalidOpcode {
            opcode: opcode_byte,
        })?;
        if !matches!(op, OpCode::Syscall | OpCode::CheckMultisig) {
            self.add_gas(op.price())?;
        }
        self.dispatch(op, instruction_start)
    }

    fn dispatch(&mut self, op: OpCode, instruction_start: usize) -> VmResult<()> {
        use OpCode::*;
        match op {
            Push0 => self.push(StackItem::ByteArray(Vec::new())),
            PushData1 | PushData2 | PushData4 => self.op_pushdata(op, instruction_start),
            PushM1 => self.push(StackItem::integer(-1)),
            Push1 | Push2 | Push3 | Push4 | Push5 | Push6 | Push7 | Push8 | Push9 | Push10
            | Push11 | Push12 | Push13 | Push14 | Push15 | Push16 => {
                let value = op as u8 - OpCode::Push1 as u8 + 1;
                self.push(StackItem::integer(value))
            }

            Nop => Ok(()),
            Jmp | JmpIf | JmpIfNot => self.op_jump(op, instruction_start),
            Call => self.op_call(instruction_start),
            Ret => self.op_ret(),
            AppCall | TailCall => self.op_appcall(op == TailCall),
            Syscall => self.op_syscall(),

            DupFromAltStack => {
                let item = self.astack.last().cloned().ok_or(VmError::StackUnderflow)?;
                self.push(item)
            }
            ToAltStack => {
                let item = self.pop()?;
                if self.estack.len() + self.astack.len() >= MAX_STACK_SIZE {
                    return Err(VmError::StackOverflow {
                        limit: MAX_STACK_SIZE,
                    });
                }
                self.astack.push(item);
                Ok(())
            }
            FromAltStack => {
                let item = self.astack.pop().ok_or(VmError::StackUnderflow)?;
                self.push(item)
            }
            XDrop => {
                let depth = self.pop_non_negative_index()?;
                let position = self.position_from_top(depth)?;
                self.estack.remove(position);
                Ok(())
            }
            XSwap => {
                let depth = self.pop_non_negative_index()?;
                let position = self.position_from_top(depth)?;
                let top = self.estack.len() - 1;
                self.estack.swap(position, top);
                Ok(())
            }
            XTuck => {
                let depth = self.pop_non_negative_index()?;
                let top = self.peek(0)?.clone();
                let position = self.position_from_top(depth)?;
                self.estack.insert(position, top);
                Ok(())
            }
            Depth => {
                let depth = self.estack.len();
                self.push(StackItem::integer(depth as u64))
            }
            Drop => self.pop().map(drop),
            Dup => {
                let top = self.peek(0)?.clone();
                self.push(top)
            }
            Nip => {
                let top = self.pop()?;
                self.pop()?;
                self.push(top)
            }
            Over => {
                let second = self.peek(1)?.clone();
                self.push(second)
            }
            Pick => {
                let depth = self.pop_non_negative_index()?;
                let item = self.peek(depth)?.clone();
                self.push(item)
            }
            Roll => {
                let depth = self.pop_non_negative_index()?;
                let position = self.position_from_top(depth)?;
                let item = self.estack.remove(position);
                self.push(item)
            }
            Rot => {
                let position = self.position_from_top(2)?;
                let item = self.estack.remove(position);
                self.push(item)
            }
            Swap => {
                let len = self.estack.len();
                if len < 2 {
                    return Err(VmError::StackUnderflow);
                }
                self.estack.swap(len - 1, len - 2);
                Ok(())
            }
            Tuck => {
                let top = self.peek(0)?.clone();
                let position = self.position_from_top(1)?;
                self.estack.insert(position, top);
                Ok(())
            }

            Cat => {
                let b = self.pop_bytes()?;
                let mut a = self.pop_bytes()?;
                if a.len() + b.len() > MAX_ITEM_SIZE {
                    return Err(VmError::ItemTooLarge);
                }
                a.extend_from_slice(&b);
                self.push(StackItem::ByteArray(a))
            }
            SubStr => {
                let count = self.pop_non_negative_index()?;
                let start = self.pop_non_negative_index()?;
                let bytes = self.pop_bytes()?;
                let end = start
                    .checked_add(count)
                    .filter(|&e| e <= bytes.len())
                    .ok_or_else(|| VmError::InvalidOperation("substring out of range".into()))?;
                self.push(StackItem::ByteArray(bytes[start..end].to_vec()))
            }
            Left => {
                let count = self.pop_non_negative_index()?;
                let bytes = self.pop_bytes()?;
                if count > bytes.len() {
                    return Err(VmError::InvalidOperation("LEFT count out of range".into()));
                }
                self.push(StackItem::ByteArray(bytes[..count].to_vec()))
            }
            Right => {
                let count = self.pop_non_negative_index()?;
                let bytes = self.pop_bytes()?;
                if count > bytes.len() {
                    return Err(VmError::InvalidOperation("RIGHT count out of range".into()));
                }
                self.push(StackItem::ByteArray(bytes[bytes.len() - count..].to_vec()))
            }
            Size => {
                let len = self.pop_bytes()?.len();
                self.push(StackItem::integer(len as u64))
            }

            Invert => {
                let value = self.pop_bigint()?;
                self.push(StackItem::Integer(!value))
            }
            And => self.binary_int_op(|a, b| Ok(a & b)),
            Or => self.binary_int_op(|a, b| Ok(a | b)),
            Xor => self.binary_int_op(|a, b| Ok(a ^ b)),
            Equal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(StackItem::Bool(a.equals(&b)))
            }

            Inc => self.unary_int_op(|a| Ok(a + 1)),
            Dec => self.unary_int_op(|a| Ok(a - 1)),
            Sign => {
                let value = self.pop_bigint()?;
                let sign = match value.sign() {
                    num_bigint::Sign::Minus => -1,
                    num_bigint::Sign::NoSign => 0,
                    num_bigint::Sign::Plus => 1,
                };
                self.push(StackItem::integer(sign))
            }
            Negate => self.unary_int_op(|a| Ok(-a)),
            Abs => self.unary_int_op(|a| Ok(a.abs())),
            Not => {
                let value = self.pop_bool()?;
                self.push(StackItem::Bool(!value))
            }
            Nz => {
                let value = self.pop_bigint()?;
                self.push(StackItem::Bool(!value.is_zero()))
            }
            Add => self.binary_int_op(|a, b| Ok(a + b)),
            Sub => self.binary_int_op(|a, b| Ok(a - b)),
            Mul => self.binary_int_op(|a, b| Ok(a * b)),
            Div => self.binary_int_op(|a, b| {
                if b.is_zero() {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            }),
            Mod => self.binary_int_op(|a, b| {
                if b.is_zero() {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(a % b)
                }
            }),
            Shl => self.op_shift(true),
            Shr => self.op_shift(false),
            BoolAnd => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(StackItem::Bool(a && b))
            }
            BoolOr => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(StackItem::Bool(a || b))
            }
            NumEqual => self.compare_op(|a, b| a == b),
            NumNotEqual => self.compare_op(|a, b| a != b),
            Lt => self.compare_op(|a, b| a < b),
            Gt => self.compare_op(|a, b| a > b),
            Lte => self.compare_op(|a, b| a <= b),
            Gte => self.compare_op(|a, b| a >= b),
            Min => self.binary_int_op(|a, b| Ok(a.min(b))),
            Max => self.binary_int_op(|a, b| Ok(a.max(b))),
            Within => {
                let upper = self.pop_bigint()?;
                let lower = self.pop_bigint()?;
                let value = self.pop_bigint()?;
                self.push(StackItem::Bool(lower <= value && value < upper))
            }

            Sha256 => {
                let data = self.pop_bytes()?;
                self.push(StackItem::byte_array(sha256(&data).to_vec()))
            }
            Hash160 => {
                let data = self.pop_bytes()?;
                self.push(StackItem::byte_array(hash160(&data).to_vec()))
            }
            Hash256 => {
                let data = self.pop_bytes()?;
                self.push(StackItem::byte_array(hash256(&data).to_vec()))
            }
            CheckSig => {
                let key_bytes = self.pop_bytes()?;
                let signature = self.pop_bytes()?;
                let hash = self.checked_hash.ok_or(VmError::NoCheckedHash)?;
                let result = PublicKey::from_bytes(&key_bytes)
                    .map(|key| key.verify(&signature, &hash))
                    .unwrap_or(false);
                self.push(StackItem::Bool(result))
            }
            Verify => {
                let key_bytes = self.pop_bytes()?;
                let signature = self.pop_bytes()?;
                let message = self.pop_bytes()?;
                let result = PublicKey::from_bytes(&key_bytes)
                    .map(|key| key.verify(&signature, &sha256(&message)))
                    .unwrap_or(false);
                self.push(StackItem::Bool(result))
            }
            CheckMultisig => self.op_checkmultisig(),

            ArraySize => {
                let item = self.pop()?;
                let size = match &item {
                    StackItem::Array(items) | StackItem::Struct(items) => items.borrow().len(),
                    StackItem::Map(map) => map.borrow().len(),
                    other => other.to_bytes()?.len(),
                };
                self.push(StackItem::integer(size as u64))
            }
            Pack => {
                let count = self.pop_non_negative_index()?;
                if count > MAX_ARRAY_SIZE {
                    return Err(VmError::ItemTooLarge);
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.pop()?);
                }
                self.push(StackItem::array(items))
            }
            Unpack => {
                let items = self.pop()?.to_vec()?;
                let count = items.len();
                for item in items.into_iter().rev() {
                    self.push(item)?;
                }
                self.push(StackItem::integer(count as u64))
            }
            PickItem => self.op_pickitem(),
            SetItem => self.op_setitem(),
            NewArray => self.op_newcompound(false),
            NewStruct => self.op_newcompound(true),
            NewMap => self.push(StackItem::map()),
            Append => {
                let value = self.pop()?.clone_for_assignment();
                let collection = self.pop()?;
                let items = collection.as_compound()?;
                if items.borrow().len() >= MAX_ARRAY_SIZE {
                    return Err(VmError::ItemTooLarge);
                }
                items.borrow_mut().push(value);
                Ok(())
            }
            Reverse => {
                let collection = self.pop()?;
                collection.as_compound()?.borrow_mut().reverse();
                Ok(())
            }
            Remove => {
                let key = self.pop()?;
                let collection = self.pop()?;
                match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let index = key
                            .to_bigint()?
                            .to_usize()
                            .ok_or_else(|| VmError::InvalidOperation("bad index".into()))?;
                        let mut items = items.borrow_mut();
                        if index >= items.len() {
                            return Err(VmError::InvalidOperation("REMOVE out of range".into()));
                        }
                        items.remove(index);
                        Ok(())
                    }
                    StackItem::Map(map) => {
                        map.borrow_mut().remove(&MapKey::from_item(&key)?);
                        Ok(())
                    }
                    other => Err(VmError::InvalidConversion(format!(
                        "cannot REMOVE from {}",
                        other.type_name()
                    ))),
                }
            }
            HasKey => {
                let key = self.pop()?;
                let collection = self.pop()?;
                let result = match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let index = key.to_bigint()?;
                        if index.is_negative() {
                            return Err(VmError::InvalidOperation("negative index".into()));
                        }
                        index < BigInt::from(items.borrow().len())
                    }
                    StackItem::Map(map) => map.borrow().contains_key(&MapKey::from_item(&key)?),
                    other => {
                        return Err(VmError::InvalidConversion(format!(
                            "cannot HASKEY on {}",
                            other.type_name()
                        )))
                    }
                };
                self.push(StackItem::Bool(result))
            }
            Keys => {
                let collection = self.pop()?;
                let StackItem::Map(map) = &collection else {
                    return Err(VmError::InvalidConversion("KEYS expects a map".into()));
                };
                let keys = map.borrow().keys().map(MapKey::to_item).collect();
                self.push(StackItem::array(keys))
            }
            Values => {
                let collection = self.pop()?;
                let values: Vec<StackItem> = match &collection {
                    StackItem::Array(items) | StackItem::Struct(items) => items
                        .borrow()
                        .iter()
                        .map(StackItem::clone_for_assignment)
                        .collect(),
                    StackItem::Map(map) => map
                        .borrow()
                        .values()
                        .map(StackItem::clone_for_assignment)
                        .collect(),
                    other => {
                        return Err(VmError::InvalidConversion(format!(
                            "cannot VALUES on {}",
                            other.type_name()
                        )))
                    }
                };
                self.push(StackItem::array(values))
            }

            Throw => Err(VmError::Throw),
            ThrowIfNot => {
                if self.pop_bool()? {
                    Ok(())
                } else {
                    Err(VmError::Throw)
                }
            }
        }
    }

    fn pop_non_negative_index(&mut self) -> VmResult<usize> {
        let value = self.pop_index()?;
        usize::try_from(value)
            .map_err(|_| VmError::InvalidOperation("negative stack index".into()))
    }

    fn position_from_top(&self, depth: usize) -> VmResult<usize> {
        self.estack
            .len()
            .checked_sub(1 + depth)
            .ok_or(VmError::StackUnderflow)
    }

    fn unary_int_op(
        &mut self,
        op: impl FnOnce(BigInt) -> VmResult<BigInt>,
    ) -> VmResult<()> {
        let a = self.pop_bigint()?;
        Self::check_integer(&a)?;
        let result = op(a)?;
        Self::check_integer(&result)?;
        self.push(StackItem::Integer(result))
    }

    fn binary_int_op(
        &mut self,
        op: impl FnOnce(BigInt, BigInt) -> VmResult<BigInt>,
    ) -> VmResult<()> {
        let b = self.pop_bigint()?;
        let a = self.pop_bigint()?;
        Self::check_integer(&a)?;
        Self::check_integer(&b)?;
        let result = op(a, b)?;
        Self::check_integer(&result)?;
        self.push(StackItem::Integer(result))
    }

    fn compare_op(&mut self, op: impl FnOnce(&BigInt, &BigInt) -> bool) -> VmResult<()> {
        let b = self.pop_bigint()?;
        let a = self.pop_bigint()?;
        self.push(StackItem::Bool(op(&a, &b)))
    }

    fn op_shift(&mut self, left: bool) -> VmResult<()> {
        let shift = self.pop_index()?;
        let value = self.pop_bigint()?;
        if !(0..=256).contains(&shift) {
            return Err(VmError::InvalidOperation("shift out of range".into()));
        }
        let result = if left {
            value << shift as usize
        } else {
            value >> shift as usize
        };
        Self::check_integer(&result)?;
        self.push(StackItem::Integer(result))
    }

    fn op_pushdata(&mut self, op: OpCode, instruction_start: usize) -> VmResult<()> {
        let context = self.istack.last_mut().ok_or(VmError::StackUnderflow)?;
        let len = match op {
            OpCode::PushData1 => context.read_byte().map(usize::from),
            OpCode::PushData2 => context.read_u16().map(usize::from),
            OpCode::PushData4 => context.read_u32().map(|v| v as usize),
            _ => unreachable!("not a PUSHDATA opcode"),
        }
        .ok_or(VmError::BadOffset(instruction_start as isize))?;
        if len > MAX_ITEM_SIZE {
            return Err(VmError::ItemTooLarge);
        }
        let data = self
            .istack
            .last_mut()
            .and_then(|c| c.read_bytes(len))
            .ok_or(VmError::BadOffset(instruction_start as isize))?;
        self.push(StackItem::ByteArray(data))
    }

    fn jump_target(
        context: &ExecutionContext,
        instruction_start: usize,
        offset: i16,
    ) -> VmResult<usize> {
        let target = instruction_start as isize + offset as isize;
        if target < 0 || target as usize > context.script().len() {
            return Err(VmError::BadOffset(target));
        }
        Ok(target as usize)
    }

    fn op_jump(&mut self, op: OpCode, instruction_start: usize) -> VmResult<()> {
        let offset = {
            let context = self.istack.last_mut().ok_or(VmError::StackUnderflow)?;
            context
                .read_u16()
                .ok_or(VmError::BadOffset(instruction_start as isize))? as i16
        };
        let take = match op {
            OpCode::Jmp => true,
            OpCode::JmpIf => self.pop_bool()?,
            OpCode::JmpIfNot => !self.pop_bool()?,
            _ => unreachable!("not a jump opcode"),
        };
        if take {
            let context = self.istack.last_mut().ok_or(VmError::StackUnderflow)?;
            context.ip = Self::jump_target(context, instruction_start, offset)?;
        }
        Ok(())
    }

    fn op_call(&mut self, instruction_start: usize) -> VmResult<()> {
        if self.istack.len() >= MAX_INVOCATION_STACK_SIZE {
            return Err(VmError::StackOverflow {
                limit: MAX_INVOCATION_STACK_SIZE,
            });
        }
        let context = self.istack.last_mut().ok_or(VmError::StackUnderflow)?;
        let offset = context
            .read_u16()
            .ok_or(VmError::BadOffset(instruction_start as isize))? as i16;
        let target = Self::jump_target(context, instruction_start, offset)?;
        let mut frame = ExecutionContext::new(context.script_rc(), context.dynamic_invoke);
        frame.ip = target;
        self.istack.push(frame);
        Ok(())
    }

    fn op_ret(&mut self) -> VmResult<()> {
        self.istack.pop();
        if self.istack.is_empty() {
            self.state = VmState::Halt;
        }
        Ok(())
    }

    fn op_appcall(&mut self, tail: bool) -> VmResult<()> {
        if self.istack.len() >= MAX_INVOCATION_STACK_SIZE {
            return Err(VmError::StackOverflow {
                limit: MAX_INVOCATION_STACK_SIZE,
            });
        }
        let (operand, dynamic_caller) = {
            let context = self.istack.last_mut().ok_or(VmError::StackUnderflow)?;
            (
                context.read_bytes(20).ok_or(VmError::BadOffset(0))?,
                context.dynamic_invoke,
            )
        };
        let hash = if operand.iter().all(|&b| b == 0) {
            // Dynamic target supplied on the stack.
            if !dynamic_caller {
                return Err(VmError::DynamicInvokeForbidden);
            }
            let bytes = self.pop_bytes()?;
            UInt160::from_bytes(&bytes)
                .map_err(|e| VmError::InvalidConversion(e.to_string()))?
        } else {
            UInt160::from_bytes(&operand)
                .map_err(|e| VmError::InvalidConversion(e.to_string()))?
        };

        let getter = self.script_getter.as_ref().ok_or(VmError::UnknownScript)?;
        let (script, dynamic_invoke) = getter(hash).ok_or(VmError::UnknownScript)?;
        if tail {
            self.istack.pop();
        }
        self.istack
            .push(ExecutionContext::new(Rc::new(script), dynamic_invoke));
        Ok(())
    }

    fn op_syscall(&mut self) -> VmResult<()> {
        let operand = {
            let context = self.istack.last_mut().ok_or(VmError::StackUnderflow)?;
            let len = context.read_byte().ok_or(VmError::BadOffset(0))? as usize;
            context.read_bytes(len).ok_or(VmError::BadOffset(0))?
        };
        let id = if operand.len() == 4 {
            u32::from_le_bytes([operand[0], operand[1], operand[2], operand[3]])
        } else {
            interop_name_to_id(&operand)
        };

        let resolved = self.getters.iter().find_map(|getter| getter(id));
        let Some(InteropFuncPrice { func, price }) = resolved else {
            return Err(VmError::UnknownInterop { id });
        };
        self.add_gas(price)?;
        (func.as_ref())(self)
    }

    fn op_checkmultisig(&mut self) -> VmResult<()> {
        let key_bytes = self.pop_sig_elements()?;
        self.add_gas(100 * key_bytes.len() as i64)?;
        let signatures = self.pop_sig_elements()?;
        let hash = self.checked_hash.ok_or(VmError::NoCheckedHash)?;

        let mut keys = Vec::with_capacity(key_bytes.len());
        for bytes in &key_bytes {
            keys.push(
                PublicKey::from_bytes(bytes)
                    .map_err(|e| VmError::InvalidConversion(e.to_string()))?,
            );
        }
        let result = check_multisig(&hash, &keys, &signatures)?;
        self.push(StackItem::Bool(result))
    }

    fn op_pickitem(&mut self) -> VmResult<()> {
        let key = self.pop()?;
        let collection = self.pop()?;
        let value = match &collection {
            StackItem::Array(items) | StackItem::Struct(items) => {
                let index = key
                    .to_bigint()?
                    .to_usize()
                    .ok_or_else(|| VmError::InvalidOperation("bad index".into()))?;
                let items = items.borrow();
                items
                    .get(index)
                    .cloned()
                    .ok_or_else(|| VmError::InvalidOperation("PICKITEM out of range".into()))?
            }
            StackItem::Map(map) => map
                .borrow()
                .get(&MapKey::from_item(&key)?)
                .cloned()
                .ok_or_else(|| VmError::InvalidOperation("key not found".into()))?,
            other => {
                return Err(VmError::InvalidConversion(format!(
                    "cannot PICKITEM on {}",
                    other.type_name()
                )))
            }
        };
        self.push(value)
    }

    fn op_setitem(&mut self) -> VmResult<()> {
        let value = self.pop()?.clone_for_assignment();
        let key = self.pop()?;
        let collection = self.pop()?;
        match &collection {
            StackItem::Array(items) | StackItem::Struct(items) => {
                let index = key
                    .to_bigint()?
                    .to_usize()
                    .ok_or_else(|| VmError::InvalidOperation("bad index".into()))?;
                let mut items = items.borrow_mut();
                if index >= items.len() {
                    return Err(VmError::InvalidOperation("SETITEM out of range".into()));
                }
                items[index] = value;
                Ok(())
            }
            StackItem::Map(map) => {
                let mut map = map.borrow_mut();
                if map.len() >= MAX_ARRAY_SIZE {
                    return Err(VmError::ItemTooLarge);
                }
                map.insert(MapKey::from_item(&key)?, value);
                Ok(())
            }
            other => Err(VmError::InvalidConversion(format!(
                "cannot SETITEM on {}",
                other.type_name()
            ))),
        }
    }

    fn op_newcompound(&mut self, as_struct: bool) -> VmResult<()> {
        let top = self.pop()?;
        let items: Vec<StackItem> = match &top {
            // Converting between array and struct copies the elements.
            StackItem::Array(items) | StackItem::Struct(items) => items.borrow().clone(),
            _ => {
                let count = top
                    .to_bigint()?
                    .to_usize()
                    .ok_or_else(|| VmError::InvalidOperation("bad element count".into()))?;
                if count > MAX_ARRAY_SIZE {
                    return Err(VmError::ItemTooLarge);
                }
                vec![StackItem::Bool(false); count]
            }
        };
        if as_struct {
            self.push(StackItem::struct_item(items))
        } else {
            self.push(StackItem::array(items))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptBuilder;

    fn run(script: Vec<u8>) -> Vm {
        let mut vm = Vm::new();
        vm.load_script(script, true);
        vm.execute();
        vm
    }

    #[test]
    fn add_two_numbers() {
        let mut b = ScriptBuilder::new();
        b.emit_int(14).emit_int(28).emit(OpCode::Add);
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Halt);
        assert_eq!(vm.estack().len(), 1);
        assert_eq!(vm.estack()[0].to_bigint().unwrap(), BigInt::from(42));
    }

    #[test]
    fn division_by_zero_faults() {
        let mut b = ScriptBuilder::new();
        b.emit_int(1).emit_int(0).emit(OpCode::Div);
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Fault);
        assert_eq!(vm.fault_reason(), Some(&VmError::DivisionByZero));
    }

    #[test]
    fn push0_is_empty_byte_array() {
        let mut b = ScriptBuilder::new();
        b.emit(OpCode::Push0);
        let vm = run(b.into_bytes());
        assert_eq!(vm.estack()[0].to_bytes().unwrap(), Vec::<u8>::new());
        assert!(!vm.estack()[0].to_bool());
    }

    #[test]
    fn jmpif_takes_the_branch() {
        // PUSH1, JMPIF +4 (skip PUSH2), PUSH3
        let mut b = ScriptBuilder::new();
        b.emit_int(1);
        b.emit_jump(OpCode::JmpIf, 4).unwrap();
        b.emit_int(2);
        b.emit_int(3);
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Halt);
        assert_eq!(vm.estack().len(), 1);
        assert_eq!(vm.estack()[0].to_bigint().unwrap(), BigInt::from(3));
    }

    #[test]
    fn alt_stack_round_trip() {
        let mut b = ScriptBuilder::new();
        b.emit_int(7)
            .emit(OpCode::ToAltStack)
            .emit(OpCode::DupFromAltStack)
            .emit(OpCode::FromAltStack)
            .emit(OpCode::Add);
        let vm = run(b.into_bytes());
        assert_eq!(vm.estack()[0].to_bigint().unwrap(), BigInt::from(14));
    }

    #[test]
    fn pack_orders_items_top_first() {
        let mut b = ScriptBuilder::new();
        b.emit_int(14).emit_int(28).emit_int(2).emit(OpCode::Pack);
        let vm = run(b.into_bytes());
        let items = vm.estack()[0].to_vec().unwrap();
        assert_eq!(items[0].to_bigint().unwrap(), BigInt::from(28));
        assert_eq!(items[1].to_bigint().unwrap(), BigInt::from(14));
    }

    #[test]
    fn setitem_on_struct_copies_values() {
        // Build a struct of size 1, set [0] = 5, read it back.
        let mut b = ScriptBuilder::new();
        b.emit_int(1)
            .emit(OpCode::NewStruct)
            .emit(OpCode::Dup)
            .emit_int(0)
            .emit_int(5)
            .emit(OpCode::SetItem)
            .emit_int(0)
            .emit(OpCode::PickItem);
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Halt);
        assert_eq!(vm.estack()[0].to_bigint().unwrap(), BigInt::from(5));
    }

    #[test]
    fn append_mutates_the_shared_array() {
        let mut b = ScriptBuilder::new();
        b.emit_int(0)
            .emit(OpCode::NewArray)
            .emit(OpCode::Dup)
            .emit_int(9)
            .emit(OpCode::Append)
            .emit(OpCode::ArraySize);
        let vm = run(b.into_bytes());
        assert_eq!(vm.estack()[0].to_bigint().unwrap(), BigInt::from(1));
    }

    #[test]
    fn map_set_get_haskey() {
        let mut b = ScriptBuilder::new();
        b.emit(OpCode::NewMap)
            .emit(OpCode::Dup)
            .emit_string("k")
            .emit_int(11)
            .emit(OpCode::SetItem)
            .emit(OpCode::Dup)
            .emit_string("k")
            .emit(OpCode::PickItem)
            .emit(OpCode::ToAltStack)
            .emit_string("missing")
            .emit(OpCode::HasKey);
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Halt);
        assert!(!vm.estack()[0].to_bool());
    }

    #[test]
    fn throw_and_throwifnot() {
        let mut b = ScriptBuilder::new();
        b.emit(OpCode::Throw);
        assert_eq!(run(b.into_bytes()).state(), VmState::Fault);

        let mut b = ScriptBuilder::new();
        b.emit_int(1).emit(OpCode::ThrowIfNot).emit_int(2);
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Halt);
        assert_eq!(vm.estack().len(), 1);
    }

    #[test]
    fn gas_limit_faults_but_preserves_consumption() {
        let mut b = ScriptBuilder::new();
        for _ in 0..10 {
            b.emit_int(1).emit_int(1).emit(OpCode::Add).emit(OpCode::Drop);
        }
        let mut vm = Vm::new();
        vm.set_gas_limit(Some(3 * GAS_RATIO));
        vm.load_script(b.into_bytes(), true);
        vm.execute();
        assert_eq!(vm.state(), VmState::Fault);
        assert_eq!(vm.fault_reason(), Some(&VmError::GasLimitExceeded));
        assert!(vm.gas_consumed() > 3 * GAS_RATIO);
    }

    #[test]
    fn syscall_dispatches_through_registered_getter() {
        let name = "Test.Echo.FortyTwo";
        let id = interop_name_to_id(name.as_bytes());
        let mut vm = Vm::new();
        vm.register_interop_getter(Box::new(move |requested| {
            if requested == id {
                Some(InteropFuncPrice {
                    func: Rc::new(|vm: &mut Vm| vm.push(StackItem::integer(42))),
                    price: 1,
                })
            } else {
                None
            }
        }));
        let mut b = ScriptBuilder::new();
        b.emit_syscall(name);
        vm.load_script(b.into_bytes(), true);
        vm.execute();
        assert_eq!(vm.state(), VmState::Halt);
        assert_eq!(vm.estack()[0].to_bigint().unwrap(), BigInt::from(42));
    }

    #[test]
    fn unknown_syscall_faults() {
        let mut b = ScriptBuilder::new();
        b.emit_syscall("No.Such.Interop");
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Fault);
        assert!(matches!(
            vm.fault_reason(),
            Some(VmError::UnknownInterop { .. })
        ));
    }

    #[test]
    fn appcall_resolves_through_script_getter() {
        let mut callee = ScriptBuilder::new();
        callee.emit_int(5).emit_int(6).emit(OpCode::Mul);
        let callee_script = callee.into_bytes();
        let callee_hash = UInt160::from_script(&callee_script);

        let mut vm = Vm::new();
        let script_for_getter = callee_script.clone();
        vm.set_script_getter(Box::new(move |hash| {
            if hash == callee_hash {
                Some((script_for_getter.clone(), false))
            } else {
                None
            }
        }));

        let mut b = ScriptBuilder::new();
        b.emit_appcall(callee_hash, false);
        vm.load_script(b.into_bytes(), true);
        vm.execute();
        assert_eq!(vm.state(), VmState::Halt);
        assert_eq!(vm.estack()[0].to_bigint().unwrap(), BigInt::from(30));
    }

    #[test]
    fn appcall_to_unknown_script_faults() {
        let mut vm = Vm::new();
        vm.set_script_getter(Box::new(|_| None));
        let mut b = ScriptBuilder::new();
        b.emit_appcall(UInt160::from_script(b"nobody"), false);
        vm.load_script(b.into_bytes(), true);
        vm.execute();
        assert_eq!(vm.state(), VmState::Fault);
        assert_eq!(vm.fault_reason(), Some(&VmError::UnknownScript));
    }

    #[test]
    fn dynamic_appcall_requires_the_flag() {
        let callee = vec![OpCode::Push1 as u8];
        let callee_hash = UInt160::from_script(&callee);

        // Caller pushes the target hash, then APPCALL with a zero operand.
        let mut b = ScriptBuilder::new();
        b.emit_bytes(&callee_hash.to_array());
        b.emit_with_operand(OpCode::AppCall, &[0u8; 20]);
        let caller = b.into_bytes();

        let make_vm = |dynamic: bool| {
            let mut vm = Vm::new();
            let callee = callee.clone();
            vm.set_script_getter(Box::new(move |hash| {
                (hash == callee_hash).then(|| (callee.clone(), false))
            }));
            vm.load_script(caller.clone(), dynamic);
            vm.execute();
            vm
        };

        assert_eq!(make_vm(true).state(), VmState::Halt);
        let denied = make_vm(false);
        assert_eq!(denied.state(), VmState::Fault);
        assert_eq!(
            denied.fault_reason(),
            Some(&VmError::DynamicInvokeForbidden)
        );
    }

    #[test]
    fn call_and_ret() {
        // Layout: 0 PUSH2, 1..=3 CALL +4, 4 RET, 5 PUSH3, 6 ADD, 7 RET.
        let mut b = ScriptBuilder::new();
        b.emit_int(2);
        b.emit_jump(OpCode::Call, 4).unwrap();
        b.emit(OpCode::Ret);
        b.emit_int(3);
        b.emit(OpCode::Add);
        b.emit(OpCode::Ret);
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Halt);
        assert_eq!(vm.estack()[0].to_bigint().unwrap(), BigInt::from(5));
    }

    #[test]
    fn oversized_integer_faults() {
        let mut b = ScriptBuilder::new();
        b.emit_bytes(&[0x7f; 32]).emit_bytes(&[0x7f; 32]).emit(OpCode::Mul);
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Fault);
        assert_eq!(vm.fault_reason(), Some(&VmError::IntegerTooWide));
    }

    #[test]
    fn stack_depth_limit_faults() {
        // DUP forever on a script that loops via JMP back to start.
        let mut b = ScriptBuilder::new();
        b.emit_int(1);
        b.emit(OpCode::Dup);
        b.emit_jump(OpCode::Jmp, -1).unwrap();
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Fault);
        assert!(matches!(
            vm.fault_reason(),
            Some(VmError::StackOverflow { .. })
        ));
    }

    #[test]
    fn running_off_the_end_halts() {
        let vm = run(vec![OpCode::Push1 as u8]);
        assert_eq!(vm.state(), VmState::Halt);
        assert_eq!(vm.estack().len(), 1);
    }

    #[test]
    fn numeric_comparisons() {
        let mut b = ScriptBuilder::new();
        b.emit_int(3).emit_int(5).emit(OpCode::Lt);
        assert!(run(b.into_bytes()).estack()[0].to_bool());

        let mut b = ScriptBuilder::new();
        b.emit_int(4).emit_int(3).emit_int(5).emit(OpCode::Within);
        assert!(run(b.into_bytes()).estack()[0].to_bool());
    }

    #[test]
    fn substr_left_right() {
        let mut b = ScriptBuilder::new();
        b.emit_string("neo-ledger")
            .emit_int(4)
            .emit_int(6)
            .emit(OpCode::SubStr);
        assert_eq!(
            run(b.into_bytes()).estack()[0].to_bytes().unwrap(),
            b"ledger"
        );

        let mut b = ScriptBuilder::new();
        b.emit_string("neo-ledger").emit_int(3).emit(OpCode::Left);
        assert_eq!(run(b.into_bytes()).estack()[0].to_bytes().unwrap(), b"neo");

        let mut b = ScriptBuilder::new();
        b.emit_string("neo-ledger").emit_int(11).emit(OpCode::Right);
        assert_eq!(run(b.into_bytes()).state(), VmState::Fault);
    }

    #[test]
    fn hash_opcodes_match_the_crypto_crate() {
        let mut b = ScriptBuilder::new();
        b.emit_string("data").emit(OpCode::Hash160);
        assert_eq!(
            run(b.into_bytes()).estack()[0].to_bytes().unwrap(),
            neo_cryptography::hash160(b"data").to_vec()
        );
    }

    #[test]
    fn jmpif_with_bad_target_faults() {
        let mut b = ScriptBuilder::new();
        b.emit_int(1);
        b.emit_jump(OpCode::JmpIf, -100).unwrap();
        let vm = run(b.into_bytes());
        assert_eq!(vm.state(), VmState::Fault);
        assert!(matches!(vm.fault_reason(), Some(VmError::BadOffset(_))));
    }
}
