//! Application execution results.

use neo_core::{Fixed8, UInt160, UInt256};
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use neo_smart_contract::TriggerType;
use neo_vm::{deserialize_item, serialize_item, StackItem, VmState};

/// A notification raised by a script: the emitting script hash plus the
/// notified item, kept in its serialized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub script_hash: UInt160,
    pub item: Vec<u8>,
}

impl NotificationEvent {
    /// Captures a live stack item. Fails only for unserializable items.
    pub fn from_item(script_hash: UInt160, item: &StackItem) -> neo_io::Result<Self> {
        let mut writer = BinaryWriter::new();
        serialize_item(item, &mut writer);
        Ok(Self {
            script_hash,
            item: writer.into_bytes()?,
        })
    }

    /// Rehydrates the notified item.
    pub fn to_item(&self) -> neo_io::Result<StackItem> {
        let mut reader = MemoryReader::new(&self.item);
        let item = deserialize_item(&mut reader);
        reader.finish(item)
    }
}

impl Serializable for NotificationEvent {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.script_hash.serialize(writer);
        writer.write_var_bytes(&self.item);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        Self {
            script_hash: UInt160::deserialize(reader),
            item: reader.read_var_bytes(1 << 20),
        }
    }
}

/// The outcome of executing one transaction's application script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppExecResult {
    pub tx_hash: UInt256,
    pub trigger: TriggerType,
    pub vm_state: String,
    pub gas_consumed: Fixed8,
    /// The final evaluation stack, bottom to top, each item serialized.
    pub stack: Vec<Vec<u8>>,
    /// Notifications in emission order; empty unless the script halted.
    pub notifications: Vec<NotificationEvent>,
}

impl AppExecResult {
    /// Captures the outcome of `vm` running the script of `tx_hash`.
    pub fn from_vm(
        tx_hash: UInt256,
        trigger: TriggerType,
        vm: &neo_vm::Vm,
        notifications: Vec<NotificationEvent>,
    ) -> Self {
        let mut stack = Vec::new();
        for item in vm.estack() {
            let mut writer = BinaryWriter::new();
            serialize_item(item, &mut writer);
            stack.push(writer.into_bytes().unwrap_or_default());
        }
        Self {
            tx_hash,
            trigger,
            vm_state: vm.state().as_str().to_string(),
            gas_consumed: Fixed8::from_raw(vm.gas_consumed()),
            stack,
            notifications: if vm.state() == VmState::Halt {
                notifications
            } else {
                Vec::new()
            },
        }
    }

    /// Rehydrates the result stack.
    pub fn stack_items(&self) -> neo_io::Result<Vec<StackItem>> {
        self.stack
            .iter()
            .map(|bytes| {
                let mut reader = MemoryReader::new(bytes);
                let item = deserialize_item(&mut reader);
                reader.finish(item)
            })
            .collect()
    }
}

impl Serializable for AppExecResult {
    fn serialize(&self, writer: &mut BinaryWriter) {
        self.tx_hash.serialize(writer);
        writer.write_u8(self.trigger as u8);
        writer.write_var_string(&self.vm_state);
        self.gas_consumed.serialize(writer);
        writer.write_var_uint(self.stack.len() as u64);
        for item in &self.stack {
            writer.write_var_bytes(item);
        }
        writer.write_array(&self.notifications);
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let tx_hash = UInt256::deserialize(reader);
        let trigger_byte = reader.read_u8();
        let trigger = TriggerType::from_byte(trigger_byte).unwrap_or(TriggerType::Application);
        let vm_state = reader.read_var_string(16);
        let gas_consumed = Fixed8::deserialize(reader);
        let stack_len = reader.read_var_uint(2048) as usize;
        let mut stack = Vec::with_capacity(stack_len);
        for _ in 0..stack_len {
            if reader.error().is_some() {
                break;
            }
            stack.push(reader.read_var_bytes(1 << 20));
        }
        Self {
            tx_hash,
            trigger,
            vm_state,
            gas_consumed,
            stack,
            notifications: reader.read_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let notification = NotificationEvent::from_item(
            UInt160::from_script(b"token"),
            &StackItem::array(vec![
                StackItem::byte_array(b"Transfer".to_vec()),
                StackItem::byte_array(vec![]),
                StackItem::byte_array(vec![1; 20]),
                StackItem::integer(100),
            ]),
        )
        .unwrap();

        let mut writer = BinaryWriter::new();
        serialize_item(&StackItem::integer(42), &mut writer);
        let result = AppExecResult {
            tx_hash: UInt256::from_data(b"tx"),
            trigger: TriggerType::Application,
            vm_state: "HALT".to_string(),
            gas_consumed: Fixed8::from_raw(100_000),
            stack: vec![writer.into_bytes().unwrap()],
            notifications: vec![notification],
        };
        let back: AppExecResult = neo_io::from_slice(&neo_io::to_vec(&result).unwrap()).unwrap();
        assert_eq!(back, result);

        let items = back.stack_items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].to_bigint().unwrap(),
            num_bigint::BigInt::from(42)
        );
    }
}
