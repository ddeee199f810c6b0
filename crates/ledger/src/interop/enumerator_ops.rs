//! Enumerator and iterator interop items.

use super::InteropContext;
use neo_vm::stack_item::InteropValue;
use neo_vm::{StackItem, Vm, VmError, VmResult};

/// A materialized sequence of `(key, value)` pairs with a cursor. Both the
/// enumerator and iterator namespaces operate on this shape; enumerators
/// simply never look at the keys.
#[derive(Debug, Clone)]
pub struct IteratorInterop {
    pairs: Vec<(StackItem, StackItem)>,
    /// Cursor position; `None` until the first `Next`.
    position: Option<usize>,
}

impl IteratorInterop {
    /// Creates an iterator over `pairs` with the cursor before the start.
    pub fn new(pairs: Vec<(StackItem, StackItem)>) -> Self {
        Self {
            pairs,
            position: None,
        }
    }

    fn over_values(items: Vec<StackItem>) -> Self {
        Self::new(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (StackItem::integer(i as u64), item))
                .collect(),
        )
    }

    fn advance(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.pairs.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.pairs.len());
            false
        }
    }

    fn current(&self) -> Option<&(StackItem, StackItem)> {
        self.pairs.get(self.position?)
    }
}

fn pop_iterator(vm: &mut Vm) -> VmResult<InteropValue> {
    let item = vm.pop()?;
    match item {
        StackItem::Interop(value) if value.borrow().is::<IteratorInterop>() => Ok(value),
        _ => Err(VmError::InvalidConversion("expected an iterator".into())),
    }
}

fn with_iterator<R>(
    value: &InteropValue,
    f: impl FnOnce(&mut IteratorInterop) -> R,
) -> VmResult<R> {
    let mut borrowed = value.borrow_mut();
    let iterator = borrowed
        .downcast_mut::<IteratorInterop>()
        .ok_or_else(|| VmError::InvalidConversion("expected an iterator".into()))?;
    Ok(f(iterator))
}

/// `Enumerator.Create`: enumerate the values of an array.
pub fn create(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let items = vm.pop()?.to_vec()?;
    vm.push(StackItem::interop(IteratorInterop::over_values(items)))
}

/// `Enumerator.Next` (also `Iterator.Next`): advance, pushing whether an
/// element is available.
pub fn next(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let iterator = pop_iterator(vm)?;
    let advanced = with_iterator(&iterator, IteratorInterop::advance)?;
    vm.push(StackItem::Bool(advanced))
}

/// `Enumerator.Value` (also `Iterator.Value`): the element under the
/// cursor.
pub fn value(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let iterator = pop_iterator(vm)?;
    let current = with_iterator(&iterator, |it| it.current().map(|(_, v)| v.clone()))?;
    let item = current.ok_or_else(|| VmError::InteropFault("no current element".into()))?;
    vm.push(item)
}

/// `Enumerator.Concat`: chain two sequences.
pub fn concat(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let second = pop_iterator(vm)?;
    let first = pop_iterator(vm)?;
    let mut pairs = with_iterator(&first, |it| it.pairs.clone())?;
    pairs.extend(with_iterator(&second, |it| it.pairs.clone())?);
    vm.push(StackItem::interop(IteratorInterop::new(pairs)))
}

/// `Iterator.Concat`: same as the enumerator form, keys preserved.
pub fn iterator_concat(ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    concat(ic, vm)
}

/// `Iterator.Create`: iterate an array (integer keys) or a map (its keys).
pub fn iterator_create(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let top = vm.pop()?;
    let iterator = match &top {
        StackItem::Array(_) | StackItem::Struct(_) => IteratorInterop::over_values(top.to_vec()?),
        StackItem::Map(map) => IteratorInterop::new(
            map.borrow()
                .iter()
                .map(|(key, value)| (key.to_item(), value.clone()))
                .collect(),
        ),
        other => {
            return Err(VmError::InvalidConversion(format!(
                "cannot iterate a {}",
                other.type_name()
            )))
        }
    };
    vm.push(StackItem::interop(iterator))
}

/// `Iterator.Key`: the key under the cursor.
pub fn iterator_key(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let iterator = pop_iterator(vm)?;
    let current = with_iterator(&iterator, |it| it.current().map(|(k, _)| k.clone()))?;
    let key = current.ok_or_else(|| VmError::InteropFault("no current element".into()))?;
    vm.push(key)
}

/// `Iterator.Keys`: an enumerator over all keys.
pub fn iterator_keys(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let iterator = pop_iterator(vm)?;
    let keys = with_iterator(&iterator, |it| {
        it.pairs.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>()
    })?;
    vm.push(StackItem::interop(IteratorInterop::over_values(keys)))
}

/// `Iterator.Values`: an enumerator over all values.
pub fn iterator_values(_ic: &mut InteropContext, vm: &mut Vm) -> VmResult<()> {
    let iterator = pop_iterator(vm)?;
    let values = with_iterator(&iterator, |it| {
        it.pairs.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>()
    })?;
    vm.push(StackItem::interop(IteratorInterop::over_values(values)))
}
