//! Symbol tables used while lowering.
//!
//! Names live in two levels: the [`Globals`] shared by the whole program
//! (constants and subprograms) and one [`Locals`] table per function being
//! lowered. A bare identifier resolves against the current function's locals
//! first and then against the global constants. There is no block scoping.

use std::collections::HashMap;

/// How a local variable is laid out in its stack slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    /// The slot is already biased by the lower bound, so user indices can be
    /// applied to it directly.
    Array,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Binding<S> {
    pub slot: S,
    pub shape: Shape,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FunctionEntry<F> {
    pub handle: F,
    pub arity: usize,
    /// Cleared only for forward declarations still awaiting their body.
    pub defined: bool,
}

pub struct Globals<F> {
    constants: HashMap<Box<str>, i32>,
    functions: HashMap<Box<str>, FunctionEntry<F>>,
}

impl<F: Copy> Globals<F> {
    pub fn with_capacity(capacity: usize) -> Globals<F> {
        Globals {
            constants: HashMap::with_capacity(capacity),
            functions: HashMap::with_capacity(capacity),
        }
    }

    /// Attempts to define the provided constant.
    ///
    /// Fails if the constant is already defined; the first value is kept.
    pub fn define_constant(&mut self, name: &str, value: i32) -> Result<(), ()> {
        if self.constants.contains_key(name) {
            return Err(());
        }
        self.constants.insert(name.into(), value);
        Ok(())
    }

    pub fn constant(&self, name: &str) -> Option<i32> {
        self.constants.get(name).copied()
    }

    pub fn function(&self, name: &str) -> Option<FunctionEntry<F>> {
        self.functions.get(name).copied()
    }

    /// Registers or replaces a subprogram entry.
    pub fn register_function(&mut self, name: &str, entry: FunctionEntry<F>) {
        self.functions.insert(name.into(), entry);
    }
}

pub struct Locals<S> {
    map: HashMap<Box<str>, Binding<S>>,
}

impl<S: Copy> Locals<S> {
    pub fn new() -> Locals<S> {
        Locals {
            map: HashMap::new(),
        }
    }

    /// Attempts to declare the provided variable.
    ///
    /// Fails if the name is already declared in this function; the first
    /// binding is kept.
    pub fn declare(&mut self, name: &str, binding: Binding<S>) -> Result<(), ()> {
        if self.map.contains_key(name) {
            return Err(());
        }
        self.map.insert(name.into(), binding);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Binding<S>> {
        self.map.get(name).copied()
    }

    /// Installs a binding for the extent of a `for` loop, returning the one
    /// it replaces. Must be paired with [`Locals::restore`].
    pub fn shadow(&mut self, name: &str, binding: Binding<S>) -> Option<Binding<S>> {
        self.map.insert(name.into(), binding)
    }

    /// Undoes a [`Locals::shadow`], erasing the name if it was unbound.
    pub fn restore(&mut self, name: &str, saved: Option<Binding<S>>) {
        match saved {
            Some(binding) => {
                self.map.insert(name.into(), binding);
            }
            None => {
                self.map.remove(name);
            }
        }
    }
}

impl<S: Copy> Default for Locals<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(slot: u32) -> Binding<u32> {
        Binding {
            slot,
            shape: Shape::Scalar,
        }
    }

    #[test]
    fn test_constant_redefinition_keeps_first() {
        let mut globals = Globals::<()>::with_capacity(4);
        assert_eq!(globals.define_constant("x", 1), Ok(()));
        assert_eq!(globals.define_constant("x", 2), Err(()));
        assert_eq!(globals.constant("x"), Some(1));
        assert_eq!(globals.constant("y"), None);
    }

    #[test]
    fn test_local_redeclaration_keeps_first() {
        let mut locals = Locals::new();
        assert_eq!(locals.declare("x", scalar(0)), Ok(()));
        assert_eq!(locals.declare("x", scalar(1)), Err(()));
        assert_eq!(locals.get("x"), Some(scalar(0)));
    }

    #[test]
    fn test_tables_are_independent() {
        let mut f = Locals::new();
        let mut g = Locals::new();
        f.declare("i", scalar(0)).unwrap();
        g.declare("i", scalar(7)).unwrap();
        assert_eq!(f.get("i"), Some(scalar(0)));
        assert_eq!(g.get("i"), Some(scalar(7)));
    }

    #[test]
    fn test_shadow_and_restore() {
        let mut locals = Locals::new();
        locals.declare("i", scalar(0)).unwrap();

        let saved = locals.shadow("i", scalar(5));
        assert_eq!(locals.get("i"), Some(scalar(5)));
        locals.restore("i", saved);
        assert_eq!(locals.get("i"), Some(scalar(0)));

        let saved = locals.shadow("j", scalar(6));
        assert_eq!(saved, None);
        locals.restore("j", saved);
        assert_eq!(locals.get("j"), None);
    }
}
