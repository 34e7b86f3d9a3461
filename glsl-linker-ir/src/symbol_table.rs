// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! per-shader name lookup

use crate::types::InterfaceType;
use crate::types::Type;
use crate::variable::VariableId;
use crate::variable::VariableMode;
use hashbrown::HashMap;

/// maps names to the global variables, functions and types of one shader
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    variables: HashMap<String, VariableId>,
    functions: HashMap<String, usize>,
    types: HashMap<String, Type>,
    interfaces: HashMap<(VariableMode, String), InterfaceType>,
}

impl SymbolTable {
    /// create an empty symbol table
    pub fn new() -> Self {
        Self::default()
    }
    /// add or replace a variable; returns the previous binding
    pub fn add_variable(&mut self, name: impl Into<String>, id: VariableId) -> Option<VariableId> {
        self.variables.insert(name.into(), id)
    }
    /// look up a variable
    pub fn get_variable(&self, name: &str) -> Option<VariableId> {
        self.variables.get(name).copied()
    }
    /// remove a variable
    pub fn remove_variable(&mut self, name: &str) -> Option<VariableId> {
        self.variables.remove(name)
    }
    /// iterate over all variables in unspecified order
    pub fn variables(&self) -> impl Iterator<Item = (&str, VariableId)> {
        self.variables.iter().map(|(name, &id)| (name.as_str(), id))
    }
    /// add a function, by its index in the shader's function list
    pub fn add_function(&mut self, name: impl Into<String>, index: usize) {
        self.functions.insert(name.into(), index);
    }
    /// look up a function's index
    pub fn get_function(&self, name: &str) -> Option<usize> {
        self.functions.get(name).copied()
    }
    /// add a named type
    pub fn add_type(&mut self, name: impl Into<String>, t: Type) {
        self.types.insert(name.into(), t);
    }
    /// look up a named type
    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }
    /// add an interface block type for `mode`; returns `false` if one was already there
    pub fn add_interface(&mut self, mode: VariableMode, interface: InterfaceType) -> bool {
        let key = (mode, interface.name.clone());
        if self.interfaces.contains_key(&key) {
            return false;
        }
        self.interfaces.insert(key, interface);
        true
    }
    /// look up an interface block type
    pub fn get_interface(&self, mode: VariableMode, name: &str) -> Option<&InterfaceType> {
        self.interfaces.get(&(mode, name.to_string()))
    }
    /// replace an interface block type, such as after resizing its arrays
    pub fn replace_interface(&mut self, mode: VariableMode, interface: InterfaceType) {
        self.interfaces
            .insert((mode, interface.name.clone()), interface);
    }
}
