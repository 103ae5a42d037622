//! Function Table: user-defined function signatures and compiled bodies.

use crate::types::Type;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub params: Vec<Type>,
    pub return_type: Type,
    pub body_asm: String,
}

#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: HashMap<String, FunctionDescriptor>,
    /// Insertion order, so the driver can emit bodies deterministically.
    order: Vec<String>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    /// Register a descriptor before the body is known, so recursive calls
    /// within the body can resolve the function's signature.
    pub fn register_signature(&mut self, name: impl Into<String>, params: Vec<Type>, return_type: Type) {
        let name = name.into();
        if !self.functions.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.functions.insert(
            name,
            FunctionDescriptor {
                params,
                return_type,
                body_asm: String::new(),
            },
        );
    }

    /// Fill in the compiled body once codegen for the function finishes.
    pub fn set_body(&mut self, name: &str, body_asm: String) {
        if let Some(desc) = self.functions.get_mut(name) {
            desc.body_asm = body_asm;
        }
    }

    /// All registered bodies, in definition order, for the driver to emit.
    pub fn bodies_in_order(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .map(move |name| self.functions[name].body_asm.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_signature_before_body_for_recursion() {
        let mut table = FunctionTable::new();
        table.register_signature("fact", vec![Type::Int], Type::Int);
        assert!(table.contains("fact"));
        assert_eq!(table.get("fact").unwrap().body_asm, "");
        table.set_body("fact", "  ret\n".to_string());
        assert_eq!(table.get("fact").unwrap().body_asm, "  ret\n");
    }

    #[test]
    fn bodies_in_order_preserves_definition_order() {
        let mut table = FunctionTable::new();
        table.register_signature("a", vec![], Type::Undef);
        table.register_signature("b", vec![], Type::Undef);
        table.set_body("a", "A".to_string());
        table.set_body("b", "B".to_string());
        let bodies: Vec<&str> = table.bodies_in_order().collect();
        assert_eq!(bodies, vec!["A", "B"]);
    }
}
