//! Lexical Environment: the stack of frames, each with its parameter list
//! and its stack of variable blocks.
//!
//! Slot indices returned by lookup are positions in the *flattened* list of
//! bindings (frame-relative for locals, parameter-list-relative for
//! parameters) — it is the evaluator's job to turn those into byte offsets
//! (`4 + 4*slot` for locals, `8 + 4*slot` for parameters).

use crate::error::CompileError;
use crate::types::Type;

/// `(name, type)`. The type is mutated exactly once in place, to record an
/// ownership move (see `ownership.rs`) or a free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub ty: Type,
}

/// One lexical scope: an ordered sequence of bindings, allocated on the
/// machine stack in declaration order.
pub type Block = Vec<Binding>;

/// `(id, flattened-binding count at loop entry)`. The count lets `break`/
/// `continue` free exactly the bindings declared since the loop opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopDescriptor {
    pub id: u64,
    pub slots_at_entry: usize,
}

#[derive(Debug)]
pub struct Frame {
    pub name: String,
    pub params: Vec<Binding>,
    pub return_type: Type,
    blocks: Vec<Block>,
    loops: Vec<LoopDescriptor>,
}

impl Frame {
    fn new(name: impl Into<String>, params: Vec<Binding>, return_type: Type) -> Self {
        Frame {
            name: name.into(),
            params,
            return_type,
            blocks: vec![Vec::new()],
            loops: Vec::new(),
        }
    }

    pub fn push_block(&mut self) {
        self.blocks.push(Vec::new());
    }

    /// Pop the innermost block, returning its bindings in declaration order.
    pub fn pop_block(&mut self) -> Block {
        self.blocks
            .pop()
            .expect("frame must always have at least one block")
    }

    pub fn innermost_block(&self) -> &Block {
        self.blocks.last().expect("frame must have a block")
    }

    pub fn block_depth(&self) -> usize {
        self.blocks.len()
    }

    /// All bindings of the frame, flattened bottom-to-top across blocks, in
    /// declaration order. Index in this vector is the local's slot index.
    pub fn flatten(&self) -> Vec<&Binding> {
        self.blocks.iter().flatten().collect()
    }

    fn flatten_mut(&mut self) -> Vec<&mut Binding> {
        self.blocks.iter_mut().flatten().collect()
    }

    /// Declare `name` in the innermost block. Fatal if it collides with an
    /// existing binding in that block or with any parameter of this frame.
    pub fn declare(&mut self, name: &str, ty: Type) -> Result<(), CompileError> {
        if self.params.iter().any(|p| p.name == name)
            || self.innermost_block().iter().any(|b| b.name == name)
        {
            return Err(CompileError::Redeclaration {
                name: name.to_string(),
            });
        }
        self.blocks
            .last_mut()
            .expect("frame must have a block")
            .push(Binding {
                name: name.to_string(),
                ty,
            });
        Ok(())
    }

    /// Look up a variable, innermost block first. Returns its slot index in
    /// the flattened frame and its current type.
    pub fn lookup_variable(&self, name: &str) -> Option<(usize, Type)> {
        let flat = self.flatten();
        flat.iter()
            .enumerate()
            .rev()
            .find(|(_, b)| b.name == name)
            .map(|(i, b)| (i, b.ty))
    }

    pub fn lookup_parameter(&self, name: &str) -> Option<(usize, Type)> {
        self.params
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
            .map(|(i, p)| (i, p.ty))
    }

    /// Rewrite the innermost occurrence of `name`'s type in place (ownership
    /// move or free-then-tombstone).
    pub fn retype_variable(&mut self, name: &str, new_ty: Type) {
        if let Some(binding) = self
            .flatten_mut()
            .into_iter()
            .rev()
            .find(|b| b.name == name)
        {
            binding.ty = new_ty;
        }
    }

    pub fn push_loop(&mut self, id: u64) {
        self.loops.push(LoopDescriptor {
            id,
            slots_at_entry: self.flatten().len(),
        });
    }

    pub fn pop_loop(&mut self) -> Option<LoopDescriptor> {
        self.loops.pop()
    }

    pub fn innermost_loop(&self) -> Option<&LoopDescriptor> {
        self.loops.last()
    }
}

#[derive(Debug)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Environment {
    /// The outermost frame: `main`, no parameters, one empty block, return
    /// type `UNDEF`.
    pub fn new() -> Self {
        Environment {
            frames: vec![Frame::new("main", Vec::new(), Type::Undef)],
        }
    }

    pub fn push_frame(&mut self, name: impl Into<String>, params: Vec<(String, Type)>, return_type: Type) {
        let params = params
            .into_iter()
            .map(|(name, ty)| Binding { name, ty })
            .collect();
        self.frames.push(Frame::new(name, params, return_type));
    }

    pub fn pop_frame(&mut self) -> Frame {
        assert!(
            self.frames.len() > 1,
            "must never pop the outermost (main) frame"
        );
        self.frames.pop().expect("checked non-empty above")
    }

    pub fn current(&self) -> &Frame {
        self.frames.last().expect("frame stack is never empty")
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("frame stack is never empty")
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_innermost_occurrence() {
        let mut env = Environment::new();
        env.current_mut().declare("x", Type::Int).unwrap();
        env.current_mut().push_block();
        env.current_mut().declare("x", Type::String).unwrap();
        let (slot, ty) = env.current().lookup_variable("x").unwrap();
        assert_eq!(slot, 1);
        assert_eq!(ty, Type::String);
    }

    #[test]
    fn declare_rejects_collision_with_block_sibling() {
        let mut env = Environment::new();
        env.current_mut().declare("x", Type::Int).unwrap();
        let err = env.current_mut().declare("x", Type::Int).unwrap_err();
        assert_eq!(
            err,
            CompileError::Redeclaration {
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn declare_rejects_collision_with_parameter() {
        let mut env = Environment::new();
        env.push_frame("f", vec![("a".to_string(), Type::Int)], Type::Undef);
        let err = env.current_mut().declare("a", Type::Int).unwrap_err();
        assert_eq!(
            err,
            CompileError::Redeclaration {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn retype_rewrites_innermost_occurrence_only() {
        let mut env = Environment::new();
        env.current_mut().declare("s", Type::String).unwrap();
        env.current_mut().retype_variable("s", Type::Undef);
        let (_, ty) = env.current().lookup_variable("s").unwrap();
        assert_eq!(ty, Type::Undef);
    }

    #[test]
    fn loop_stack_is_empty_at_function_entry() {
        let mut env = Environment::new();
        env.current_mut().push_loop(1);
        env.push_frame("f", vec![], Type::Undef);
        assert!(env.current().innermost_loop().is_none());
    }

    #[test]
    fn pop_frame_panics_on_outermost() {
        let result = std::panic::catch_unwind(|| {
            let mut env = Environment::new();
            env.pop_frame();
        });
        assert!(result.is_err());
    }
}
