//! Ownership Tracker.
//!
//! Every local whose static type is `STRING` is an owning handle: exactly
//! one binding at a time may carry that type for a given runtime value, and
//! a free call must be emitted before that binding's slot dies (block exit,
//! function return, loop break/continue). A `STRING_LIT` is never freed —
//! it is a non-owning pointer into the data section.
//!
//! The reference implementation this was distilled from frees by walking
//! the *entire* frame's flattened bindings at every block exit, not just the
//! innermost block, then pops only the innermost block's slots. Spec §9
//! allows the narrower, provably-equivalent form instead: since a freed
//! `STRING` binding is retyped to `UNDEF` at the moment it's freed, no
//! binding is ever freed twice, so restricting the free pass to the block
//! actually being popped is behaviorally identical and is what we do here
//! (see DESIGN.md's decision on this Open Question).

use crate::env::Binding;
use crate::templates;
use crate::types::Type;

const FREE_STR_EXTENSION: &str = "free_str";

/// Offset in bytes of the local at `slot` from the frame base.
pub fn local_offset(slot: usize) -> i32 {
    4 + 4 * slot as i32
}

/// `get-local(slot); push-result; call-extension(free_str)` — the free
/// sequence for one owning binding. `free_str`'s own argument slot is
/// reclaimed here too: every pushed argument in this compiler is reclaimed
/// by its caller (see `free_argument_asm`), and this push is no exception.
pub fn free_local_asm(slot: usize) -> String {
    let mut asm = String::new();
    asm.push_str(&templates::get_local(local_offset(slot)));
    asm.push_str(&templates::push_result());
    asm.push_str(&templates::call_extension(FREE_STR_EXTENSION));
    asm.push_str(&templates::clear_stack(4));
    asm
}

/// Emit frees for every `STRING`-typed binding in `block`, then one
/// `pop-local` per binding in the block (slot reclamation), in the order
/// the bindings were declared. `base_slot` is this block's offset into the
/// frame's flattened binding list.
pub fn block_exit_asm(block: &[Binding], base_slot: usize) -> String {
    let mut asm = String::new();
    for (i, binding) in block.iter().enumerate() {
        if binding.ty == Type::String {
            asm.push_str(&free_local_asm(base_slot + i));
        }
    }
    for _ in block {
        asm.push_str(&templates::pop_local());
    }
    asm
}

/// Loop-break free sequence (spec §4.6): free every `STRING` binding
/// declared since the loop opened, then discard those slots, then jump.
/// The compiler-side block stack is *not* popped here — the blocks unwind
/// normally when the loop body's own block exits run.
pub fn loop_control_asm(flattened: &[&Binding], depth_at_entry_slot_count: usize, id: u64, is_break: bool) -> String {
    let mut asm = String::new();
    let tail = &flattened[depth_at_entry_slot_count..];
    for (i, binding) in tail.iter().enumerate() {
        if binding.ty == Type::String {
            asm.push_str(&free_local_asm(depth_at_entry_slot_count + i));
        }
    }
    for _ in tail {
        asm.push_str(&templates::pop_local());
    }
    asm.push_str(if is_break {
        &templates::while_break(id)
    } else {
        &templates::while_continue(id)
    });
    asm
}

/// `return`'s free pass (spec §4.3 case 7): free every `STRING` binding in
/// the frame except the one named by a bare-identifier return argument (that
/// binding's ownership is transferred out to the caller, not freed).
pub fn return_free_asm(flattened: &[&Binding], returned_name: Option<&str>) -> String {
    let mut asm = String::new();
    for (slot, binding) in flattened.iter().enumerate() {
        if binding.ty != Type::String {
            continue;
        }
        if Some(binding.name.as_str()) == returned_name {
            continue;
        }
        asm.push_str(&free_local_asm(slot));
    }
    asm
}

/// `free_arguments` (spec §4.7): after a call has consumed its pushed
/// arguments, each argument still needs its stack slot reclaimed. A
/// `STRING` produced by a compound call expression (an unnamed temporary
/// nothing owns) is freed; everything else — a named owner, or a
/// `STRING_LIT` — just has its slot dropped. Either way the argument's own
/// stack slot is reclaimed exactly once, since nothing here pops it.
pub fn free_argument_asm(arg_type: Type, was_unnamed_temporary: bool) -> String {
    let mut asm = String::new();
    if arg_type == Type::String && was_unnamed_temporary {
        asm.push_str(&templates::call_extension(FREE_STR_EXTENSION));
    }
    asm.push_str(&templates::clear_stack(4));
    asm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Binding;

    fn binding(name: &str, ty: Type) -> Binding {
        Binding {
            name: name.to_string(),
            ty,
        }
    }

    #[test]
    fn block_exit_frees_only_string_bindings() {
        let block = vec![
            binding("a", Type::Int),
            binding("s", Type::String),
            binding("lit", Type::StringLit),
        ];
        let asm = block_exit_asm(&block, 0);
        assert_eq!(asm.matches("free_str").count(), 1);
        // one reclaim for free_str's own argument, plus one pop-local per binding
        assert_eq!(asm.matches("addl $4, %esp").count(), 4);
    }

    #[test]
    fn return_free_skips_the_returned_binding() {
        let bindings = vec![binding("s", Type::String), binding("t", Type::String)];
        let refs: Vec<&Binding> = bindings.iter().collect();
        let asm = return_free_asm(&refs, Some("t"));
        assert_eq!(asm.matches("free_str").count(), 1);
    }

    #[test]
    fn free_argument_frees_only_unnamed_string_temporaries() {
        assert!(free_argument_asm(Type::String, true).contains("free_str"));
        assert!(!free_argument_asm(Type::String, false).contains("free_str"));
        assert!(!free_argument_asm(Type::StringLit, true).contains("free_str"));
    }

    #[test]
    fn loop_control_frees_only_bindings_declared_since_loop_entry() {
        let bindings = vec![binding("outer", Type::String), binding("inner", Type::String)];
        let refs: Vec<&Binding> = bindings.iter().collect();
        let asm = loop_control_asm(&refs, 1, 7, true);
        assert_eq!(asm.matches("free_str").count(), 1);
        assert!(asm.contains(".Lwhile_end_7"));
    }
}
