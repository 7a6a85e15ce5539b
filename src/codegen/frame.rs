//! Stack frame layout.
//!
//! Every declaration in a function gets its own slot, including locals of
//! branches that never run. Slots are never reused after their scope ends.
//! A slot is addressed by its offset from the top of the frame; the value
//! lives at `[sp, #frame_size - offset]`.
//!
//! The frame is limited to [`MAX_FRAME_SIZE`] so that `sub sp` and `add sp`
//! take a plain 12-bit immediate and every slot offset fits the immediate
//! of the narrowest load and store.

use nolog::*;

use crate::ast::{
    visit::{walk_decl, Visitor},
    Block, Declaration,
};
use crate::types::Type;

/// Largest frame, the biggest multiple of 16 below 4096.
pub const MAX_FRAME_SIZE: i32 = 4080;

/// Round `n` up to a multiple of `align`.
fn align_up(n: i32, align: i32) -> i32 {
    (n + align - 1) / align * align
}

/// Slot allocator. Allocating the same sequence of types always yields the
/// same offsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameLayout {
    used: i32,
}

impl FrameLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for `ty` and return its offset from the frame top.
    pub fn allocate(&mut self, ty: Type) -> i32 {
        let size = ty.slot_size();
        self.used = align_up(self.used, size) + size;
        self.used
    }

    /// Bytes used so far.
    pub fn used(&self) -> i32 {
        self.used
    }

    /// Frame size for everything declared in `body`, a multiple of 16.
    pub fn measure(body: &Block) -> i32 {
        struct Decls(FrameLayout);

        impl<'ast> Visitor<'ast> for Decls {
            fn visit_decl(&mut self, decl: &'ast Declaration) {
                self.0.allocate(decl.ty);
                trace!("FRAME " => "`{}`: {} ends at {}", decl.name, decl.ty, self.0.used());
                walk_decl(self, decl);
            }
        }

        let mut decls = Decls(FrameLayout::new());
        decls.visit_block(body);
        let size = align_up(decls.0.used(), 16);
        trace!("FRAME " => "size {}", size);
        size
    }
}
