//! OpTree instruction types and storage.

use std::fmt;

use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::{
    ast::{
        PathRoot,
        operator::{BinaryOp, LogicOp, Quantifier},
    },
    eval::{builtin::Builtin, ops::LikePattern},
    value::Value,
};

/// Reference to an instruction in the [`OpPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpRef(u32);

impl OpRef {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for OpRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpRef({})", self.0)
    }
}

/// One step of a path after its root binding.
#[derive(Debug, Clone)]
pub enum Step {
    Member(SmolStr),
    Index(i32),
    IndexOf(OpRef),
    All,
    Filter(OpRef),
    /// `ITEMS` coercion of a scalar path.
    Items,
}

impl Step {
    #[inline]
    pub fn is_enumerable(&self) -> bool {
        matches!(self, Step::All | Step::Filter(_) | Step::Items)
    }
}

/// A flattened expression node. Children are referenced by [`OpRef`].
#[derive(Debug, Clone)]
pub enum Op {
    Constant(Value),
    Parameter(SmolStr),
    Source,
    Document(SmallVec<[(SmolStr, OpRef); 4]>),
    Array(SmallVec<[OpRef; 4]>),
    Path {
        root: PathRoot,
        /// First member name, reported when the root binding is missing.
        field: SmolStr,
        steps: SmallVec<[Step; 4]>,
    },
    Map {
        source: OpRef,
        selector: OpRef,
    },
    Filter {
        source: OpRef,
        predicate: OpRef,
    },
    Sort {
        source: OpRef,
        key: OpRef,
        order: Option<OpRef>,
    },
    Call {
        function: &'static Builtin,
        args: SmallVec<[OpRef; 4]>,
    },
    Binary {
        op: BinaryOp,
        quantifier: Option<Quantifier>,
        left: OpRef,
        right: OpRef,
    },
    /// `LIKE` against a constant pattern compiled at build time.
    Like {
        quantifier: Option<Quantifier>,
        left: OpRef,
        pattern: LikePattern,
    },
    Logic {
        op: LogicOp,
        left: OpRef,
        right: OpRef,
    },
    Conditional {
        test: OpRef,
        if_true: OpRef,
        if_false: OpRef,
    },
}

/// An instruction plus the cardinality the grammar inferred for it.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: Op,
    pub is_scalar: bool,
}

/// Contiguous storage for the instructions of one expression.
#[derive(Debug, Clone, Default)]
pub struct OpPool {
    instructions: Vec<Instruction>,
}

impl OpPool {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instructions: Vec::with_capacity(capacity),
        }
    }

    pub fn alloc(&mut self, op: Op, is_scalar: bool) -> OpRef {
        let id = self.instructions.len() as u32;
        self.instructions.push(Instruction { op, is_scalar });
        OpRef::new(id)
    }

    /// # Panics
    ///
    /// Panics if `op_ref` was not allocated from this pool.
    #[inline(always)]
    pub fn get(&self, op_ref: OpRef) -> &Instruction {
        &self.instructions[op_ref.id() as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OpRef, &Instruction)> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, instruction)| (OpRef::new(i as u32), instruction))
    }
}

/// Canonical source text of each instruction, used in evaluation errors.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    sources: Vec<SmolStr>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sources: Vec::with_capacity(capacity),
        }
    }

    /// Registers the source of the next allocated instruction.
    pub fn register(&mut self, source: &str) -> OpRef {
        let id = self.sources.len() as u32;
        self.sources.push(SmolStr::new(source));
        OpRef::new(id)
    }

    #[inline]
    pub fn get(&self, op_ref: OpRef) -> &str {
        self.sources
            .get(op_ref.id() as usize)
            .map(SmolStr::as_str)
            .unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
