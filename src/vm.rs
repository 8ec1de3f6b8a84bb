//! Interpreter for [`Program`]s.
//!
//! Values are reference counted and immutable. Each call runs in its own
//! Rust frame, holding the callee's local and iterator slots; the operand
//! stack is shared. Open iterators are counted through guards, so the count
//! drops back as frames unwind, whether they return or fail.

use std::{cell::Cell, fmt, io, rc::Rc};

use thiserror::Error;

use crate::target::{BinaryInstr, Function, FunctionId, Instr, Intrinsic, Program};

type Result<T, E = RuntimeError> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Str(Rc<str>),
    /// A primitive wrapped to be used as a string operand.
    Boxed(Rc<Value>),
    Record(Rc<RecordValue>),
    Seq(Rc<[Value]>),
}

#[derive(Debug, PartialEq)]
pub struct RecordValue {
    pub name: Rc<str>,
    pub field_names: Rc<[Rc<str>]>,
    pub fields: Box<[Value]>,
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Boxed(_) => "boxed",
            Value::Record(_) => "record",
            Value::Seq(_) => "sequence",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
            Value::Boxed(inner) => write!(f, "{inner}"),
            Value::Record(record) => {
                write!(f, "{} {{ ", record.name)?;
                let fields = record.field_names.iter().zip(&*record.fields);
                for (i, (name, value)) in fields.enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
            Value::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("operand stack underflow in {function}")]
    StackUnderflow { function: String },
    #[error("operand stack exceeded {limit} values")]
    StackOverflow { limit: usize },
    #[error("{instr} expected a {expected}, but got a {actual}")]
    TypeMismatch {
        instr: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("{instr} expected a string or boxed operand, but got an unboxed {actual}")]
    Unboxed {
        instr: &'static str,
        actual: &'static str,
    },
    #[error("call depth exceeded {limit}")]
    CallDepthExceeded { limit: usize },
    #[error("range would hold more than {limit} elements")]
    RangeTooLarge { limit: usize },
    #[error("range step must be positive and finite, but is {step}")]
    InvalidStep { step: f64 },
    #[error("local slot {slot} read before being written")]
    UninitializedLocal { slot: u16 },
    #[error("iterator slot {slot} advanced before being acquired")]
    IteratorNotAcquired { slot: u16 },
    #[error("{what} {index} is out of bounds in {function}")]
    OutOfBounds {
        what: &'static str,
        index: usize,
        function: String,
    },
    #[error("failed to write output")]
    Io(#[from] io::Error),
}

/// Resource limits of a [`Machine`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_call_depth: usize,
    /// Largest sequence `GenerateList` may produce.
    pub max_range_len: usize,
    pub max_stack: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_call_depth: 1024,
            max_range_len: 1 << 20,
            max_stack: 1 << 16,
        }
    }
}

pub struct Machine<'p> {
    program: &'p Program,
    limits: Limits,
    stack: Vec<Value>,
    depth: usize,
    open_iterators: Rc<Cell<usize>>,
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p Program, limits: Limits) -> Machine<'p> {
        Machine {
            program,
            limits,
            stack: Vec::with_capacity(256),
            depth: 0,
            open_iterators: Rc::new(Cell::new(0)),
        }
    }

    /// Runs the entry point, which writes the result of `Main` to `out`.
    pub fn execute(&mut self, out: &mut impl io::Write) -> Result<()> {
        let program = self.program;
        tracing::debug!(functions = program.functions.len(), "executing");
        self.stack.clear();
        self.run(&program.entry, Vec::new(), out)?;
        Ok(())
    }

    /// Calls a single function, discarding anything it would write.
    pub fn call(&mut self, id: FunctionId, args: Vec<Value>) -> Result<Option<Value>> {
        let program = self.program;
        let function = program.function(id);
        self.stack.clear();
        self.run(function, args, &mut io::sink())
    }

    /// Number of iterators currently open, across all frames.
    pub fn open_iterators(&self) -> usize {
        self.open_iterators.get()
    }

    fn run(
        &mut self,
        function: &'p Function,
        args: Vec<Value>,
        out: &mut dyn io::Write,
    ) -> Result<Option<Value>> {
        if self.depth >= self.limits.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.limits.max_call_depth,
            });
        }
        self.depth += 1;
        let result = Frame::new(function, args).run(self, out);
        self.depth -= 1;
        result
    }

    fn push(&mut self, value: Value) -> Result<()> {
        if self.stack.len() >= self.limits.max_stack {
            return Err(RuntimeError::StackOverflow {
                limit: self.limits.max_stack,
            });
        }
        self.stack.push(value);
        Ok(())
    }
}

struct Frame<'p> {
    function: &'p Function,
    args: Vec<Value>,
    locals: Vec<Option<Value>>,
    iterators: Vec<Option<SeqIter>>,
    /// Operand stack height when the frame was entered.
    base: usize,
}

impl<'p> Frame<'p> {
    fn new(function: &'p Function, args: Vec<Value>) -> Frame<'p> {
        Frame {
            function,
            args,
            locals: vec![None; usize::from(function.locals)],
            iterators: (0..function.iterators).map(|_| None).collect(),
            base: 0,
        }
    }

    fn run(mut self, m: &mut Machine<'p>, out: &mut dyn io::Write) -> Result<Option<Value>> {
        self.base = m.stack.len();
        let program = m.program;
        let function = self.function;
        let code = &function.code;
        let mut pc = 0;

        loop {
            let Some(instr) = code.get(pc) else {
                return Err(self.out_of_bounds("instruction", pc));
            };
            pc += 1;

            match instr {
                Instr::PushNumber(n) => m.push(Value::Number(*n))?,
                Instr::PushString(s) => m.push(Value::Str(Rc::clone(s)))?,
                Instr::PushBool(b) => m.push(Value::Bool(*b))?,
                Instr::LoadParam(index) => {
                    let index = usize::from(*index);
                    let Some(value) = self.args.get(index).cloned() else {
                        return Err(self.out_of_bounds("parameter", index));
                    };
                    m.push(value)?;
                }
                Instr::LoadLocal(slot) => {
                    let value = self.local(*slot)?.clone();
                    m.push(value)?;
                }
                Instr::StoreLocal(slot) => {
                    let value = self.pop(m)?;
                    let Some(local) = self.locals.get_mut(usize::from(*slot)) else {
                        return Err(self.out_of_bounds("local", usize::from(*slot)));
                    };
                    *local = Some(value);
                }
                Instr::LoadField(field) => {
                    let record = match self.pop(m)? {
                        Value::Record(record) => record,
                        other => return Err(mismatch("load.field", "record", &other)),
                    };
                    let index = usize::from(field.index);
                    let Some(value) = record.fields.get(index).cloned() else {
                        return Err(self.out_of_bounds("field", index));
                    };
                    m.push(value)?;
                }
                Instr::Construct(id) => {
                    let layout = program.record(*id);
                    let args = self.pop_n(m, layout.constructor.len())?;
                    let mut fields = vec![Value::Bool(false); layout.fields.len()];
                    for (arg, &index) in args.into_iter().zip(&layout.constructor) {
                        fields[usize::from(index)] = arg;
                    }
                    m.push(Value::Record(Rc::new(RecordValue {
                        name: Rc::clone(&layout.name),
                        field_names: Rc::clone(&layout.fields),
                        fields: fields.into_boxed_slice(),
                    })))?;
                }
                Instr::Call(id) => {
                    let callee = program.function(*id);
                    let args = self.pop_n(m, usize::from(callee.params))?;
                    match m.run(callee, args, out)? {
                        Some(value) => m.push(value)?,
                        None => return Err(self.underflow()),
                    }
                }
                Instr::Branch(label) => pc = function.label_target(*label),
                Instr::BranchIfFalse(label) => match self.pop(m)? {
                    Value::Bool(true) => {}
                    Value::Bool(false) => pc = function.label_target(*label),
                    other => return Err(mismatch("br.false", "bool", &other)),
                },
                Instr::Mark(_) => {}
                Instr::Binary(op) => {
                    let rhs = self.pop(m)?;
                    let lhs = self.pop(m)?;
                    m.push(binary(*op, lhs, rhs)?)?;
                }
                Instr::Box => {
                    let value = self.pop(m)?;
                    m.push(Value::Boxed(Rc::new(value)))?;
                }
                Instr::Pop => {
                    self.pop(m)?;
                }
                Instr::Intrinsic(Intrinsic::GenerateList) => {
                    let step = self.pop_number(m, "generate_list")?;
                    let to = self.pop_number(m, "generate_list")?;
                    let from = self.pop_number(m, "generate_list")?;
                    let list = generate_list(from, to, step, m.limits.max_range_len)?;
                    m.push(Value::Seq(list.into()))?;
                }
                Instr::Intrinsic(Intrinsic::WriteLine) => {
                    let value = self.pop(m)?;
                    writeln!(out, "{value}")?;
                }
                Instr::AcquireIterator(slot) => {
                    let items = match self.pop(m)? {
                        Value::Seq(items) => items,
                        other => return Err(mismatch("iter.acquire", "sequence", &other)),
                    };
                    let iter = SeqIter::new(items, &m.open_iterators);
                    let index = usize::from(*slot);
                    let Some(iterator) = self.iterators.get_mut(index) else {
                        return Err(self.out_of_bounds("iterator", index));
                    };
                    *iterator = Some(iter);
                }
                Instr::AdvanceIterator { slot, exit } => {
                    let Some(Some(iter)) = self.iterators.get_mut(usize::from(*slot)) else {
                        return Err(RuntimeError::IteratorNotAcquired { slot: *slot });
                    };
                    match iter.next() {
                        Some(value) => m.push(value)?,
                        None => pc = function.label_target(*exit),
                    }
                }
                Instr::ReleaseIterator(slot) => {
                    if let Some(iterator) = self.iterators.get_mut(usize::from(*slot)) {
                        *iterator = None;
                    }
                }
                Instr::Return => {
                    let value = if m.stack.len() > self.base {
                        m.stack.pop()
                    } else {
                        None
                    };
                    m.stack.truncate(self.base);
                    return Ok(value);
                }
            }
        }
    }

    fn pop(&self, m: &mut Machine<'_>) -> Result<Value> {
        if m.stack.len() <= self.base {
            return Err(self.underflow());
        }
        m.stack.pop().ok_or_else(|| self.underflow())
    }

    fn pop_n(&self, m: &mut Machine<'_>, n: usize) -> Result<Vec<Value>> {
        if m.stack.len() < self.base + n {
            return Err(self.underflow());
        }
        Ok(m.stack.split_off(m.stack.len() - n))
    }

    fn pop_number(&self, m: &mut Machine<'_>, instr: &'static str) -> Result<f64> {
        match self.pop(m)? {
            Value::Number(n) => Ok(n),
            other => Err(mismatch(instr, "number", &other)),
        }
    }

    fn local(&self, slot: u16) -> Result<&Value> {
        match self.locals.get(usize::from(slot)) {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(RuntimeError::UninitializedLocal { slot }),
            None => Err(self.out_of_bounds("local", usize::from(slot))),
        }
    }

    fn underflow(&self) -> RuntimeError {
        RuntimeError::StackUnderflow {
            function: self.function.name.clone(),
        }
    }

    fn out_of_bounds(&self, what: &'static str, index: usize) -> RuntimeError {
        RuntimeError::OutOfBounds {
            what,
            index,
            function: self.function.name.clone(),
        }
    }
}

fn binary(op: BinaryInstr, lhs: Value, rhs: Value) -> Result<Value> {
    use Value::{Bool, Number};

    let value = match (op, &lhs, &rhs) {
        (BinaryInstr::Add, Number(a), Number(b)) => Number(a + b),
        (BinaryInstr::Sub, Number(a), Number(b)) => Number(a - b),
        (BinaryInstr::Mul, Number(a), Number(b)) => Number(a * b),
        (BinaryInstr::Div, Number(a), Number(b)) => Number(a / b),
        (BinaryInstr::Rem, Number(a), Number(b)) => Number(a % b),
        (BinaryInstr::Gt, Number(a), Number(b)) => Bool(a > b),
        (BinaryInstr::Lt, Number(a), Number(b)) => Bool(a < b),
        #[allow(clippy::float_cmp)]
        (BinaryInstr::Eq, Number(a), Number(b)) => Bool(a == b),
        #[allow(clippy::float_cmp)]
        (BinaryInstr::Ne, Number(a), Number(b)) => Bool(a != b),
        (BinaryInstr::Eq, Bool(a), Bool(b)) => Bool(a == b),
        (BinaryInstr::Ne, Bool(a), Bool(b)) => Bool(a != b),
        (BinaryInstr::And, Bool(a), Bool(b)) => Bool(*a && *b),
        (BinaryInstr::Or, Bool(a), Bool(b)) => Bool(*a || *b),
        (BinaryInstr::Concat, _, _) => {
            let joined = string_operand("concat", &lhs)? + &string_operand("concat", &rhs)?;
            Value::Str(joined.into())
        }
        (BinaryInstr::StrEq | BinaryInstr::StrNe, _, _) => {
            let instr = op.mnemonic();
            let equal = string_operand(instr, &lhs)? == string_operand(instr, &rhs)?;
            Bool(equal == (op == BinaryInstr::StrEq))
        }
        (BinaryInstr::RefEq | BinaryInstr::RefNe, Value::Record(a), Value::Record(b)) => {
            Bool(Rc::ptr_eq(a, b) == (op == BinaryInstr::RefEq))
        }
        _ => {
            let expected = expected_operand(op);
            let offender = if lhs.kind() == expected { &rhs } else { &lhs };
            return Err(mismatch(op.mnemonic(), expected, offender));
        }
    };
    Ok(value)
}

fn mismatch(instr: &'static str, expected: &'static str, actual: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        instr,
        expected,
        actual: actual.kind(),
    }
}

fn expected_operand(op: BinaryInstr) -> &'static str {
    match op {
        BinaryInstr::And | BinaryInstr::Or => "bool",
        BinaryInstr::RefEq | BinaryInstr::RefNe => "record",
        BinaryInstr::Concat | BinaryInstr::StrEq | BinaryInstr::StrNe => "string",
        _ => "number",
    }
}

/// String instructions take strings, or primitives that were boxed first.
fn string_operand(instr: &'static str, value: &Value) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        Value::Boxed(inner) => Ok(inner.to_string()),
        other => Err(RuntimeError::Unboxed {
            instr,
            actual: other.kind(),
        }),
    }
}

/// Numbers from `from` towards `to`, excluding `to`. Counts down when `to`
/// is below `from`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn generate_list(from: f64, to: f64, step: f64, limit: usize) -> Result<Vec<Value>> {
    if !step.is_finite() || step <= 0.0 {
        return Err(RuntimeError::InvalidStep { step });
    }
    let span = (to - from).abs() / step;
    if !span.is_finite() || span > limit as f64 {
        return Err(RuntimeError::RangeTooLarge { limit });
    }

    // Each element is computed from its index, since repeatedly adding a
    // small step to a large bound may not move it.
    let count = span.ceil() as usize;
    let ascending = to >= from;
    let list = (0..count)
        .map(|k| {
            let offset = k as f64 * step;
            if ascending {
                from + offset
            } else {
                from - offset
            }
        })
        .take_while(|&n| if ascending { n < to } else { n > to })
        .map(Value::Number)
        .collect();
    Ok(list)
}

/// Keeps the count of open iterators up to date for as long as it lives.
struct IterGuard(Rc<Cell<usize>>);

impl IterGuard {
    fn new(count: &Rc<Cell<usize>>) -> IterGuard {
        count.set(count.get() + 1);
        IterGuard(Rc::clone(count))
    }
}

impl Drop for IterGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

struct SeqIter {
    items: Rc<[Value]>,
    next: usize,
    _guard: IterGuard,
}

impl SeqIter {
    fn new(items: Rc<[Value]>, count: &Rc<Cell<usize>>) -> SeqIter {
        SeqIter {
            items,
            next: 0,
            _guard: IterGuard::new(count),
        }
    }
}

impl Iterator for SeqIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let item = self.items.get(self.next)?.clone();
        self.next += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{FunctionBuilder, RecordId, RecordLayout};

    fn program(functions: Vec<Function>) -> Program {
        let mut entry = FunctionBuilder::new("Execute".into(), 0);
        entry.emit(Instr::Call(FunctionId(0)));
        entry.emit(Instr::Intrinsic(Intrinsic::WriteLine));
        entry.emit(Instr::Return);
        Program {
            functions,
            records: Vec::new(),
            entry: entry.finish(),
        }
    }

    fn function(name: &str, params: u16, code: impl IntoIterator<Item = Instr>) -> Function {
        let mut b = FunctionBuilder::new(name.into(), params);
        for instr in code {
            b.emit(instr);
        }
        b.finish()
    }

    fn numbers(values: &[f64]) -> Vec<Value> {
        values.iter().copied().map(Value::Number).collect()
    }

    #[test]
    fn ranges_exclude_upper_bound() {
        let limit = Limits::default().max_range_len;
        assert_eq!(generate_list(1.0, 5.0, 1.0, limit).unwrap(), numbers(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(generate_list(5.0, 1.0, 1.0, limit).unwrap(), numbers(&[5.0, 4.0, 3.0, 2.0]));
        assert_eq!(generate_list(0.0, 10.0, 4.0, limit).unwrap(), numbers(&[0.0, 4.0, 8.0]));
        assert_eq!(generate_list(3.0, 3.0, 1.0, limit).unwrap(), Vec::new());
    }

    #[test]
    fn ranges_reject_bad_steps_and_sizes() {
        assert!(matches!(
            generate_list(0.0, 3.0, 0.0, 100),
            Err(RuntimeError::InvalidStep { .. })
        ));
        assert!(matches!(
            generate_list(0.0, 3.0, -1.0, 100),
            Err(RuntimeError::InvalidStep { .. })
        ));
        assert!(matches!(
            generate_list(0.0, 3.0, f64::NAN, 100),
            Err(RuntimeError::InvalidStep { .. })
        ));
        assert!(matches!(
            generate_list(0.0, 1000.0, 1.0, 100),
            Err(RuntimeError::RangeTooLarge { limit: 100 })
        ));
        assert!(matches!(
            generate_list(0.0, f64::INFINITY, 1.0, 100),
            Err(RuntimeError::RangeTooLarge { .. })
        ));
    }

    #[test]
    fn ranges_over_coarse_floats_terminate() {
        let (from, to) = (1e17, 1e17 + 100.0);
        let list = generate_list(from, to, 1.0, Limits::default().max_range_len).unwrap();
        assert!(list.len() <= 96);
        assert!(list
            .iter()
            .all(|v| matches!(v, Value::Number(n) if *n >= from && *n < to)));

        assert!(matches!(
            generate_list(0.0, 1e17, 1.0, 1 << 20),
            Err(RuntimeError::RangeTooLarge { .. })
        ));
    }

    #[test]
    fn display() {
        let point = Value::Record(Rc::new(RecordValue {
            name: "Point".into(),
            field_names: Rc::from(vec![Rc::from("a"), Rc::from("b")]),
            fields: vec![Value::Number(1.0), Value::Str("x".into())].into(),
        }));
        assert_eq!(point.to_string(), "Point { a: 1, b: x }");
        assert_eq!(Value::Seq(numbers(&[1.0, 2.5]).into()).to_string(), "[1, 2.5]");
        assert_eq!(Value::Seq(numbers(&[]).into()).to_string(), "[]");
        assert_eq!(Value::Boxed(Rc::new(Value::Bool(true))).to_string(), "true");
    }

    #[test]
    fn writes_main_result() {
        let main = function(
            "Main",
            0,
            [
                Instr::PushString("n=".into()),
                Instr::PushNumber(3.0),
                Instr::Box,
                Instr::Binary(BinaryInstr::Concat),
                Instr::Return,
            ],
        );
        let program = program(vec![main]);
        let mut out = Vec::new();
        Machine::new(&program, Limits::default()).execute(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "n=3\n");
    }

    #[test]
    fn string_instructions_reject_unboxed_primitives() {
        let main = function(
            "Main",
            0,
            [
                Instr::PushString("n=".into()),
                Instr::PushNumber(3.0),
                Instr::Binary(BinaryInstr::Concat),
                Instr::Return,
            ],
        );
        let program = program(vec![main]);
        let err = Machine::new(&program, Limits::default())
            .execute(&mut Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Unboxed {
                instr: "concat",
                actual: "number"
            }
        ));
    }

    #[test]
    fn constructs_and_compares_records() {
        let mut main = function(
            "Main",
            0,
            [
                Instr::PushNumber(1.0),
                Instr::PushNumber(2.0),
                Instr::Construct(RecordId(0)),
                Instr::StoreLocal(0),
                Instr::LoadLocal(0),
                Instr::LoadLocal(0),
                Instr::Binary(BinaryInstr::RefEq),
                Instr::Return,
            ],
        );
        main.locals = 1;
        let mut program = program(vec![main]);
        program.records.push(RecordLayout {
            name: "P".into(),
            fields: Rc::from(vec![Rc::from("a"), Rc::from("b")]),
            constructor: vec![0, 1],
        });
        let mut machine = Machine::new(&program, Limits::default());
        assert_eq!(machine.call(FunctionId(0), Vec::new()).unwrap(), Some(Value::Bool(true)));
    }

    #[test]
    fn call_depth_is_limited() {
        let recurse = function("Down", 0, [Instr::Call(FunctionId(0)), Instr::Return]);
        let program = program(vec![recurse]);
        let limits = Limits {
            max_call_depth: 8,
            ..Limits::default()
        };
        let err = Machine::new(&program, limits)
            .execute(&mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::CallDepthExceeded { limit: 8 }));
    }

    #[test]
    fn iterators_are_released_when_frames_fail() {
        let mut b = FunctionBuilder::new("Main".into(), 0);
        let slot = b.alloc_iterator().unwrap();
        let exit = b.new_label().unwrap();
        b.emit(Instr::PushNumber(0.0));
        b.emit(Instr::PushNumber(3.0));
        b.emit(Instr::PushNumber(1.0));
        b.emit(Instr::Intrinsic(Intrinsic::GenerateList));
        b.emit(Instr::AcquireIterator(slot));
        b.emit(Instr::AdvanceIterator { slot, exit });
        b.emit(Instr::PushBool(true));
        b.emit(Instr::Binary(BinaryInstr::Add));
        b.mark(exit);
        b.emit(Instr::ReleaseIterator(slot));
        b.emit(Instr::Return);
        let program = program(vec![b.finish()]);

        let mut machine = Machine::new(&program, Limits::default());
        let err = machine.call(FunctionId(0), Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::TypeMismatch {
                instr: "add",
                actual: "bool",
                ..
            }
        ));
        assert_eq!(machine.open_iterators(), 0);
    }

    #[test]
    fn iterator_guard_counts() {
        let count = Rc::new(Cell::new(0));
        let first = SeqIter::new(numbers(&[1.0]).into(), &count);
        let second = SeqIter::new(numbers(&[]).into(), &count);
        assert_eq!(count.get(), 2);
        drop(first);
        assert_eq!(count.get(), 1);
        drop(second);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn missing_result_underflows() {
        let empty = function("Main", 0, [Instr::Return]);
        let program = program(vec![empty]);
        let err = Machine::new(&program, Limits::default())
            .execute(&mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::StackUnderflow { function } if function == "Execute"));
    }
}
