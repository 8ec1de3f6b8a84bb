//! The abstract stack machine that programs are lowered to.
//!
//! Every function owns a flat instruction stream. Control flow goes through
//! labels, which are allocated and marked through a [`FunctionBuilder`] and
//! resolved to instruction indices when the function is finished.

use std::{fmt, io, rc::Rc};

use crate::error::LowerError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Label(u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldRef {
    pub record: RecordId,
    pub index: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instr {
    PushNumber(f64),
    PushString(Rc<str>),
    PushBool(bool),
    LoadParam(u16),
    LoadLocal(u16),
    StoreLocal(u16),
    LoadField(FieldRef),
    /// Pops one value per field, last field on top.
    Construct(RecordId),
    /// Pops one value per parameter, last parameter on top.
    Call(FunctionId),
    Branch(Label),
    BranchIfFalse(Label),
    Mark(Label),
    Binary(BinaryInstr),
    /// Wraps a primitive so that string instructions accept it.
    Box,
    Pop,
    Intrinsic(Intrinsic),
    /// Pops a sequence and opens an iterator over it in the given slot.
    AcquireIterator(u16),
    /// Pushes the next element, or jumps to `exit` once exhausted.
    AdvanceIterator { slot: u16, exit: Label },
    ReleaseIterator(u16),
    Return,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryInstr {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Gt,
    Lt,
    /// Numeric or boolean equality.
    Eq,
    Ne,
    And,
    Or,
    Concat,
    StrEq,
    StrNe,
    RefEq,
    RefNe,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Intrinsic {
    /// Pops `step`, `to` and `from` (in that order) and pushes the list.
    GenerateList,
    /// Pops a value and writes its rendering as a line.
    WriteLine,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: u16,
    pub locals: u16,
    pub iterators: u16,
    pub code: Vec<Instr>,
    /// Instruction index of each label's mark.
    pub labels: Vec<usize>,
}

impl Function {
    pub fn label_target(&self, label: Label) -> usize {
        self.labels[label.0 as usize]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordLayout {
    pub name: Rc<str>,
    pub fields: Rc<[Rc<str>]>,
    /// Field index initialized by each constructor argument.
    pub constructor: Vec<u16>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
    pub records: Vec<RecordLayout>,
    /// Calls `Main` and writes its result.
    pub entry: Function,
}

impl Program {
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn record(&self, id: RecordId) -> &RecordLayout {
        &self.records[id.0 as usize]
    }

    pub fn write_listing(&self, writer: impl io::Write) -> io::Result<()> {
        Listing {
            writer,
            program: self,
            indent: false,
        }
        .write()
    }

    pub fn listing(&self) -> String {
        let mut buf = Vec::with_capacity(4 * 1024);
        self.write_listing(&mut buf)
            .expect("writing to a vec is infallible");
        String::from_utf8(buf).expect("listing is utf-8")
    }
}

/// Accumulates the instructions of one function.
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    params: u16,
    locals: u16,
    iterators: u16,
    code: Vec<Instr>,
    labels: Vec<Option<usize>>,
}

impl FunctionBuilder {
    pub fn new(name: String, params: u16) -> FunctionBuilder {
        FunctionBuilder {
            name,
            params,
            locals: 0,
            iterators: 0,
            code: Vec::with_capacity(32),
            labels: Vec::new(),
        }
    }

    pub fn emit(&mut self, instr: Instr) {
        self.code.push(instr);
    }

    pub fn new_label(&mut self) -> Result<Label, LowerError> {
        let label = u32::try_from(self.labels.len())
            .map(Label)
            .map_err(|_| LowerError::TooMany { what: "labels" })?;
        self.labels.push(None);
        Ok(label)
    }

    /// Defines `label` at the current position.
    pub fn mark(&mut self, label: Label) {
        debug_assert!(self.labels[label.0 as usize].is_none(), "label marked twice");
        self.labels[label.0 as usize] = Some(self.code.len());
        self.code.push(Instr::Mark(label));
    }

    pub fn alloc_local(&mut self) -> Result<u16, LowerError> {
        let slot = self.locals;
        self.locals = slot
            .checked_add(1)
            .ok_or(LowerError::TooMany { what: "locals" })?;
        Ok(slot)
    }

    pub fn alloc_iterator(&mut self) -> Result<u16, LowerError> {
        let slot = self.iterators;
        self.iterators = slot
            .checked_add(1)
            .ok_or(LowerError::TooMany { what: "iterators" })?;
        Ok(slot)
    }

    pub fn finish(self) -> Function {
        let labels = self
            .labels
            .into_iter()
            .map(|target| target.expect("every label is marked"))
            .collect();
        tracing::trace!(
            name = %self.name,
            instrs = self.code.len(),
            "finished function"
        );
        Function {
            name: self.name,
            params: self.params,
            locals: self.locals,
            iterators: self.iterators,
            code: self.code,
            labels,
        }
    }
}

struct Listing<'p, W> {
    writer: W,
    program: &'p Program,
    indent: bool,
}

impl<W: io::Write> Listing<'_, W> {
    fn write(mut self) -> io::Result<()> {
        let program = self.program;
        for record in &program.records {
            let fields = record.fields.join(" ");
            self.out(format_args!(".record {} {{ {fields} }}", record.name))?;
        }
        if !program.records.is_empty() {
            self.out_line()?;
        }
        for function in &program.functions {
            self.function(function)?;
        }
        self.function(&program.entry)
    }

    fn function(&mut self, function: &Function) -> io::Result<()> {
        self.out(format_args!(
            ".func {} params={} locals={} iterators={}",
            function.name, function.params, function.locals, function.iterators
        ))?;
        self.indented(|this| {
            for instr in &function.code {
                match instr {
                    Instr::Mark(label) => {
                        this.indent = false;
                        this.out(format_args!("{}:", LabelName(*label)))?;
                        this.indent = true;
                    }
                    instr => this.instr(instr)?,
                }
            }
            Ok(())
        })
    }

    fn instr(&mut self, instr: &Instr) -> io::Result<()> {
        let program = self.program;
        match instr {
            Instr::PushNumber(n) => self.out(format_args!("push.num {n}")),
            Instr::PushString(s) => self.out(format_args!("push.str {s:?}")),
            Instr::PushBool(b) => self.out(format_args!("push.bool {b}")),
            Instr::LoadParam(i) => self.out(format_args!("load.param {i}")),
            Instr::LoadLocal(i) => self.out(format_args!("load.local {i}")),
            Instr::StoreLocal(i) => self.out(format_args!("store.local {i}")),
            Instr::LoadField(field) => {
                let record = program.record(field.record);
                let name = &record.fields[usize::from(field.index)];
                self.out(format_args!("load.field {}.{name}", record.name))
            }
            Instr::Construct(id) => {
                let record = program.record(*id);
                self.out(format_args!("construct {}", record.name))
            }
            Instr::Call(id) => self.out(format_args!("call {}", program.function(*id).name)),
            Instr::Branch(label) => self.out(format_args!("br {}", LabelName(*label))),
            Instr::BranchIfFalse(label) => {
                self.out(format_args!("br.false {}", LabelName(*label)))
            }
            Instr::Mark(label) => self.out(format_args!("{}:", LabelName(*label))),
            Instr::Binary(op) => self.out(format_args!("{}", op.mnemonic())),
            Instr::Box => self.out("box"),
            Instr::Pop => self.out("pop"),
            Instr::Intrinsic(Intrinsic::GenerateList) => self.out("intrinsic generate_list"),
            Instr::Intrinsic(Intrinsic::WriteLine) => self.out("intrinsic write_line"),
            Instr::AcquireIterator(slot) => self.out(format_args!("iter.acquire {slot}")),
            Instr::AdvanceIterator { slot, exit } => {
                self.out(format_args!("iter.advance {slot} {}", LabelName(*exit)))
            }
            Instr::ReleaseIterator(slot) => self.out(format_args!("iter.release {slot}")),
            Instr::Return => self.out("ret"),
        }
    }

    /// Prints a line.
    fn out(&mut self, f: impl fmt::Display) -> io::Result<()> {
        let indent = if self.indent { "    " } else { "" };
        writeln!(self.writer, "{indent}{f}")
    }

    /// Prints an empty line.
    fn out_line(&mut self) -> io::Result<()> {
        writeln!(self.writer)
    }

    /// Writes in an indented block that is finished with an empty line.
    fn indented(&mut self, f: impl FnOnce(&mut Self) -> io::Result<()>) -> io::Result<()> {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        res?;
        self.out_line()
    }
}

struct LabelName(Label);

impl fmt::Display for LabelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0 .0)
    }
}

impl BinaryInstr {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryInstr::Add => "add",
            BinaryInstr::Sub => "sub",
            BinaryInstr::Mul => "mul",
            BinaryInstr::Div => "div",
            BinaryInstr::Rem => "rem",
            BinaryInstr::Gt => "gt",
            BinaryInstr::Lt => "lt",
            BinaryInstr::Eq => "eq",
            BinaryInstr::Ne => "ne",
            BinaryInstr::And => "and",
            BinaryInstr::Or => "or",
            BinaryInstr::Concat => "concat",
            BinaryInstr::StrEq => "str.eq",
            BinaryInstr::StrNe => "str.ne",
            BinaryInstr::RefEq => "ref.eq",
            BinaryInstr::RefNe => "ref.ne",
        }
    }
}
