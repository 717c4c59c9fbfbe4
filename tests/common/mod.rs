// Reference stack evaluator for compiled Lingo bytecode
//
// Covers the opcodes the integration tests exercise. Built-in commands are
// not executed; they are recorded in `calls` together with their arguments.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fmt;

use lingoc::lingo_compiler::{
    CompiledScript, LingoCompiler, NavigationSelector, Opcode, ScriptBuffer,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
    Void,
    /// Target of `VARPUSH`, consumed by `ASSIGN`
    Name(String),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Void | Value::Name(_) => false,
        }
    }

    fn int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Str(s) => s.parse().unwrap_or(0),
            Value::Void | Value::Name(_) => 0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) | Value::Name(s) => write!(f, "{}", s),
            Value::Void => write!(f, "<void>"),
        }
    }
}

/// How a run over a code range ended
#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    Stop,
    Return,
    ExitRepeat,
    NextRepeat,
}

#[derive(Default)]
struct Frame {
    locals: HashMap<String, Value>,
    declared_globals: HashSet<String>,
    stack: Vec<Value>,
}

pub struct Machine<'a> {
    script: &'a CompiledScript,
    globals: HashMap<String, Value>,
    /// Everything `put` printed, in order
    pub output: Vec<String>,
    /// Calls to names that are not handlers of the unit
    pub calls: Vec<(String, Vec<Value>)>,
    /// Events registered with `when`
    pub events: Vec<String>,
    /// Targets of `tell`
    pub told: Vec<Value>,
    /// `go`/`play` requests as (opcode, selector, operands)
    pub navigation: Vec<(Opcode, i64, Vec<Value>)>,
    steps: usize,
}

const STEP_LIMIT: usize = 100_000;

impl<'a> Machine<'a> {
    pub fn new(script: &'a CompiledScript) -> Self {
        Machine {
            script,
            globals: HashMap::new(),
            output: Vec::new(),
            calls: Vec::new(),
            events: Vec::new(),
            told: Vec::new(),
            navigation: Vec::new(),
            steps: 0,
        }
    }

    /// Run the top-level code
    pub fn run(&mut self) {
        let script = self.script;
        let mut frame = Frame::default();
        self.execute(&script.code, 0, &mut frame);
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    fn call_handler(&mut self, name: &str, args: Vec<Value>) -> bool {
        let script = self.script;
        let Some(handler) = script.handler(name) else {
            return false;
        };
        let mut frame = Frame::default();
        frame.stack = args;
        self.execute(&handler.code, handler.entry.index(), &mut frame);
        true
    }

    fn execute(&mut self, code: &ScriptBuffer, start: usize, frame: &mut Frame) -> Flow {
        let words = code.words();
        let string = |index: usize| -> String {
            code.string(words[index].as_index())
                .unwrap_or_default()
                .to_string()
        };
        let mut pc = start;
        loop {
            self.steps += 1;
            assert!(self.steps < STEP_LIMIT, "step limit reached at {}", pc);
            let op = words[pc]
                .as_opcode()
                .unwrap_or_else(|| panic!("no opcode at {}", pc));
            let operand = |n: usize| words[pc + n].as_int();

            match op {
                Opcode::Stop => return Flow::Stop,
                Opcode::Return => return Flow::Return,
                Opcode::ExitRepeat => return Flow::ExitRepeat,
                Opcode::NextRepeat => return Flow::NextRepeat,

                Opcode::If => {
                    let condition = pop(frame).truthy();
                    let (then, otherwise, end, skip) =
                        (operand(1), operand(2), operand(3), operand(4));
                    let after = (pc as i64 + end + skip) as usize;
                    if condition {
                        let body = if then == 0 { pc + 5 } else { (pc as i64 + then) as usize };
                        let flow = self.execute(code, body, frame);
                        if flow != Flow::Stop {
                            return flow;
                        }
                        pc = after;
                    } else if otherwise != 0 {
                        pc = (pc as i64 + otherwise) as usize;
                    } else {
                        pc = after;
                    }
                    continue;
                }
                Opcode::RepeatWhile => {
                    let body = (pc as i64 + operand(1)) as usize;
                    let end = (pc as i64 + operand(2)) as usize;
                    loop {
                        self.execute(code, pc + 3, frame);
                        if !pop(frame).truthy() {
                            break;
                        }
                        match self.execute(code, body, frame) {
                            Flow::ExitRepeat => break,
                            Flow::Return => return Flow::Return,
                            Flow::Stop | Flow::NextRepeat => {}
                        }
                    }
                    pc = end;
                    continue;
                }
                Opcode::RepeatWith => {
                    let at = |n: usize| (pc as i64 + operand(n)) as usize;
                    let variable = string(pc + 6);
                    self.execute(code, at(1), frame);
                    let mut i = pop(frame).int();
                    self.execute(code, at(2), frame);
                    let finish = pop(frame).int();
                    let step = operand(4);
                    while (step > 0 && i <= finish) || (step < 0 && i >= finish) {
                        self.store(frame, &variable, Value::Int(i));
                        match self.execute(code, at(3), frame) {
                            Flow::ExitRepeat => break,
                            Flow::Return => return Flow::Return,
                            Flow::Stop | Flow::NextRepeat => {}
                        }
                        i += step;
                    }
                    pc = at(5);
                    continue;
                }
                Opcode::TellCode => {
                    let target = pop(frame);
                    self.told.push(target);
                    let flow = self.execute(code, pc + 2, frame);
                    if flow != Flow::Stop {
                        return flow;
                    }
                    pc = (pc as i64 + operand(1)) as usize;
                    continue;
                }
                Opcode::WhenCode => {
                    self.events.push(string(pc + 2));
                    pc = (pc as i64 + operand(1)) as usize;
                    continue;
                }
                Opcode::ArgStore => {
                    let count = operand(1) as usize;
                    let args: Vec<Value> = frame.stack.drain(..).collect();
                    for (index, value) in args.into_iter().enumerate().take(count) {
                        let name = string(pc + 2 + index);
                        frame.locals.insert(name, value);
                    }
                    pc += 2 + count;
                    continue;
                }

                Opcode::Nop => {}
                Opcode::IntPush => frame.stack.push(Value::Int(operand(1))),
                Opcode::StringPush | Opcode::SymbolPush => {
                    frame.stack.push(Value::Str(string(pc + 1)))
                }
                Opcode::VoidPush => frame.stack.push(Value::Void),
                Opcode::Eval => {
                    let value = self.load(frame, &string(pc + 1));
                    frame.stack.push(value);
                }
                Opcode::VarPush => frame.stack.push(Value::Name(string(pc + 1))),
                Opcode::Assign => {
                    let Value::Name(name) = pop(frame) else {
                        panic!("ASSIGN without a target at {}", pc);
                    };
                    let value = pop(frame);
                    self.store(frame, &name, value);
                }
                Opcode::After | Opcode::Before => {
                    let current = pop(frame).to_string();
                    let piece = pop(frame).to_string();
                    let joined = if op == Opcode::After {
                        current + &piece
                    } else {
                        piece + &current
                    };
                    frame.stack.push(Value::Str(joined));
                }
                Opcode::Global => {
                    frame.declared_globals.insert(string(pc + 1));
                }
                Opcode::PrintTop => {
                    let value = pop(frame);
                    self.output.push(value.to_string());
                }
                Opcode::Call | Opcode::ProcCall => {
                    let name = string(pc + 1);
                    let count = operand(2) as usize;
                    let args = frame.stack.split_off(frame.stack.len() - count);
                    if !self.call_handler(&name, args.clone()) {
                        self.calls.push((name, args));
                    }
                    if op == Opcode::Call {
                        frame.stack.push(Value::Void);
                    }
                }
                Opcode::Goto | Opcode::Play => {
                    let selector = pop(frame).int();
                    let count = match NavigationSelector::from_i64(selector) {
                        Some(NavigationSelector::Frame | NavigationSelector::Movie) => 1,
                        Some(NavigationSelector::FrameOfMovie) => 2,
                        _ => 0,
                    };
                    let operands = frame.stack.split_off(frame.stack.len() - count);
                    self.navigation.push((op, selector, operands));
                }
                Opcode::Negate => {
                    let value = pop(frame).int();
                    frame.stack.push(Value::Int(-value));
                }
                Opcode::Not => {
                    let value = pop(frame).truthy();
                    frame.stack.push(Value::Int(!value as i64));
                }
                Opcode::Ampersand | Opcode::Concat => {
                    let right = pop(frame).to_string();
                    let left = pop(frame).to_string();
                    let joined = if op == Opcode::Concat {
                        format!("{} {}", left, right)
                    } else {
                        left + &right
                    };
                    frame.stack.push(Value::Str(joined));
                }
                Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Gt
                | Opcode::Lt
                | Opcode::Ge
                | Opcode::Le
                | Opcode::And
                | Opcode::Or => {
                    let right = pop(frame);
                    let left = pop(frame);
                    frame.stack.push(Value::Int(arithmetic(op, &left, &right)));
                }
                Opcode::Eq | Opcode::Neq => {
                    let right = pop(frame);
                    let left = pop(frame);
                    let equal = match (&left, &right) {
                        (Value::Str(a), Value::Str(b)) => a.eq_ignore_ascii_case(b),
                        _ => left.int() == right.int(),
                    };
                    frame.stack.push(Value::Int((equal == (op == Opcode::Eq)) as i64));
                }
                other => panic!("evaluator does not support {} at {}", other, pc),
            }

            pc += op
                .fixed_width()
                .unwrap_or_else(|| panic!("variable width {} at {}", op, pc));
        }
    }

    fn load(&self, frame: &Frame, name: &str) -> Value {
        if !frame.declared_globals.contains(name) {
            if let Some(value) = frame.locals.get(name) {
                return value.clone();
            }
        }
        self.globals.get(name).cloned().unwrap_or(Value::Void)
    }

    fn store(&mut self, frame: &mut Frame, name: &str, value: Value) {
        if frame.declared_globals.contains(name) {
            self.globals.insert(name.to_string(), value);
        } else {
            frame.locals.insert(name.to_string(), value);
        }
    }
}

fn pop(frame: &mut Frame) -> Value {
    frame.stack.pop().expect("stack underflow")
}

fn arithmetic(op: Opcode, left: &Value, right: &Value) -> i64 {
    let (a, b) = (left.int(), right.int());
    match op {
        Opcode::Add => a + b,
        Opcode::Sub => a - b,
        Opcode::Mul => a * b,
        Opcode::Div => a / b,
        Opcode::Mod => a % b,
        Opcode::Gt => (a > b) as i64,
        Opcode::Lt => (a < b) as i64,
        Opcode::Ge => (a >= b) as i64,
        Opcode::Le => (a <= b) as i64,
        Opcode::And => (left.truthy() && right.truthy()) as i64,
        Opcode::Or => (left.truthy() || right.truthy()) as i64,
        _ => unreachable!(),
    }
}

/// Compile `source`, assert it has no errors, run it and return what it printed
pub fn run_script(source: &str) -> Vec<String> {
    let output = LingoCompiler::new().compile(source).expect("compile failed");
    assert!(
        !output.had_error(),
        "unexpected errors: {:?}",
        output.diagnostics.records()
    );
    let mut machine = Machine::new(&output.script);
    machine.run();
    machine.output
}
