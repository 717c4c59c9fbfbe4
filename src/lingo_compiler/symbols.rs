// Symbol and context table for one compilation unit
//
// Definitions are tracked on an explicit scope stack. The bottom scope is the
// script itself; `factory X` pushes a factory scope that stays open until the
// next factory, handler or macro; every `on`/`macro`/`method` pushes a
// definition scope that owns its own instruction buffer while its body is
// being translated.

use crate::lingo_compiler::error::CompilerError;
use crate::lingo_compiler::script::{Mark, ScriptBuffer};
use crate::lingo_compiler::CompiledScript;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

/// Receiver argument bound at the start of every factory method
pub const RECEIVER_NAME: &str = "me";

/// The one case fold used for names, keywords and end clauses.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

pub fn names_match(a: &str, b: &str) -> bool {
    fold_name(a) == fold_name(b)
}

/// Where the innermost scope is in its definition lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionState {
    None,
    CollectingArgs,
    InBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    /// `on name args ... end name`
    Handler,
    /// `macro name args`
    Macro,
    /// `method name args` inside a factory
    Method,
}

impl DefinitionKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DefinitionKind::Handler => "on",
            DefinitionKind::Macro => "macro",
            DefinitionKind::Method => "method",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    pub name: String,
    pub kind: DefinitionKind,
    /// Where execution starts in `code`
    pub entry: Mark,
    /// Declared parameters, plus one for the receiver of a factory method
    pub arity: usize,
    pub factory: Option<String>,
    /// Declared parameter names in order, without the receiver
    pub args: Vec<String>,
    pub code: ScriptBuffer,
}

#[derive(Debug, Clone)]
pub struct FactoryDescriptor {
    pub name: String,
    /// Keyed by folded method name
    pub methods: IndexMap<String, HandlerDescriptor>,
}

impl FactoryDescriptor {
    pub fn method(&self, name: &str) -> Option<&HandlerDescriptor> {
        self.methods.get(&fold_name(name))
    }
}

/// Outcome of registering a finished definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub arity: usize,
    /// A definition with the same name was replaced
    pub replaced: bool,
}

#[derive(Debug)]
enum ScopeKind {
    Script,
    Factory(String),
    Definition {
        kind: DefinitionKind,
        name: String,
        factory: Option<String>,
    },
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    state: DefinitionState,
    args: Vec<String>,
    locals: HashSet<String>,
    loop_depth: usize,
    code: Option<ScriptBuffer>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Scope {
            kind,
            state: DefinitionState::None,
            args: Vec::new(),
            locals: HashSet::new(),
            loop_depth: 0,
            code: None,
        }
    }

    fn is_factory(&self) -> bool {
        matches!(self.kind, ScopeKind::Factory(_))
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    script: ScriptBuffer,
    globals: IndexSet<String>,
    properties: IndexSet<String>,
    instances: IndexSet<String>,
    handlers: IndexMap<String, HandlerDescriptor>,
    factories: IndexMap<String, FactoryDescriptor>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope::new(ScopeKind::Script)],
            script: ScriptBuffer::new(),
            globals: IndexSet::new(),
            properties: IndexSet::new(),
            instances: IndexSet::new(),
            handlers: IndexMap::new(),
            factories: IndexMap::new(),
        }
    }

    fn innermost(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    fn innermost_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Nearest scope that owns code (a definition, or the script)
    fn frame(&self) -> &Scope {
        let index = self
            .scopes
            .iter()
            .rposition(|scope| !scope.is_factory())
            .unwrap_or(0);
        &self.scopes[index]
    }

    fn frame_mut(&mut self) -> &mut Scope {
        let index = self
            .scopes
            .iter()
            .rposition(|scope| !scope.is_factory())
            .unwrap_or(0);
        &mut self.scopes[index]
    }

    /// Buffer that statements are currently emitted into
    pub fn code(&self) -> &ScriptBuffer {
        match self.frame().code.as_ref() {
            Some(code) => code,
            None => &self.script,
        }
    }

    pub fn code_mut(&mut self) -> &mut ScriptBuffer {
        let index = self
            .scopes
            .iter()
            .rposition(|scope| !scope.is_factory())
            .unwrap_or(0);
        match self.scopes[index].code.as_mut() {
            Some(code) => code,
            None => &mut self.script,
        }
    }

    pub fn state(&self) -> DefinitionState {
        self.innermost().state
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn in_definition(&self) -> bool {
        matches!(self.innermost().kind, ScopeKind::Definition { .. })
    }

    /// Name and kind of the definition being translated
    pub fn current_definition(&self) -> Option<(DefinitionKind, &str)> {
        match &self.innermost().kind {
            ScopeKind::Definition { kind, name, .. } => Some((*kind, name.as_str())),
            _ => None,
        }
    }

    pub fn current_factory(&self) -> Option<&str> {
        self.scopes.iter().rev().find_map(|scope| match &scope.kind {
            ScopeKind::Factory(name) => Some(name.as_str()),
            _ => None,
        })
    }

    // Declarations

    pub fn declare_global(&mut self, name: &str) -> bool {
        self.frame_mut().locals.insert(fold_name(name));
        self.globals.insert(fold_name(name))
    }

    pub fn declare_property(&mut self, name: &str) -> bool {
        self.properties.insert(fold_name(name))
    }

    pub fn declare_instance(&mut self, name: &str) -> bool {
        self.instances.insert(fold_name(name))
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.globals.contains(&fold_name(name))
    }

    pub fn is_property(&self, name: &str) -> bool {
        self.properties.contains(&fold_name(name))
    }

    pub fn is_instance(&self, name: &str) -> bool {
        self.instances.contains(&fold_name(name))
    }

    /// Record a name bound by assignment in the current frame
    pub fn declare_local(&mut self, name: &str) {
        self.frame_mut().locals.insert(fold_name(name));
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.frame().locals.contains(&fold_name(name))
    }

    /// True if reading `name` here refers to something the unit knows about
    pub fn is_bound(&self, name: &str) -> bool {
        let folded = fold_name(name);
        self.frame().locals.contains(&folded)
            || self.globals.contains(&folded)
            || self.properties.contains(&folded)
            || self.instances.contains(&folded)
            || self.handlers.contains_key(&folded)
            || self.factories.contains_key(&folded)
    }

    // Loops

    pub fn enter_loop(&mut self) {
        self.frame_mut().loop_depth += 1;
    }

    pub fn leave_loop(&mut self) {
        let frame = self.frame_mut();
        frame.loop_depth = frame.loop_depth.saturating_sub(1);
    }

    pub fn in_loop(&self) -> bool {
        self.frame().loop_depth > 0
    }

    // Factories

    /// Open `factory name`, closing any factory that is still open.
    /// Returns false if a factory of that name already existed.
    pub fn open_factory(&mut self, name: &str) -> Result<bool, CompilerError> {
        if self.in_definition() {
            return Err(CompilerError::StructuralInvariant(format!(
                "factory '{}' opened inside a definition",
                name
            )));
        }
        self.close_factory();

        let folded = fold_name(name);
        let fresh = !self.factories.contains_key(&folded);
        if fresh {
            self.factories.insert(
                folded,
                FactoryDescriptor {
                    name: name.to_string(),
                    methods: IndexMap::new(),
                },
            );
        }
        log::debug!("scope push: factory {}", name);
        self.scopes.push(Scope::new(ScopeKind::Factory(name.to_string())));
        Ok(fresh)
    }

    pub fn close_factory(&mut self) {
        if self.innermost().is_factory() && self.scopes.len() > 1 {
            if let Some(scope) = self.scopes.pop() {
                log::debug!("scope pop: {:?}", scope.kind);
            }
        }
    }

    // Definitions

    /// Enter a definition: the state goes from `None` to `CollectingArgs`.
    pub fn begin_definition(
        &mut self,
        kind: DefinitionKind,
        name: &str,
    ) -> Result<(), CompilerError> {
        if self.state() != DefinitionState::None {
            return Err(CompilerError::StructuralInvariant(format!(
                "definition '{}' started while in state {:?}",
                name,
                self.state()
            )));
        }

        let factory = match kind {
            DefinitionKind::Method => match self.current_factory() {
                Some(factory) => Some(factory.to_string()),
                None => {
                    return Err(CompilerError::StructuralInvariant(format!(
                        "method '{}' outside of a factory",
                        name
                    )))
                }
            },
            DefinitionKind::Handler | DefinitionKind::Macro => {
                self.close_factory();
                None
            }
        };

        let mut scope = Scope::new(ScopeKind::Definition {
            kind,
            name: name.to_string(),
            factory,
        });
        scope.state = DefinitionState::CollectingArgs;
        scope.code = Some(ScriptBuffer::new());
        if kind == DefinitionKind::Method {
            scope.locals.insert(RECEIVER_NAME.to_string());
        }
        log::debug!("scope push: {} {}", kind.keyword(), name);
        self.scopes.push(scope);
        Ok(())
    }

    /// Add a parameter to the argument list. Returns false for a duplicate.
    pub fn collect_arg(&mut self, name: &str) -> Result<bool, CompilerError> {
        let scope = self.innermost_mut();
        if scope.state != DefinitionState::CollectingArgs {
            return Err(CompilerError::StructuralInvariant(format!(
                "argument '{}' collected in state {:?}",
                name, scope.state
            )));
        }
        let fresh = scope.locals.insert(fold_name(name));
        if fresh {
            scope.args.push(name.to_string());
        }
        Ok(fresh)
    }

    /// Close the parameter list: `CollectingArgs` becomes `InBody`.
    ///
    /// Returns the names the argument store binds, in declaration order and
    /// with the receiver first for a method.
    pub fn begin_body(&mut self) -> Result<Vec<String>, CompilerError> {
        let scope = self.innermost_mut();
        if scope.state != DefinitionState::CollectingArgs {
            return Err(CompilerError::StructuralInvariant(format!(
                "definition body started in state {:?}",
                scope.state
            )));
        }
        scope.state = DefinitionState::InBody;

        let mut stored = Vec::with_capacity(scope.args.len() + 1);
        if let ScopeKind::Definition {
            kind: DefinitionKind::Method,
            ..
        } = scope.kind
        {
            stored.push(RECEIVER_NAME.to_string());
        }
        stored.extend(scope.args.iter().cloned());
        Ok(stored)
    }

    /// Pop the finished definition and register its descriptor.
    pub fn finish_definition(&mut self, entry: Mark) -> Result<Registration, CompilerError> {
        if self.state() != DefinitionState::InBody {
            return Err(CompilerError::StructuralInvariant(format!(
                "definition finished in state {:?}",
                self.state()
            )));
        }
        let scope = self.pop_definition()?;
        let ScopeKind::Definition {
            kind,
            name,
            factory,
        } = scope.kind
        else {
            return Err(CompilerError::StructuralInvariant(
                "finished scope is not a definition".to_string(),
            ));
        };

        let arity = match kind {
            DefinitionKind::Method => scope.args.len() + 1,
            DefinitionKind::Handler | DefinitionKind::Macro => scope.args.len(),
        };
        let descriptor = HandlerDescriptor {
            name: name.clone(),
            kind,
            entry,
            arity,
            factory: factory.clone(),
            args: scope.args,
            code: scope.code.unwrap_or_default(),
        };

        let folded = fold_name(&name);
        let replaced = match factory {
            Some(factory_name) => {
                let Some(owner) = self.factories.get_mut(&fold_name(&factory_name)) else {
                    return Err(CompilerError::StructuralInvariant(format!(
                        "method '{}' registered on unknown factory '{}'",
                        name, factory_name
                    )));
                };
                owner.methods.insert(folded, descriptor).is_some()
            }
            None => self.handlers.insert(folded, descriptor).is_some(),
        };

        log::debug!(
            "registered {} '{}' arity {}{}",
            kind.keyword(),
            name,
            arity,
            if replaced { " (replaced)" } else { "" }
        );
        Ok(Registration {
            name,
            arity,
            replaced,
        })
    }

    /// Drop the open definition without registering it
    pub fn abandon_definition(&mut self) -> Result<(), CompilerError> {
        let scope = self.pop_definition()?;
        log::debug!("abandoned {:?}", scope.kind);
        Ok(())
    }

    fn pop_definition(&mut self) -> Result<Scope, CompilerError> {
        if !self.in_definition() {
            return Err(CompilerError::StructuralInvariant(
                "no definition scope to pop".to_string(),
            ));
        }
        match self.scopes.pop() {
            Some(scope) => {
                log::debug!("scope pop: {:?}", scope.kind);
                Ok(scope)
            }
            None => Err(CompilerError::StructuralInvariant("empty scope stack".to_string())),
        }
    }

    // Lookups

    pub fn handler(&self, name: &str) -> Option<&HandlerDescriptor> {
        self.handlers.get(&fold_name(name))
    }

    pub fn factory(&self, name: &str) -> Option<&FactoryDescriptor> {
        self.factories.get(&fold_name(name))
    }

    /// Hand the unit's tables and top-level code over
    pub fn finish(mut self) -> Result<CompiledScript, CompilerError> {
        self.close_factory();
        if self.scopes.len() != 1 {
            return Err(CompilerError::StructuralInvariant(format!(
                "{} scope(s) still open at end of unit",
                self.scopes.len() - 1
            )));
        }
        Ok(CompiledScript {
            code: self.script,
            handlers: self.handlers,
            factories: self.factories,
            globals: self.globals,
            properties: self.properties,
            instances: self.instances,
        })
    }
}
