use crate::Error;
use crate::ast::{OperationFn, Primitive, Procedure, Value};
use crate::builtinops::Arity;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Environment for variable bindings
///
/// A cheap, shared handle to one frame of the scope chain. Cloning the handle does not
/// copy bindings: closures and call frames that hold a clone all see the same frame.
#[derive(Clone, Default)]
pub struct Environment {
    frame: Rc<Frame>,
}

#[derive(Default)]
struct Frame {
    bindings: RefCell<HashMap<String, Value>>,
    outer: Option<Environment>,
}

impl Environment {
    /// Create an empty top-level environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty frame whose lookups fall back to `outer`
    pub fn with_parent(outer: &Environment) -> Self {
        Environment {
            frame: Rc::new(Frame {
                bindings: RefCell::new(HashMap::new()),
                outer: Some(outer.clone()),
            }),
        }
    }

    /// Create a call frame binding `params` to `args` positionally.
    ///
    /// The parameter and argument counts must match exactly.
    pub fn new_frame(
        params: &[String],
        args: Vec<Value>,
        outer: &Environment,
    ) -> Result<Self, Error> {
        if params.len() != args.len() {
            return Err(Error::arity_error(params.len(), args.len()));
        }

        let bindings = params.iter().cloned().zip(args).collect();
        Ok(Environment {
            frame: Rc::new(Frame {
                bindings: RefCell::new(bindings),
                outer: Some(outer.clone()),
            }),
        })
    }

    /// Find the innermost frame, starting from this one, that binds `name`
    pub fn find(&self, name: &str) -> Result<Environment, Error> {
        let mut env = self;
        loop {
            if env.frame.bindings.borrow().contains_key(name) {
                return Ok(env.clone());
            }
            match &env.frame.outer {
                Some(outer) => env = outer,
                None => return Err(Error::UnboundVariable(name.to_owned())),
            }
        }
    }

    /// Look up `name` through the scope chain
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        let env = self.find(name)?;
        let value = env.frame.bindings.borrow().get(name).cloned();
        value.ok_or_else(|| Error::UnboundVariable(name.to_owned()))
    }

    /// Rebind `name` in the frame where it is currently bound
    pub fn set(&self, name: &str, value: Value) -> Result<(), Error> {
        let frame = self.find(name)?;
        frame
            .frame
            .bindings
            .borrow_mut()
            .insert(name.to_owned(), value);
        Ok(())
    }

    /// Bind `name` in this frame, replacing any existing binding here
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.frame.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Check whether this exact frame (ignoring outer frames) binds `name`
    pub fn contains_local(&self, name: &str) -> bool {
        self.frame.bindings.borrow().contains_key(name)
    }

    /// Whether two handles refer to the same frame
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }

    /// Register a custom builtin function in the environment.
    ///
    /// The function receives the evaluated arguments after their count has been
    /// checked against `arity`.
    ///
    /// # Example
    /// ```
    /// use lispy::ast::Value;
    /// use lispy::builtinops::Arity;
    /// use lispy::evaluator::create_global_env;
    ///
    /// let env = create_global_env();
    /// env.register_builtin_function("answer", Arity::Exact(0), |_args| Ok(Value::Integer(42)));
    /// assert_eq!(lispy::eval_str("(answer)", &env), Ok(Value::Integer(42)));
    /// ```
    pub fn register_builtin_function<F>(&self, name: &str, arity: Arity, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, Error> + 'static,
    {
        let func: Rc<OperationFn> = Rc::new(func);
        self.define(
            name,
            Value::Procedure(Procedure::Primitive(Primitive {
                id: name.to_owned(),
                arity,
                func,
            })),
        );
    }

    /// Get all bindings visible from this environment
    /// Returns a Vec of (name, value) pairs sorted by name, inner frames overriding outer ones
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = HashMap::new();

        // Start with outer bindings so they can be overridden by local bindings
        if let Some(outer) = &self.frame.outer {
            bindings.extend(outer.get_all_bindings());
        }

        for (name, value) in self.frame.bindings.borrow().iter() {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    /// Number of frames from this one up to the top-level frame, inclusive
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut env = self;
        while let Some(outer) = &env.frame.outer {
            depth += 1;
            env = outer;
        }
        depth
    }
}

// Frames can be reachable from their own bindings through closures, so Debug only
// summarizes instead of walking values.
impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("bindings", &self.frame.bindings.borrow().len())
            .field("depth", &self.depth())
            .finish()
    }
}
