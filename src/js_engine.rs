//! JavaScript Engine Module (rquickjs)
//!
//! Hosts the platform's signing script. Uses `QuickJS` via rquickjs bindings
//! (ES2020, ~1MB). The script must define two global functions,
//! `auth(key)` and `addChar(str)`, both returning strings.

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use rquickjs::{Context, Function, Runtime, Type};
use tracing::debug;

use crate::signing::SigningEngine;

/// Minimal JavaScript engine for executing scripts
pub struct JsEngine {
    // Keeps the runtime alive for as long as the context is used.
    #[allow(dead_code)]
    runtime: Runtime,
    context: Context,
}

impl JsEngine {
    /// Create a new JavaScript engine
    pub fn new() -> Result<Self> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;

        // Signing scripts are small; 16MB is plenty
        runtime.set_memory_limit(16 * 1024 * 1024);
        runtime.set_max_stack_size(512 * 1024);

        Ok(Self { runtime, context })
    }

    /// Execute JavaScript code and return the result as a string
    pub fn eval(&self, code: &str) -> Result<String> {
        debug!("Evaluating JS: {} chars", code.len());

        self.context.with(|ctx| {
            let result: rquickjs::Value = ctx.eval(code)?;

            let result_str = match result.type_of() {
                Type::Undefined => "undefined".to_string(),
                Type::Null => "null".to_string(),
                Type::Bool => {
                    let b: bool = result.get()?;
                    b.to_string()
                }
                Type::Int => {
                    let i: i32 = result.get()?;
                    i.to_string()
                }
                Type::Float => {
                    let f: f64 = result.get()?;
                    f.to_string()
                }
                Type::String => result.get::<String>()?,
                _ => format!("{result:?}"),
            };

            Ok(result_str)
        })
    }

    /// Call a global function with one string argument, expecting a string back.
    pub fn call_string(&self, name: &str, arg: &str) -> Result<String> {
        self.context.with(|ctx| {
            let function: Function = ctx
                .globals()
                .get(name)
                .with_context(|| format!("global `{name}` is not a function"))?;
            let result: String = function
                .call((arg,))
                .with_context(|| format!("`{name}` threw or returned a non-string"))?;
            Ok(result)
        })
    }
}

/// [`SigningEngine`] backed by the platform's signing script.
pub struct ScriptSigner {
    engine: JsEngine,
}

impl ScriptSigner {
    const AUTH_FN: &'static str = "auth";
    const ADD_CHAR_FN: &'static str = "addChar";

    /// Evaluate `source` and check it exposes both signing functions.
    pub fn from_source(source: &str) -> Result<Self> {
        let engine = JsEngine::new()?;
        engine.context.with(|ctx| ctx.eval::<(), _>(source))?;

        for name in [Self::AUTH_FN, Self::ADD_CHAR_FN] {
            let kind = engine.eval(&format!("typeof {name}"))?;
            if kind != "function" {
                bail!("signing script does not define `{name}` (found {kind})");
            }
        }

        Ok(Self { engine })
    }

    /// Read and evaluate a script file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_source(&source)
    }
}

impl SigningEngine for ScriptSigner {
    fn auth(&self, seed: &str) -> Result<String> {
        self.engine.call_string(Self::AUTH_FN, seed)
    }

    fn add_char(&self, buffer: &str) -> Result<String> {
        self.engine.call_string(Self::ADD_CHAR_FN, buffer)
    }
}
