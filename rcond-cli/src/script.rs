//! Scenario scripts.
//!
//! A script is a list of top-level units, each a list of statements. The
//! statement set covers every entry point of the condition system.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub units: Vec<Unit>,
}

/// One top-level interaction unit
#[derive(Debug, Clone, Deserialize)]
pub struct Unit {
    #[serde(default)]
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// Write a line to stdout
    Print(String),
    /// Evaluate a block and print its value as JSON
    PrintValue(Vec<Stmt>),
    /// Literal value
    Value(Value),
    Stop(String),
    Warning(String),
    Message(String),
    Signal {
        classes: Vec<String>,
        message: String,
    },
    TryCatch {
        body: Vec<Stmt>,
        #[serde(default)]
        handlers: Vec<HandlerClause>,
        #[serde(default)]
        finally: Vec<Stmt>,
    },
    WithCallingHandlers {
        body: Vec<Stmt>,
        handlers: Vec<HandlerClause>,
    },
    WithRestarts {
        body: Vec<Stmt>,
        restarts: Vec<RestartClause>,
    },
    InvokeRestart {
        name: String,
        #[serde(default)]
        args: Value,
    },
    /// Evaluate `body` as if inside a call to `name`
    Call {
        name: String,
        body: Vec<Stmt>,
    },
    /// Print the message of the condition being handled
    PrintCondition,
    PrintRestarts,
    SetErrorMessage(String),
    PrintErrorMessage,
    FlushWarnings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandlerClause {
    pub class: String,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

/// A restart; with an empty body its value is the invocation arguments
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestartClause {
    pub name: String,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

impl Script {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }

    /// Parse a script; statements are single-key maps such as `stop: boom`
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(contents);
        Ok(serde_yaml::with::singleton_map_recursive::deserialize(
            deserializer,
        )?)
    }

    /// Number of statements, nested blocks included
    pub fn statement_count(&self) -> usize {
        self.units.iter().map(|u| count(&u.body)).sum()
    }
}

fn count(stmts: &[Stmt]) -> usize {
    stmts.iter().map(|s| 1 + nested_count(s)).sum()
}

fn nested_count(stmt: &Stmt) -> usize {
    match stmt {
        Stmt::PrintValue(body) | Stmt::Call { body, .. } => count(body),
        Stmt::WithCallingHandlers { body, handlers } => {
            count(body) + handlers.iter().map(|h| count(&h.body)).sum::<usize>()
        }
        Stmt::TryCatch {
            body,
            handlers,
            finally,
        } => count(body) + handlers.iter().map(|h| count(&h.body)).sum::<usize>() + count(finally),
        Stmt::WithRestarts { body, restarts } => {
            count(body) + restarts.iter().map(|r| count(&r.body)).sum::<usize>()
        }
        _ => 0,
    }
}
